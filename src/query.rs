use crate::error::BenchError;
use url::Url;

/// Merge `params` into the query string of `base`.
///
/// Existing query parameters on `base` are kept; new pairs are appended and
/// form-encoded.
pub fn build_url(base: &str, params: &[(String, String)]) -> Result<String, BenchError> {
    let mut url = Url::parse(base).map_err(|source| BenchError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;
    if !params.is_empty() {
        let mut q = url.query_pairs_mut();
        for (k, v) in params {
            q.append_pair(k, v);
        }
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(p: &[(&str, &str)]) -> Vec<(String, String)> {
        p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn parsed(url: &str) -> Vec<(String, String)> {
        let mut v: Vec<_> = Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        v.sort();
        v
    }

    #[test]
    fn single_city_param() {
        let url = build_url("http://svc/restaurants", &pairs(&[("city", "Paris")])).unwrap();
        assert_eq!(url, "http://svc/restaurants?city=Paris");
    }

    #[test]
    fn keeps_existing_params() {
        let url = build_url(
            "http://svc/restaurants?limit=5",
            &pairs(&[("firstName", "Ada"), ("lastName", "Lovelace")]),
        )
        .unwrap();
        assert_eq!(
            parsed(&url),
            pairs(&[("firstName", "Ada"), ("lastName", "Lovelace"), ("limit", "5")])
        );
    }

    #[test]
    fn values_survive_encoding() {
        let input = pairs(&[("city", "São Paulo & Co"), ("state", "a=b?c")]);
        let url = build_url("http://svc/restaurants", &input).unwrap();
        let mut expected = input.clone();
        expected.sort();
        assert_eq!(parsed(&url), expected);
    }

    #[test]
    fn no_params_leaves_url_alone() {
        assert_eq!(build_url("http://svc/ping", &[]).unwrap(), "http://svc/ping");
    }

    #[test]
    fn unparsable_base_is_an_error() {
        let err = build_url("not a url", &pairs(&[("id", "1")])).unwrap_err();
        assert!(matches!(err, BenchError::InvalidUrl { .. }));
    }
}
