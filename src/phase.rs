use crate::config::Endpoints;
use crate::dimension::Dimension;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Benchmark stage, in run order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Unindexed column scan against the scan endpoint.
    Scan,
    /// Same scan endpoint after the backend rebuilt its indexes.
    Index,
    /// Full-text search endpoint with a per-dimension search index.
    Search,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Scan, Phase::Index, Phase::Search];

    pub fn sink_prefix(&self) -> &'static str {
        match self {
            Self::Scan => "col-scan",
            Self::Index => "idx-scan",
            Self::Search => "atlas-search",
        }
    }

    /// `<dir>/<prefix>-<dimension>-results.txt`
    pub fn sink_path(&self, dir: &Path, dimension: Dimension) -> PathBuf {
        dir.join(format!("{}-{}-results.txt", self.sink_prefix(), dimension.slug()))
    }

    /// Parameters added to every request of this phase on top of the row's.
    pub fn fixed_params(&self, dimension: Dimension) -> Vec<(String, String)> {
        match self {
            Self::Search => vec![(
                "searchIndex".to_string(),
                dimension.search_index().to_string(),
            )],
            Self::Scan | Self::Index => Vec::new(),
        }
    }

    pub fn base_url<'a>(&self, endpoints: &'a Endpoints) -> &'a str {
        match self {
            Self::Scan | Self::Index => &endpoints.scan_url,
            Self::Search => &endpoints.search_url,
        }
    }

    /// Backend state this phase must run against, as the `loadIndexes` flag
    /// of the install step that precedes it.
    pub fn requires_indexes(&self) -> bool {
        !matches!(self, Self::Scan)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scan => "scan",
            Self::Index => "index",
            Self::Search => "search",
        })
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scan" | "col-scan" => Ok(Self::Scan),
            "index" | "idx-scan" => Ok(Self::Index),
            "search" | "atlas-search" => Ok(Self::Search),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_paths_follow_naming_convention() {
        let dir = Path::new("./log");
        assert_eq!(
            Phase::Scan.sink_path(dir, Dimension::RestaurantId),
            PathBuf::from("./log/col-scan-restaurant-id-results.txt")
        );
        assert_eq!(
            Phase::Index.sink_path(dir, Dimension::OwnerName),
            PathBuf::from("./log/idx-scan-owner-name-results.txt")
        );
        assert_eq!(
            Phase::Search.sink_path(dir, Dimension::Country),
            PathBuf::from("./log/atlas-search-country-results.txt")
        );
    }

    #[test]
    fn only_search_injects_index_name() {
        assert!(Phase::Scan.fixed_params(Dimension::State).is_empty());
        assert!(Phase::Index.fixed_params(Dimension::State).is_empty());
        assert_eq!(
            Phase::Search.fixed_params(Dimension::State),
            vec![("searchIndex".to_string(), "address-search".to_string())]
        );
    }

    #[test]
    fn endpoint_selection() {
        let e = Endpoints {
            ping_url: "http://svc/ping".into(),
            install_url: "http://svc/install".into(),
            scan_url: "http://svc/restaurants".into(),
            search_url: "http://svc/search".into(),
        };
        assert_eq!(Phase::Scan.base_url(&e), "http://svc/restaurants");
        assert_eq!(Phase::Index.base_url(&e), "http://svc/restaurants");
        assert_eq!(Phase::Search.base_url(&e), "http://svc/search");
    }
}
