//! Query axes exercised by every benchmark phase.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    RestaurantId,
    OwnerName,
    City,
    State,
    Country,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::RestaurantId,
        Dimension::OwnerName,
        Dimension::City,
        Dimension::State,
        Dimension::Country,
    ];

    /// Name fragment used in result sink paths.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::RestaurantId => "restaurant-id",
            Self::OwnerName => "owner-name",
            Self::City => "city",
            Self::State => "state",
            Self::Country => "country",
        }
    }

    /// Query parameter name for each field position of a dataset row.
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            Self::RestaurantId => &["id"],
            Self::OwnerName => &["firstName", "lastName"],
            Self::City => &["city"],
            Self::State => &["state"],
            Self::Country => &["country"],
        }
    }

    /// Full-text search index queried for this dimension in the search phase.
    pub fn search_index(&self) -> &'static str {
        match self {
            Self::RestaurantId => "restaurant-id-search",
            Self::OwnerName => "owner-name-search",
            Self::City | Self::State | Self::Country => "address-search",
        }
    }

    /// Default dataset file name under the csv directory.
    pub fn default_file(&self) -> &'static str {
        match self {
            Self::RestaurantId => "demo.search.ids.csv",
            Self::OwnerName => "demo.search.names.csv",
            Self::City => "demo.search.cities.csv",
            Self::State => "demo.search.states.csv",
            Self::Country => "demo.search.countries.csv",
        }
    }

    /// Zip a dataset row with this dimension's parameter names.
    ///
    /// Returns `None` when the row has fewer fields than the mapping needs.
    /// Extra trailing fields are ignored.
    pub fn params_for(&self, row: &[String]) -> Option<Vec<(String, String)>> {
        let names = self.param_names();
        if row.len() < names.len() {
            return None;
        }
        Some(
            names
                .iter()
                .zip(row)
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "restaurant-id" | "id" => Ok(Self::RestaurantId),
            "owner-name" | "name" => Ok(Self::OwnerName),
            "city" => Ok(Self::City),
            "state" => Ok(Self::State),
            "country" => Ok(Self::Country),
            other => Err(format!("unknown dimension '{}'", other)),
        }
    }
}
