//! Run configuration: environment-supplied endpoints plus optional YAML.

use crate::dataset::DatasetSource;
use crate::dimension::Dimension;
use crate::error::BenchError;
use crate::gate::GateMode;
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_PREFIX_LIMIT: usize = 10_000;
pub const DEFAULT_DOCUMENT_COUNT: u64 = 2_000_000;

/// Backend endpoints, normally supplied through the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub ping_url: String,
    pub install_url: String,
    pub scan_url: String,
    pub search_url: String,
}

impl Endpoints {
    pub fn validate(&self) -> Result<(), BenchError> {
        for (name, value) in [
            ("PING_URL", &self.ping_url),
            ("INSTALL_URL", &self.install_url),
            ("SCAN_GET_RESTAURANTS_URL", &self.scan_url),
            ("ATLAS_SEARCH_GET_RESTAURANTS_URL", &self.search_url),
        ] {
            if value.is_empty() {
                return Err(BenchError::Config(format!("{} is not set", name)));
            }
            let url = Url::parse(value)
                .map_err(|e| BenchError::Config(format!("{} '{}': {}", name, value, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(BenchError::Config(format!(
                    "{} '{}': unsupported scheme '{}'",
                    name,
                    value,
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

/// What a worker does when a request fails at the transport level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failed request.
    #[default]
    #[value(name = "abort")]
    #[serde(alias = "abort")]
    AbortOnFirstError,
    /// Count failures per dimension and report them at the end.
    #[value(name = "continue")]
    #[serde(alias = "continue")]
    CountAndContinue,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub run_id: String,
    pub endpoints: Endpoints,
    pub out_dir: PathBuf,
    pub csv_dir: PathBuf,
    pub dataset_paths: BTreeMap<Dimension, PathBuf>,
    pub delimiter: u8,
    pub prefix_limit: usize,
    pub document_count: u64,
    pub gate: GateMode,
    pub failure_policy: FailurePolicy,
    pub request_timeout_ms: u64,
    pub phases: Vec<Phase>,
    pub dimensions: Vec<Dimension>,
    pub headers: BTreeMap<String, String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            run_id: String::new(),
            endpoints: Endpoints::default(),
            out_dir: PathBuf::from("./log"),
            csv_dir: PathBuf::from("./csv"),
            dataset_paths: BTreeMap::new(),
            delimiter: b',',
            prefix_limit: DEFAULT_PREFIX_LIMIT,
            document_count: DEFAULT_DOCUMENT_COUNT,
            gate: GateMode::Interactive,
            failure_policy: FailurePolicy::AbortOnFirstError,
            request_timeout_ms: 30_000,
            phases: Phase::ALL.to_vec(),
            dimensions: Dimension::ALL.to_vec(),
            headers,
        }
    }
}

/// YAML overlay; every field is optional and only replaces what it names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub ping_url: Option<String>,
    pub install_url: Option<String>,
    pub scan_url: Option<String>,
    pub search_url: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
    pub datasets: BTreeMap<Dimension, PathBuf>,
    pub delimiter: Option<char>,
    pub prefix_limit: Option<usize>,
    pub document_count: Option<u64>,
    pub gate: Option<GateMode>,
    pub failure_policy: Option<FailurePolicy>,
    pub request_timeout_ms: Option<u64>,
    pub phases: Option<Vec<Phase>>,
    pub dimensions: Option<Vec<Dimension>>,
    pub headers: BTreeMap<String, String>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, BenchError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BenchError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&text)
            .map_err(|e| BenchError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

impl BenchConfig {
    pub fn apply_file(&mut self, file: FileConfig) -> Result<(), BenchError> {
        if let Some(v) = file.ping_url { self.endpoints.ping_url = v; }
        if let Some(v) = file.install_url { self.endpoints.install_url = v; }
        if let Some(v) = file.scan_url { self.endpoints.scan_url = v; }
        if let Some(v) = file.search_url { self.endpoints.search_url = v; }
        if let Some(v) = file.out_dir { self.out_dir = v; }
        if let Some(v) = file.csv_dir { self.csv_dir = v; }
        self.dataset_paths.extend(file.datasets);
        if let Some(c) = file.delimiter { self.delimiter = delimiter_byte(c)?; }
        if let Some(v) = file.prefix_limit { self.prefix_limit = v; }
        if let Some(v) = file.document_count { self.document_count = v; }
        if let Some(v) = file.gate { self.gate = v; }
        if let Some(v) = file.failure_policy { self.failure_policy = v; }
        if let Some(v) = file.request_timeout_ms { self.request_timeout_ms = v; }
        if let Some(v) = file.phases { self.phases = v; }
        if let Some(v) = file.dimensions { self.dimensions = v; }
        self.headers.extend(file.headers);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        self.endpoints.validate()?;
        if self.phases.is_empty() {
            return Err(BenchError::Config("no phases selected".into()));
        }
        if self.dimensions.is_empty() {
            return Err(BenchError::Config("no dimensions selected".into()));
        }
        let mut seen = BTreeSet::new();
        for d in &self.dimensions {
            if !seen.insert(*d) {
                return Err(BenchError::Config(format!("dimension {} listed more than once", d)));
            }
        }
        if self.prefix_limit == 0 {
            return Err(BenchError::Config("prefix limit must be > 0".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(BenchError::Config("request timeout must be > 0".into()));
        }
        Ok(())
    }

    /// Identifier, name and city datasets are capped at the prefix limit;
    /// state and country are read in full.
    pub fn cap_for(&self, dimension: Dimension) -> Option<usize> {
        match dimension {
            Dimension::RestaurantId | Dimension::OwnerName | Dimension::City => {
                Some(self.prefix_limit)
            }
            Dimension::State | Dimension::Country => None,
        }
    }

    pub fn dataset_sources(&self) -> BTreeMap<Dimension, DatasetSource> {
        self.dimensions
            .iter()
            .map(|d| {
                let path = self
                    .dataset_paths
                    .get(d)
                    .cloned()
                    .unwrap_or_else(|| self.csv_dir.join(d.default_file()));
                (*d, DatasetSource { path, cap: self.cap_for(*d) })
            })
            .collect()
    }
}

pub fn delimiter_byte(c: char) -> Result<u8, BenchError> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(BenchError::Config(format!("delimiter '{}' must be ASCII", c)))
    }
}

/// Parse `Key=Value` header pairs; entries without `=` are skipped.
pub fn parse_header_kv(pairs: &[String]) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for p in pairs {
        if let Some((k, v)) = p.split_once('=') {
            headers.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    headers
}
