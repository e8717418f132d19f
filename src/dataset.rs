//! Delimited test-value files, one row per request.

use crate::dimension::Dimension;
use crate::error::BenchError;
use csv::{ReaderBuilder, Trim};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Dataset {
    dimension: Dimension,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a dataset in memory. Rows are validated against the dimension's
    /// field mapping the same way `load` validates file rows.
    pub fn from_rows(dimension: Dimension, rows: Vec<Vec<String>>) -> Result<Self, BenchError> {
        for (i, row) in rows.iter().enumerate() {
            if let Some(reason) = check_row(dimension, i, row) {
                return Err(BenchError::Dataset {
                    path: PathBuf::from("<memory>"),
                    reason,
                });
            }
        }
        Ok(Self { dimension, rows })
    }

    /// Read at most `cap` rows from `path`, in file order.
    pub fn load(
        path: &Path,
        dimension: Dimension,
        delimiter: u8,
        cap: Option<usize>,
    ) -> Result<Self, BenchError> {
        let err = |reason: String| BenchError::Dataset {
            path: path.to_path_buf(),
            reason,
        };
        let file = File::open(path).map_err(|e| err(e.to_string()))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .trim(Trim::All)
            .from_reader(file);

        let limit = cap.unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        for (i, result) in reader.records().enumerate() {
            if rows.len() >= limit {
                break;
            }
            let record = result.map_err(|e| err(e.to_string()))?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            if let Some(reason) = check_row(dimension, i, &row) {
                return Err(err(reason));
            }
            rows.push(row);
        }

        info!(
            dimension = %dimension,
            path = %path.display(),
            rows = rows.len(),
            "Loaded dataset"
        );
        Ok(Self { dimension, rows })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every mapped field must be present and non-blank.
fn check_row(dimension: Dimension, index: usize, row: &[String]) -> Option<String> {
    let needed = dimension.param_names().len();
    if row.len() < needed {
        return Some(format!(
            "row {} has {} field(s), {} needs {}",
            index,
            row.len(),
            dimension,
            needed
        ));
    }
    row[..needed]
        .iter()
        .position(|f| f.trim().is_empty())
        .map(|field| format!("row {} field {} is empty", index, field))
}

/// Where to read each dimension's dataset from and how many rows to keep.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub path: PathBuf,
    pub cap: Option<usize>,
}

/// One read-only dataset per dimension, shared by every phase.
#[derive(Debug, Clone, Default)]
pub struct DatasetSet {
    sets: BTreeMap<Dimension, Arc<Dataset>>,
}

impl DatasetSet {
    pub fn load(
        sources: &BTreeMap<Dimension, DatasetSource>,
        delimiter: u8,
    ) -> Result<Self, BenchError> {
        let mut sets = BTreeMap::new();
        for (dimension, src) in sources {
            let ds = Dataset::load(&src.path, *dimension, delimiter, src.cap)?;
            sets.insert(*dimension, Arc::new(ds));
        }
        Ok(Self { sets })
    }

    pub fn insert(&mut self, dataset: Dataset) {
        self.sets.insert(dataset.dimension(), Arc::new(dataset));
    }

    pub fn get(&self, dimension: Dimension) -> Option<Arc<Dataset>> {
        self.sets.get(&dimension).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn cap_keeps_prefix_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = (0..25).map(|i| format!("id-{}\n", i)).collect();
        let path = write_file(dir.path(), "ids.csv", &body);
        let ds = Dataset::load(&path, Dimension::RestaurantId, b',', Some(10)).unwrap();
        assert_eq!(ds.len(), 10);
        for (i, row) in ds.rows().iter().enumerate() {
            assert_eq!(row[0], format!("id-{}", i));
        }
    }

    #[test]
    fn cap_larger_than_file_reads_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "states.csv", "CA\nNY\nTX\n");
        let ds = Dataset::load(&path, Dimension::State, b',', Some(10_000)).unwrap();
        assert_eq!(ds.len(), 3);
        let unbounded = Dataset::load(&path, Dimension::State, b',', None).unwrap();
        assert_eq!(unbounded.len(), 3);
    }

    #[test]
    fn names_need_two_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "names.csv", "Ada, Lovelace\nGrace\n");
        let err = Dataset::load(&path, Dimension::OwnerName, b',', None).unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn blank_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "cities.csv", "Paris\n   \nLyon\n");
        let err = Dataset::load(&path, Dimension::City, b',', None).unwrap_err();
        assert!(err.is_setup());
        assert!(err.to_string().contains("row 1 field 0 is empty"));
    }

    #[test]
    fn blank_mapped_field_in_memory_is_rejected() {
        let rows = vec![vec!["Ada".to_string(), " ".to_string()]];
        assert!(Dataset::from_rows(Dimension::OwnerName, rows).is_err());
        let ok = vec![vec!["Paris".to_string(), String::new()]];
        assert!(Dataset::from_rows(Dimension::City, ok).is_ok());
    }

    #[test]
    fn fields_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "names.csv", "Ada , Lovelace\n");
        let ds = Dataset::load(&path, Dimension::OwnerName, b',', None).unwrap();
        assert_eq!(ds.rows()[0], vec!["Ada".to_string(), "Lovelace".to_string()]);
    }

    #[test]
    fn missing_file_is_setup_failure() {
        let err = Dataset::load(Path::new("/nonexistent/x.csv"), Dimension::City, b',', None)
            .unwrap_err();
        assert!(matches!(err, BenchError::Dataset { .. }));
    }
}
