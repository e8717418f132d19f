use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// One request outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub timestamp: String,
    pub seq: u64,
    pub method: &'static str,
    pub url: String,
    pub status: Option<u16>,
    pub ok: bool,
    pub latency_us: u64,
    pub bytes: u64,
    pub error: Option<String>,
}

impl ResultRecord {
    pub const FIELDS: [&'static str; 9] = [
        "timestamp",
        "seq",
        "method",
        "url",
        "status",
        "ok",
        "latency_us",
        "bytes",
        "error",
    ];

    pub fn csv_header() -> String {
        Self::FIELDS.join(",")
    }
}

/// Append-only CSV stream of request outcomes for one (phase, dimension).
pub struct ResultSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl ResultSink {
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(ResultRecord::csv_header().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        tracing::debug!("Writing results to: {}", path.display());
        Ok(Self { path, writer, written: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write(&mut self, record: &ResultRecord) -> io::Result<()> {
        let mut row = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::with_capacity(256));
        row.serialize(record)?;
        let bytes = row.into_inner().map_err(|e| e.into_error())?;
        self.writer.write_all(&bytes).await?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered rows to disk.
    pub async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }
}

/// Plain CSV file for end-of-run summaries.
pub async fn write_csv_file(path: &Path, header: &str, rows: &[String]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let mut writer = BufWriter::new(File::create(path).await?);
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    for row in rows {
        writer.write_all(row.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64, url: &str, error: Option<&str>) -> ResultRecord {
        ResultRecord {
            timestamp: "2024-01-01T00:00:00Z".into(),
            seq,
            method: "GET",
            url: url.into(),
            status: error.is_none().then_some(200),
            ok: error.is_none(),
            latency_us: 1500,
            bytes: 42,
            error: error.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn writes_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/col-scan-city-results.txt");
        let mut sink = ResultSink::create(&path).await.unwrap();
        sink.write(&record(0, "http://svc/r?city=Paris", None)).await.unwrap();
        sink.write(&record(1, "http://svc/r?city=a,b", Some("connection refused")))
            .await
            .unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink.written(), 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, ResultRecord::FIELDS);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "0");
        assert_eq!(&rows[0][4], "200");
        assert_eq!(&rows[1][3], "http://svc/r?city=a,b");
        assert_eq!(&rows[1][4], "");
        assert_eq!(&rows[1][5], "false");
        assert_eq!(&rows[1][8], "connection refused");
    }
}
