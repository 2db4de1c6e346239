//! Table storage for silver inputs and gold outputs.
//!
//! Tables live at fixed logical locations (`silver/dimensions/dim_loan`, ...).
//! Every write adds one file under the location, partitioned by the UTC date
//! of the write (`year=YYYY/month=MM/day=DD/data.jsonl`), so the current state
//! of a table is the union of every file beneath its root.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CreditRiskError;
use crate::CreditRiskResult;

pub const DATA_FILE_NAME: &str = "data.jsonl";

/// Read/write access to persisted tables.
pub trait TableStore {
    /// Return every record stored under `location`, oldest partition first.
    /// A location that has never been written yields an empty vec.
    fn read_table<T: DeserializeOwned>(&self, location: &str) -> CreditRiskResult<Vec<T>>;

    /// Persist `records` under `location` and return the path written.
    fn write_table<T: Serialize>(
        &mut self,
        location: &str,
        records: &[T],
        partitioned: bool,
        now: DateTime<Utc>,
    ) -> CreditRiskResult<String>;
}

/// Relative path of the file a write lands in.
pub fn partition_path(location: &str, partitioned: bool, now: DateTime<Utc>) -> String {
    let root = location.trim_end_matches('/');
    if partitioned {
        format!(
            "{}/year={}/month={:02}/day={:02}/{}",
            root,
            now.year(),
            now.month(),
            now.day(),
            DATA_FILE_NAME
        )
    } else {
        format!("{}/{}", root, DATA_FILE_NAME)
    }
}

/// Read a required input dataset, failing when nothing is stored.
pub fn read_dataset<T: DeserializeOwned, S: TableStore>(
    store: &S,
    location: &str,
    name: &str,
) -> CreditRiskResult<Vec<T>> {
    let records: Vec<T> = store.read_table(location)?;
    if records.is_empty() {
        return Err(CreditRiskError::MissingInput {
            dataset: name.to_string(),
        });
    }
    tracing::info!(dataset = name, records = records.len(), "loaded silver dataset");
    Ok(records)
}

// ---------------------------------------------------------------------------
// Local filesystem
// ---------------------------------------------------------------------------

/// JSON Lines files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalTableStore {
    root: PathBuf,
}

impl LocalTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> CreditRiskError {
    CreditRiskError::Storage {
        location: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Collect data files beneath `dir`, sorted by path.
fn collect_data_files(dir: &Path, out: &mut Vec<PathBuf>) -> CreditRiskResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| storage_error(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| storage_error(dir, e))?.path();
        if path.is_dir() {
            collect_data_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "jsonl") {
            out.push(path);
        }
    }
    Ok(())
}

impl TableStore for LocalTableStore {
    fn read_table<T: DeserializeOwned>(&self, location: &str) -> CreditRiskResult<Vec<T>> {
        let dir = self.root.join(location);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        collect_data_files(&dir, &mut files)?;
        files.sort();

        let mut records = Vec::new();
        for file in &files {
            let handle = fs::File::open(file).map_err(|e| storage_error(file, e))?;
            for line in BufReader::new(handle).lines() {
                let line = line.map_err(|e| storage_error(file, e))?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: T = serde_json::from_str(&line).map_err(|e| {
                    CreditRiskError::SerializationError(format!(
                        "Failed to parse '{}': {}",
                        file.display(),
                        e
                    ))
                })?;
                records.push(record);
            }
        }

        tracing::debug!(location, files = files.len(), records = records.len(), "read table");
        Ok(records)
    }

    fn write_table<T: Serialize>(
        &mut self,
        location: &str,
        records: &[T],
        partitioned: bool,
        now: DateTime<Utc>,
    ) -> CreditRiskResult<String> {
        let relative = partition_path(location, partitioned, now);
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| storage_error(parent, e))?;
        }

        let handle = fs::File::create(&path).map_err(|e| storage_error(&path, e))?;
        let mut writer = BufWriter::new(handle);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n").map_err(|e| storage_error(&path, e))?;
        }
        writer.flush().map_err(|e| storage_error(&path, e))?;

        tracing::info!(path = %path.display(), records = records.len(), "wrote table");
        Ok(relative)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Map of file path to rows, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryTableStore {
    files: BTreeMap<String, Vec<serde_json::Value>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a location with records, as if written on `now`.
    pub fn insert<T: Serialize>(
        &mut self,
        location: &str,
        records: &[T],
        now: DateTime<Utc>,
    ) -> CreditRiskResult<()> {
        self.write_table(location, records, true, now).map(|_| ())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|k| k.as_str())
    }
}

impl TableStore for MemoryTableStore {
    fn read_table<T: DeserializeOwned>(&self, location: &str) -> CreditRiskResult<Vec<T>> {
        let prefix = format!("{}/", location.trim_end_matches('/'));
        let mut records = Vec::new();
        let matching = self
            .files
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix));
        for (_, rows) in matching {
            for row in rows {
                records.push(serde_json::from_value(row.clone())?);
            }
        }
        Ok(records)
    }

    fn write_table<T: Serialize>(
        &mut self,
        location: &str,
        records: &[T],
        partitioned: bool,
        now: DateTime<Utc>,
    ) -> CreditRiskResult<String> {
        let path = partition_path(location, partitioned, now);
        let rows = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.files.insert(path.clone(), rows);
        Ok(path)
    }
}
