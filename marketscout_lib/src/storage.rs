//! Dedupe and flat-file persistence.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::product::CanonicalProduct;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Where a run's two output files were written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub jsonl: PathBuf,
    pub csv: PathBuf,
}

impl OutputPaths {
    pub fn new(output_dir: &Path, basename: &str) -> Self {
        Self {
            jsonl: output_dir.join(format!("{}.jsonl", basename)),
            csv: output_dir.join(format!("{}.csv", basename)),
        }
    }
}

/// Drops every product whose `(url, lowercased title)` was already seen.
/// The first occurrence wins and survivors keep their relative order.
pub fn dedupe(items: Vec<CanonicalProduct>) -> Vec<CanonicalProduct> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.dedupe_key()))
        .collect()
}

pub fn ensure_dirs<P: AsRef<Path>>(paths: &[P]) -> Result<(), StorageError> {
    for path in paths {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|e| StorageError::io(path, e))?;
    }
    Ok(())
}

/// One JSON object per line.
pub fn write_jsonl(items: &[CanonicalProduct], path: &Path) -> Result<(), StorageError> {
    create_parent(path)?;
    let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n").map_err(|e| StorageError::io(path, e))?;
    }
    out.flush().map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

/// CSV with a header row in [`CanonicalProduct::FIELD_NAMES`] order, written
/// even when there are no rows.
pub fn write_csv(items: &[CanonicalProduct], path: &Path) -> Result<(), StorageError> {
    create_parent(path)?;
    let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    wtr.write_record(CanonicalProduct::FIELD_NAMES)?;
    for item in items {
        wtr.serialize(item)?;
    }
    wtr.flush().map_err(|e| StorageError::io(path, e))?;
    Ok(())
}

/// Writes both output formats under `output_dir`.
pub fn write_outputs(
    items: &[CanonicalProduct],
    output_dir: &Path,
    basename: &str,
) -> Result<OutputPaths, StorageError> {
    ensure_dirs(&[output_dir])?;
    let paths = OutputPaths::new(output_dir, basename);
    write_jsonl(items, &paths.jsonl)?;
    write_csv(items, &paths.csv)?;
    Ok(paths)
}

/// Reads back a CSV written by [`write_csv`].
pub fn read_csv(path: &Path) -> Result<Vec<CanonicalProduct>, StorageError> {
    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut items = Vec::new();
    for record in rdr.deserialize() {
        items.push(record?);
    }
    Ok(items)
}

/// Reads back a JSONL file written by [`write_jsonl`]. Blank lines are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<CanonicalProduct>, StorageError> {
    let text = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    let mut items = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        items.push(serde_json::from_str(line)?);
    }
    Ok(items)
}

fn create_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Archive of fetched pages, one file per (marketplace, category, page).
#[derive(Clone, Debug)]
pub struct RawHtmlStore {
    root: PathBuf,
}

impl RawHtmlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, marketplace: &str, category: &str, page: u32) -> PathBuf {
        self.root
            .join(marketplace)
            .join(format!("{}_p{}.html", file_stem(category), page))
    }

    pub fn save(
        &self,
        marketplace: &str,
        category: &str,
        page: u32,
        html: &str,
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_for(marketplace, category, page);
        create_parent(&path)?;
        fs::write(&path, html).map_err(|e| StorageError::io(&path, e))?;
        Ok(path)
    }
}

fn file_stem(category: &str) -> String {
    category
        .chars()
        .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
