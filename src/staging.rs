//! Filesystem handoff between pipeline stages.
//!
//! The extract stage writes one pretty-printed JSON array of source batches
//! (`extract_raw_<ts>.json`); the transform stage writes one document per line
//! (`reviews_<ts>.jsonl`). A stage reads either the path it is given or the
//! most recently modified file of the expected kind.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::models::{ReviewDocument, SourceBatch};
use crate::validation::InputValidator;

/// File name prefix of raw extracts
pub const RAW_PREFIX: &str = "extract_raw";
/// File name prefix of transformed documents
pub const DOCUMENTS_PREFIX: &str = "reviews";

const RAW_EXTENSION: &str = "json";
const DOCUMENTS_EXTENSION: &str = "jsonl";

/// Staging directory shared by the stages
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Use `dir` as the staging directory; it is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn timestamped_path(&self, prefix: &str, extension: &str) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
        self.dir.join(format!("{prefix}_{timestamp}.{extension}"))
    }

    /// Write the raw extract and return its path
    pub fn stage_raw(&self, batches: &[SourceBatch]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.timestamped_path(RAW_PREFIX, RAW_EXTENSION);

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, batches)?;
        writer.flush()?;

        info!(path = %path.display(), sources = batches.len(), "Raw extract staged");
        Ok(path)
    }

    /// Write transformed documents as JSON lines and return the path
    pub fn stage_documents(&self, documents: &[ReviewDocument]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.timestamped_path(DOCUMENTS_PREFIX, DOCUMENTS_EXTENSION);

        let mut writer = BufWriter::new(File::create(&path)?);
        for document in documents {
            serde_json::to_writer(&mut writer, document)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        info!(path = %path.display(), count = documents.len(), "Documents staged");
        Ok(path)
    }

    fn files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn latest_with_extension(&self, extension: &str) -> Result<Option<PathBuf>> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for path in self.files_with_extension(extension)? {
            let modified = fs::metadata(&path)?.modified()?;
            // Same mtime: the later timestamped name wins
            let is_newer = newest
                .as_ref()
                .map_or(true, |(time, best)| (modified, &path) > (*time, best));
            if is_newer {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    /// Most recently modified raw extract
    pub fn latest_raw(&self) -> Result<Option<PathBuf>> {
        self.latest_with_extension(RAW_EXTENSION)
    }

    /// Most recently modified transformed file
    pub fn latest_documents(&self) -> Result<Option<PathBuf>> {
        self.latest_with_extension(DOCUMENTS_EXTENSION)
    }

    fn resolve(&self, input: Option<&Path>, latest: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
        match input {
            Some(path) => {
                InputValidator::validate_input_file(path)
                    .map_err(|e| EtlError::EmptyLoadInput(e.to_string()))?;
                Ok(path.to_path_buf())
            }
            None => latest.ok_or_else(|| {
                EtlError::EmptyLoadInput(format!("no {kind} file in {}", self.dir.display()))
            }),
        }
    }

    /// Read a raw extract, the given one or the latest
    pub fn load_raw(&self, input: Option<&Path>) -> Result<(PathBuf, Vec<SourceBatch>)> {
        let latest = if input.is_none() { self.latest_raw()? } else { None };
        let path = self.resolve(input, latest, "raw extract")?;

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Err(EtlError::EmptyLoadInput(format!("{} is empty", path.display())));
        }

        let batches: Vec<SourceBatch> = serde_json::from_str(&content)?;
        if batches.is_empty() {
            return Err(EtlError::EmptyLoadInput(format!(
                "{} holds no source batch",
                path.display()
            )));
        }

        debug!(path = %path.display(), sources = batches.len(), "Raw extract loaded");
        Ok((path, batches))
    }

    /// Read transformed documents, the given file or the latest
    pub fn load_documents(&self, input: Option<&Path>) -> Result<(PathBuf, Vec<ReviewDocument>)> {
        let latest = if input.is_none() { self.latest_documents()? } else { None };
        let path = self.resolve(input, latest, "transformed")?;

        let reader = BufReader::new(File::open(&path)?);
        let mut documents = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let document: ReviewDocument = serde_json::from_str(&line).map_err(|e| {
                EtlError::Staging(format!("{} line {}: {e}", path.display(), number + 1))
            })?;
            documents.push(document);
        }

        if documents.is_empty() {
            return Err(EtlError::EmptyLoadInput(format!(
                "{} holds no document",
                path.display()
            )));
        }

        debug!(path = %path.display(), count = documents.len(), "Documents loaded");
        Ok((path, documents))
    }

    /// Delete the raw extract at `path`, inside the staging directory or not.
    /// Returns whether a file was removed.
    pub fn discard_raw(path: &Path) -> Result<bool> {
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        info!(path = %path.display(), "Raw input deleted");
        Ok(true)
    }

    /// Delete every raw extract, whatever its age. Returns how many were removed.
    pub fn purge_raw(&self) -> Result<usize> {
        let files = self.files_with_extension(RAW_EXTENSION)?;
        for path in &files {
            fs::remove_file(path)?;
        }
        info!(count = files.len(), "Raw extracts deleted");
        Ok(files.len())
    }
}
