//! Whole-document JSON file storage.
//!
//! Every save rewrites the full document through a temp file and an atomic
//! rename, so readers never observe a half-written file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::PolicyError;

/// Result of reading the document from disk.
#[derive(Debug)]
pub enum Loaded<T> {
    /// No file yet.
    Missing,
    /// File parsed.
    Parsed(T),
    /// File exists but is not a valid document.
    Malformed(serde_json::Error),
    /// File could not be read at all.
    Unreadable(io::Error),
}

/// A JSON document stored in a single file.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document.
    pub fn load<T: DeserializeOwned>(&self) -> Loaded<T> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Loaded::Missing,
            Err(e) => return Loaded::Unreadable(e),
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(value) => Loaded::Parsed(value),
            Err(e) if e.is_io() => Loaded::Unreadable(e.into()),
            Err(e) => Loaded::Malformed(e),
        }
    }

    /// Atomically replace the document.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), PolicyError> {
        let body = serde_json::to_vec_pretty(value)?;
        self.write_atomic(&body).map_err(|source| PolicyError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), bytes = body.len(), "Document saved");
        Ok(())
    }

    /// Move a bad document aside so it is not overwritten.
    pub fn quarantine(&self) -> io::Result<PathBuf> {
        let target = self.sibling(".corrupt");
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    fn write_atomic(&self, body: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.sibling(".tmp");
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        writer.write_all(body)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&temp_path, &self.path)
    }

    /// `<path><suffix>` next to the document.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_missing_then_saved() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested").join("doc.json"));

        assert!(matches!(file.load::<BTreeMap<String, u32>>(), Loaded::Missing));

        let mut doc = BTreeMap::new();
        doc.insert("a".to_string(), 1u32);
        file.save(&doc).unwrap();

        match file.load::<BTreeMap<String, u32>>() {
            Loaded::Parsed(loaded) => assert_eq!(loaded, doc),
            other => panic!("unexpected load result: {other:?}"),
        }
        assert!(!dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[test]
    fn test_malformed_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, b"{ not json").unwrap();

        let file = JsonFile::new(&path);
        assert!(matches!(file.load::<BTreeMap<String, u32>>(), Loaded::Malformed(_)));

        let moved = file.quarantine().unwrap();
        assert_eq!(moved, dir.path().join("doc.json.corrupt"));
        assert!(!path.exists());
        assert_eq!(fs::read(moved).unwrap(), b"{ not json");
    }

    #[test]
    fn test_save_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let file = JsonFile::new(blocker.join("doc.json"));
        let err = file.save(&BTreeMap::<String, u32>::new()).unwrap_err();
        assert!(matches!(err, PolicyError::Write { .. }));
    }
}
