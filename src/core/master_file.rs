// src/core/master_file.rs

//! The single-line on-disk record of the most recently promoted master.

use crate::core::CoordinatorError;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Reads the master file, returning `None` if it is absent or empty.
pub fn read(path: &str) -> Result<Option<String>, CoordinatorError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

/// Writes `address` to the master file atomically: write-temp-then-rename.
///
/// A failure here does not roll back an in-flight master switch — the
/// caller treats it as a reported, non-fatal persistence failure.
pub fn write(path: &str, address: &str) -> Result<(), CoordinatorError> {
    let temp_path = format!("{path}.tmp");
    fs::write(&temp_path, address).map_err(|e| CoordinatorError::Persistence {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    fs::rename(&temp_path, path).map_err(|e| CoordinatorError::Persistence {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Writes the master file, demoting the error to a logged warning rather than
/// propagating it: the switch proceeds in memory regardless.
pub fn write_best_effort(path: &str, address: &str) -> Option<CoordinatorError> {
    match write(path, address) {
        Ok(()) => None,
        Err(err) => {
            warn!(path, address, error = %err, "failed to persist master file");
            Some(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_missing_file_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beetle-master");
        assert_eq!(read(path.to_str().unwrap()).unwrap(), None);
    }

    #[test]
    fn read_empty_file_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beetle-master");
        fs::write(&path, "   \n").unwrap();
        assert_eq!(read(path.to_str().unwrap()).unwrap(), None);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beetle-master");
        let path_str = path.to_str().unwrap();
        write(path_str, "10.0.0.1:6379").unwrap();
        assert_eq!(read(path_str).unwrap(), Some("10.0.0.1:6379".to_string()));
        assert!(!Path::new(&format!("{path_str}.tmp")).exists());
    }
}
