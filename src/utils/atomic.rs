//! Atomic file operations
//!
//! The state file is rewritten on every mutation, so a crash mid-write must
//! never leave a truncated file behind. Writes go to a temporary file, are
//! synced to disk, then renamed over the final path (atomic on most
//! filesystems). The result is always either the old state or the new state,
//! never a partial one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::types::CoordResult;

/// Atomically write content using a writer function
///
/// 1. Write content to a `.tmp` sibling via `write_fn`
/// 2. Sync the file to disk
/// 3. Atomically rename to the final path
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> CoordResult<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    write_fn(&mut file)?;

    // Sync to disk (ensure data is durable)
    file.sync_all()?;

    // Atomic rename
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Atomically write a string to a file
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> CoordResult<()> {
    atomic_write_with(path, |file| file.write_all(content.as_bytes()))
}

/// Clean up any leftover temp files from interrupted writes
///
/// Called on store startup so `.tmp` files left by crashes do not accumulate.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> CoordResult<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.jsonl");

        atomic_write(&path, "line1\nline2\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\nline2\n");
        // Temp file should not exist
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_atomic_write_with_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("state.jsonl");

        atomic_write_with(&path, |file| {
            writeln!(file, "only line")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "only line\n");
    }

    #[test]
    fn test_cleanup_temp_files() {
        let temp_dir = TempDir::new().unwrap();

        fs::write(temp_dir.path().join("a.tmp"), "x").unwrap();
        fs::write(temp_dir.path().join("b.tmp"), "y").unwrap();
        fs::write(temp_dir.path().join("keep.jsonl"), "z").unwrap();

        let cleaned = cleanup_temp_files(temp_dir.path()).unwrap();
        assert_eq!(cleaned, 2);
        assert!(temp_dir.path().join("keep.jsonl").exists());
    }
}
