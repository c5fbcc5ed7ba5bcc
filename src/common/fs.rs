use std::{fs, io::Write, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("[common::fs] Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("[common::fs] Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Write `bytes` to the temp sibling of `path` and return the temp path.
fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp)
        .with_context(|| format!("[common::fs] Failed to create {}", tmp.display()))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .with_context(|| format!("[common::fs] Failed to write {}", tmp.display()))?;
    Ok(tmp)
}

/// Write `bytes` to `path` via a sibling temp file, so readers never see a partial file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = write_tmp(path, bytes)?;
    fs::rename(&tmp, path)
        .with_context(|| format!("[common::fs] Failed to move {} into place", path.display()))
}

/// Write a set of files so that either all of them are replaced or, on
/// failure, none of the set is left behind.
///
/// Every file is staged before any is moved into place. If staging fails the
/// existing files are untouched; if a move fails every target is removed.
pub(crate) fn write_all_or_none(files: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        match write_tmp(path, bytes) {
            Ok(tmp) => staged.push(tmp),
            Err(err) => {
                staged.iter().for_each(|tmp| { let _ = fs::remove_file(tmp); });
                let _ = fs::remove_file(path.with_extension("tmp"));
                return Err(err);
            }
        }
    }

    for (i, ((path, _), tmp)) in files.iter().zip(&staged).enumerate() {
        if let Err(err) = fs::rename(tmp, path) {
            staged[i..].iter().for_each(|tmp| { let _ = fs::remove_file(tmp); });
            files.iter().for_each(|(path, _)| { let _ = fs::remove_file(path); });
            return Err(err).with_context(|| format!("[common::fs] Failed to move {} into place", path.display()));
        }
    }
    Ok(())
}

/// Lowercase hex SHA-256 of a file's contents.
pub(crate) fn sha256_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("[common::fs] Failed to read {}", path.display()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert_eq!(
            sha256_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn writes_whole_set() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![(dir.path().join("a.csr"), b"one".to_vec()), (dir.path().join("b.json"), b"two".to_vec())];
        write_all_or_none(&files).unwrap();
        assert_eq!(fs::read(dir.path().join("a.csr")).unwrap(), b"one");
        assert_eq!(fs::read(dir.path().join("b.json")).unwrap(), b"two");
        assert!(!dir.path().join("a.tmp").exists());
    }

    #[test]
    fn failed_move_leaves_no_part_of_the_set() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.csr");
        fs::write(&first, b"old").unwrap();
        // A directory in the way makes the second move fail
        let blocked = dir.path().join("b.json");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("keep"), b"").unwrap();

        let files = vec![(first.clone(), b"new".to_vec()), (blocked.clone(), b"two".to_vec())];
        assert!(write_all_or_none(&files).is_err());
        assert!(!first.exists());
        assert!(!dir.path().join("a.tmp").exists());
        assert!(!dir.path().join("b.tmp").exists());
    }

    #[test]
    fn ensure_dir_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"").unwrap();
        assert!(ensure_dir_exists(&file).is_err());
        assert!(ensure_dir_exists(&dir.path().join("a/b")).is_ok());
    }
}
