//! All-or-nothing file replacement.
//!
//! Content is written to a temp file in the target directory, flushed, then
//! renamed over the target. A concurrent reader sees the old file or the new
//! file in full.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically replaces `target` with `content`, creating parent directories.
pub fn replace_file(target: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|err| err.error)?;
    Ok(())
}

/// Removes `target`, returning `false` when it did not exist.
pub fn remove_if_exists(target: &Path) -> io::Result<bool> {
    match fs::remove_file(target) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::{remove_if_exists, replace_file};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn replace_file_creates_parent_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("out.txt");

        replace_file(&target, b"first").unwrap();
        replace_file(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn replace_file_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.txt");

        replace_file(&target, b"clean").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0], "out.txt");
    }

    #[test]
    fn remove_if_exists_reports_absence() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("gone.txt");

        assert!(!remove_if_exists(&target).unwrap());
        replace_file(&target, b"x").unwrap();
        assert!(remove_if_exists(&target).unwrap());
        assert!(!target.exists());
    }
}
