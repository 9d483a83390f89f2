//! Byte I/O surface.
//!
//! Thin facade over `std::fs`: whole-file reads and an atomic
//! create-write-rename for outputs. The codec assumes one archive fits in
//! memory at a time; streaming is a future concern (§2 of the spec).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{io_context, Result};

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| io_context(path, e))
}

/// Write `data` to `dest` atomically: write to a sibling temp file, `fsync`,
/// then rename into place. The rename is the commit point — nothing before
/// it touches `dest`.
pub fn write_atomic(dest: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = temp_sibling(dest);
    {
        let mut f = File::create(&tmp_path).map_err(|e| io_context(&tmp_path, e))?;
        f.write_all(data).map_err(|e| io_context(&tmp_path, e))?;
        f.sync_all().map_err(|e| io_context(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, dest).map_err(|e| io_context(dest, e))?;
    Ok(())
}

/// Produce a temp-file path in the same directory as `dest`, so the final
/// rename is guaranteed to stay on one filesystem.
pub fn temp_sibling(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

/// Create all parent directories of `path`, if any.
pub fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_context(parent, e))?;
        }
    }
    Ok(())
}

/// Recursively collect files under `root`, returned as `(abs_path,
/// logical_path)` pairs in path-sorted order. `include_hidden` controls
/// whether dotfile-named entries (and their subtrees) are kept.
pub fn collect_dir_files(root: &Path, include_hidden: bool) -> Result<Vec<(PathBuf, String)>> {
    let mut out = Vec::new();
    walk(root, root, include_hidden, &mut out)?;
    out.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(out)
}

fn walk(
    root: &Path,
    dir: &Path,
    include_hidden: bool,
    out: &mut Vec<(PathBuf, String)>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| io_context(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_context(dir, e))?;
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if !include_hidden && name_str.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().map_err(|e| io_context(&path, e))?;
        if file_type.is_dir() {
            walk(root, &path, include_hidden, out)?;
        } else if file_type.is_file() {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((path, rel));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");
        write_atomic(&dest, b"hello").unwrap();
        assert_eq!(read_file(&dest).unwrap(), b"hello");
        assert!(!temp_sibling(&dest).exists());
    }

    #[test]
    fn collect_dir_files_sorts_and_filters_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join(".hidden"), b"h").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.txt"), b"c").unwrap();

        let files = collect_dir_files(dir.path(), false).unwrap();
        let names: Vec<&str> = files.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub/c.txt"]);

        let all = collect_dir_files(dir.path(), true).unwrap();
        assert_eq!(all.len(), 4);
    }
}
