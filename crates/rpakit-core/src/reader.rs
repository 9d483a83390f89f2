//! Archive reader: composes the header and index codecs behind a
//! memoising, read-only `ArchiveReader` (§4.5), generalizing
//! `renpak-core::rpa::RpaReader` to all four families.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::classifier::{self, Classification};
use crate::error::{Result, RpaError};
use crate::header::{self, Header};
use crate::index::{self, Index};
use crate::io_util;
use crate::progress::{ProgressReport, Stage};

pub struct ArchiveReader {
    archive_path: PathBuf,
    bytes: Vec<u8>,
    header: OnceLock<Header>,
    index: OnceLock<Index>,
}

/// Downstream script decompiler, named but left unimplemented by this
/// crate (§1: "an embedded runtime for an external serializer" and a
/// decompiler are both out of scope, treated as interfaces only).
/// `extract_all` drives this hook when a caller supplies one; with none,
/// the decompile stage is skipped entirely.
pub trait Decompiler {
    fn decompile(&self, bytes: &[u8]) -> std::result::Result<Vec<u8>, String>;
}

/// Files eligible for the decompile stage: compiled Ren'Py script bytecode.
fn is_compiled_script(path: &str) -> bool {
    path.ends_with(".rpyc") || path.ends_with(".rpymc")
}

impl ArchiveReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let archive_path = path.as_ref().to_path_buf();
        let bytes = io_util::read_file(&archive_path)?;
        Ok(Self { archive_path, bytes, header: OnceLock::new(), index: OnceLock::new() })
    }

    pub fn read_header(&self) -> Result<&Header> {
        if self.header.get().is_none() {
            let h = header::parse(&self.bytes)?;
            let _ = self.header.set(h);
        }
        Ok(self.header.get().expect("just initialised"))
    }

    pub fn read_index(&self) -> Result<&Index> {
        if self.index.get().is_none() {
            let header = self.read_header()?.clone();
            let idx = if header.family.uses_sidecar() {
                let sidecar = sidecar_path_for(&self.archive_path);
                let sidecar_bytes = io_util::read_file(&sidecar)?;
                index::read(&header, &self.bytes, Some(&sidecar_bytes))?
            } else {
                index::read(&header, &self.bytes, None)?
            };
            let _ = self.index.set(idx);
        }
        Ok(self.index.get().expect("just initialised"))
    }

    /// Paths in pickle insertion order.
    pub fn list_paths(&self) -> Result<&[String]> {
        Ok(self.read_index()?.paths())
    }

    /// Extract one member, identified by its logical archive path, to
    /// `dest` (an exact filesystem path chosen by the caller).
    pub fn extract_one(&self, logical_path: &str, dest: &Path) -> Result<()> {
        let index = self.read_index()?;
        let entry = index
            .get(logical_path)
            .ok_or_else(|| RpaError::NotFound(logical_path.to_string()))?;
        let payload = self.payload_bytes(entry)?;
        io_util::create_parent_dirs(dest)?;
        io_util::write_atomic(dest, &payload)
    }

    /// Extract every member under `dest_dir`, reporting progress. An unsafe
    /// member path (§8 scenario 5) is refused and recorded into
    /// `summary.failures` as a `NotFound`-like kind; other entries proceed
    /// normally. Continues past per-member `DecompileError`s (aggregated in
    /// the returned summary) but aborts on the first `IOError`. When
    /// `decompiler` is `Some`, every extracted `.rpyc`/`.rpymc` member is
    /// additionally run through it, writing the result alongside the raw
    /// bytes as a sibling `.rpy` file; with `None` the decompile stage is
    /// skipped.
    pub fn extract_all(
        &self,
        dest_dir: &Path,
        decompiler: Option<&dyn Decompiler>,
        progress: &mut dyn ProgressReport,
    ) -> Result<ExtractSummary> {
        let index = self.read_index()?;
        let total = index.len();
        progress.phase_start(Stage::Extract, total);

        let mut summary = ExtractSummary::default();
        let mut compiled_scripts = Vec::new();
        for (i, path) in index.paths().iter().enumerate() {
            if !is_safe_logical_path(path) {
                let err = RpaError::NotFound(format!("refusing unsafe member path: {path:?}"));
                progress.warning(&format!("{path}: {err}"));
                summary.failures.push((path.clone(), err.to_string()));
                progress.task_done(Stage::Extract, i + 1, path);
                continue;
            }
            let entry = index.get(path).expect("path came from this index");
            let dest = dest_dir.join(path);

            match self.payload_bytes(entry) {
                Ok(payload) => {
                    io_util::create_parent_dirs(&dest)?;
                    io_util::write_atomic(&dest, &payload)?;
                    if is_compiled_script(path) {
                        compiled_scripts.push((path.clone(), payload));
                    }
                    summary.extracted += 1;
                }
                Err(err @ RpaError::Io(_)) => return Err(err),
                Err(err) => {
                    progress.warning(&format!("{path}: {err}"));
                    summary.failures.push((path.clone(), err.to_string()));
                }
            }
            progress.task_done(Stage::Extract, i + 1, path);
        }
        progress.phase_end(Stage::Extract);

        if let Some(decompiler) = decompiler {
            if !compiled_scripts.is_empty() {
                progress.phase_start(Stage::Decompile, compiled_scripts.len());
                for (i, (path, bytes)) in compiled_scripts.iter().enumerate() {
                    match decompiler.decompile(bytes) {
                        Ok(source) => {
                            let dest = dest_dir.join(path).with_extension("rpy");
                            io_util::create_parent_dirs(&dest)?;
                            io_util::write_atomic(&dest, &source)?;
                            summary.decompiled += 1;
                        }
                        Err(message) => {
                            progress.warning(&format!("{path}: {message}"));
                            summary.decompile_failures.push((path.clone(), message));
                        }
                    }
                    progress.task_done(Stage::Decompile, i + 1, path);
                }
                progress.phase_end(Stage::Decompile);
            }
        }

        progress.phase_start(Stage::Complete, 1);
        progress.task_done(Stage::Complete, 1, "done");
        progress.phase_end(Stage::Complete);
        Ok(summary)
    }

    /// Run the runtime classifier (§4.7) over an already-extracted script
    /// file's bytes.
    pub fn classify_script(&self, bytes: &[u8]) -> Classification {
        classifier::classify(bytes)
    }

    fn payload_bytes(&self, entry: &index::Entry) -> Result<Vec<u8>> {
        let start = entry.offset as usize;
        let end = start
            .checked_add(entry.length as usize)
            .ok_or_else(|| RpaError::bad_index("entry range overflows"))?;
        let body = self
            .bytes
            .get(start..end)
            .ok_or_else(|| RpaError::bad_index(format!("entry range {start}..{end} exceeds archive length")))?;
        let mut out = Vec::with_capacity(entry.prefix.len() + body.len());
        out.extend_from_slice(&entry.prefix);
        out.extend_from_slice(body);
        Ok(out)
    }
}

#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub failures: Vec<(String, String)>,
    pub decompiled: usize,
    pub decompile_failures: Vec<(String, String)>,
}

/// Replace (case-insensitively) or append a `.rpi` suffix for a family-1
/// archive's sidecar index.
pub fn sidecar_path_for(archive_path: &Path) -> PathBuf {
    match archive_path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("rpa") => archive_path.with_extension("rpi"),
        _ => {
            let mut s = archive_path.as_os_str().to_os_string();
            s.push(".rpi");
            PathBuf::from(s)
        }
    }
}

/// Reject logical paths that could escape a destination directory when
/// joined: `..` components, absolute roots, and empty segments.
pub fn is_safe_logical_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    path.split('/').all(|seg| !seg.is_empty() && seg != "..")
}
