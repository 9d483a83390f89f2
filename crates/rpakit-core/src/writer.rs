//! Archive writer: composes the pickle, zlib, and header codecs into a
//! one-shot `ArchiveWriter` (§4.6), generalizing
//! `renpak-core::rpa::RpaWriter` to all four families and to the optional
//! external-serializer delegation path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Result, RpaError};
use crate::header::{self, Family};
use crate::index;
use crate::io_util;
use crate::pickle;
use crate::reader::sidecar_path_for;
use crate::serializer::{ExternalSerializer, SerializeEntry, SerializeRequest, SerializeSegment};
use crate::zlib;

const MARKER: &[u8] = b"Made with Ren'Py.";

#[derive(Debug, Clone)]
pub enum SerializerMode {
    Native,
    External(PathBuf),
}

impl Default for SerializerMode {
    fn default() -> Self {
        SerializerMode::Native
    }
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub version: Family,
    pub key: Option<u32>,
    pub pickle_proto: Option<u8>,
    pub marker: bool,
    pub include_hidden: bool,
    pub force: bool,
    pub serializer: SerializerMode,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            version: Family::V3,
            key: None,
            pickle_proto: None,
            marker: false,
            include_hidden: false,
            force: false,
            serializer: SerializerMode::Native,
        }
    }
}

pub struct ArchiveWriter;

impl ArchiveWriter {
    /// Package `src_dir`'s files (collected recursively, path-sorted) into
    /// `dest`.
    pub fn create_from_dir(dest: &Path, src_dir: &Path, options: &WriterOptions) -> Result<()> {
        let inputs = io_util::collect_dir_files(src_dir, options.include_hidden)?;
        Self::create(dest, &inputs, options)
    }

    /// Package an explicit `(absolute_path, logical_path)` list into
    /// `dest`. `inputs` is written in the given order.
    pub fn create(dest: &Path, inputs: &[(PathBuf, String)], options: &WriterOptions) -> Result<()> {
        if inputs.is_empty() {
            return Err(RpaError::EmptyInput);
        }
        if dest.exists() && !options.force {
            return Err(RpaError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists (pass force to overwrite)", dest.display()),
            )));
        }

        let family = options.version;
        let key = resolve_key(family, options.key)?;
        let pickle_proto = options.pickle_proto.unwrap_or_else(|| family.default_pickle_protocol());
        if options.marker && !family.allows_marker() {
            return Err(RpaError::Unsupported(format!("{} does not support marker padding", family.tag())));
        }
        let marker_enabled = options.marker && family.allows_marker();

        reject_path_collisions(inputs)?;

        let placeholder = if family.uses_sidecar() { String::new() } else { header::emit(family, 0, key) };

        let mut body = Vec::new();
        body.extend_from_slice(placeholder.as_bytes());

        let mut placements = Vec::with_capacity(inputs.len());
        for (abs_path, logical_path) in inputs {
            let data = io_util::read_file(abs_path)?;
            if marker_enabled {
                body.extend_from_slice(MARKER);
            }
            let offset = body.len() as u64;
            body.extend_from_slice(&data);
            placements.push((logical_path.clone(), offset, data.len() as u64));
        }
        let index_offset = body.len() as u64;

        if family.has_key() {
            reject_oversized_placements(&placements)?;
        }

        let compressed_index = build_index_bytes(&placements, key, pickle_proto, &options.serializer)?;

        if family.uses_sidecar() {
            io_util::write_atomic(dest, &body)?;
            io_util::write_atomic(&sidecar_path_for(dest), &compressed_index)?;
            return Ok(());
        }

        body.extend_from_slice(&compressed_index);
        let real_header = header::emit(family, index_offset, key);
        if real_header.len() != placeholder.len() {
            return Err(RpaError::LayoutMismatch(format!(
                "header placeholder was {} bytes, real header line is {} bytes",
                placeholder.len(),
                real_header.len()
            )));
        }
        body[..real_header.len()].copy_from_slice(real_header.as_bytes());
        io_util::write_atomic(dest, &body)
    }
}

fn resolve_key(family: Family, requested: Option<u32>) -> Result<u32> {
    if family.has_key() {
        Ok(requested.unwrap_or_else(|| family.default_key()))
    } else if requested.is_some() {
        Err(RpaError::Unsupported(format!("{} does not support an XOR key override", family.tag())))
    } else {
        Ok(0)
    }
}

/// XOR-masking (`index::xor_mask`) only touches the low 32 bits of an
/// offset/length; a placement whose real value overflows `u32` would be
/// silently masked rather than refused, so families that XOR-mask their
/// index must reject oversized placements up front instead of truncating.
fn reject_oversized_placements(placements: &[(String, u64, u64)]) -> Result<()> {
    for (path, offset, length) in placements {
        if *offset > u32::MAX as u64 || *length > u32::MAX as u64 {
            return Err(RpaError::LayoutMismatch(format!(
                "{path:?} offset/length exceeds 32 bits (offset={offset:#x}, length={length:#x})"
            )));
        }
    }
    Ok(())
}

fn reject_path_collisions(inputs: &[(PathBuf, String)]) -> Result<()> {
    let mut seen = HashSet::new();
    for (_, logical_path) in inputs {
        if !seen.insert(logical_path.to_lowercase()) {
            return Err(RpaError::LayoutMismatch(format!(
                "logical path {logical_path:?} collides with another entry once case-normalised"
            )));
        }
    }
    Ok(())
}

fn build_index_bytes(
    placements: &[(String, u64, u64)],
    key: u32,
    pickle_proto: u8,
    serializer: &SerializerMode,
) -> Result<Vec<u8>> {
    let pickled = match serializer {
        SerializerMode::Native => {
            let value = index::to_pickle_value(placements, key);
            pickle::encode(&value, pickle_proto)?
        }
        SerializerMode::External(program) => {
            let entries = placements
                .iter()
                .map(|(path, offset, length)| SerializeEntry {
                    path: path.clone(),
                    segments: vec![SerializeSegment {
                        offset: index::xor_mask(*offset, key),
                        length: index::xor_mask(*length, key),
                        prefix_b64: None,
                    }],
                })
                .collect();
            let request = SerializeRequest { protocol: pickle_proto, entries };
            ExternalSerializer::new(program.clone()).serialize(&request)?
        }
    };
    Ok(zlib::deflate_zlib(&pickled)?)
}
