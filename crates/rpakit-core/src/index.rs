//! Index codec: zlib + pickle + XOR masking + junk-prefix tolerance (§4.4).

use std::collections::HashMap;

use crate::error::{Result, RpaError};
use crate::header::Header;
use crate::pickle::{self, Value};
use crate::zlib;

#[derive(Debug, Clone)]
pub struct Entry {
    pub offset: u64,
    pub length: u64,
    pub prefix: Vec<u8>,
}

/// `path -> Entry`, preserving pickle insertion order for `list_paths()`.
#[derive(Debug, Clone, Default)]
pub struct Index {
    order: Vec<String>,
    by_path: HashMap<String, Entry>,
}

impl Index {
    pub fn paths(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.by_path.get(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.order.iter().map(move |p| (p.as_str(), self.by_path.get(p).unwrap()))
    }

    fn insert(&mut self, path: String, entry: Entry) {
        if self.by_path.insert(path.clone(), entry).is_none() {
            self.order.push(path);
        }
    }
}

/// `masked = real XOR key`, applied to the low 32 bits only — the higher
/// bits of a 64-bit offset/length pass through untouched (§3 invariants).
/// XOR is its own inverse, so this same function masks and unmasks.
pub fn xor_mask(value: u64, key: u32) -> u64 {
    if key == 0 {
        return value;
    }
    let low = (value as u32) ^ key;
    let high = value & !0xFFFF_FFFFu64;
    high | low as u64
}

/// Locate and decompress the index bytes for `header`, given either the
/// archive's own bytes (non-sidecar families) or the sidecar's bytes
/// (family-1, where `archive_bytes` should be the `.rpi` contents).
fn index_region<'a>(header: &Header, archive_bytes: &'a [u8]) -> Result<&'a [u8]> {
    if header.family.uses_sidecar() {
        Ok(archive_bytes)
    } else {
        archive_bytes
            .get(header.offset as usize..)
            .ok_or_else(|| RpaError::bad_index(format!("index offset {} beyond end of file", header.offset)))
    }
}

/// Decode the index. `sidecar_bytes` must be `Some` for family-1 archives
/// (the whole `.rpi` file) and is ignored otherwise.
pub fn read(header: &Header, archive_bytes: &[u8], sidecar_bytes: Option<&[u8]>) -> Result<Index> {
    let region = if header.family.uses_sidecar() {
        sidecar_bytes.ok_or_else(|| {
            RpaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "family-1 archive has no header and no sidecar index was supplied",
            ))
        })?
    } else {
        index_region(header, archive_bytes)?
    };

    let (decompressed, _junk_skipped) = zlib::inflate_with_junk_tolerance(region)
        .ok_or_else(|| RpaError::bad_index("no zlib or raw-deflate stream found in index region"))?;

    let value = pickle::decode(&decompressed)?;
    build_index(value, header.key)
}

fn build_index(value: Value, key: u32) -> Result<Index> {
    let pairs = value
        .as_dict()
        .ok_or_else(|| RpaError::bad_index("top-level pickle value is not a mapping"))?;

    let mut index = Index::default();
    for (k, v) in pairs {
        let path = k
            .as_str()
            .ok_or_else(|| RpaError::bad_index("index key is not a string"))?
            .to_owned();

        let segments: &[Value] = match v {
            Value::List(items) => items,
            Value::Tuple(items) => items,
            _ => return Err(RpaError::bad_index_for("entry value is not a sequence", &path)),
        };
        let first = segments
            .first()
            .ok_or_else(|| RpaError::bad_index_for("entry has an empty segment sequence", &path))?;
        let tuple = first
            .as_tuple()
            .ok_or_else(|| RpaError::bad_index_for("segment is not a tuple", &path))?;

        let (offset_raw, length_raw, prefix) = match tuple.len() {
            2 => (
                tuple[0].as_i64().ok_or_else(|| bad_segment(&path))? as u64,
                tuple[1].as_i64().ok_or_else(|| bad_segment(&path))? as u64,
                Vec::new(),
            ),
            3 => (
                tuple[0].as_i64().ok_or_else(|| bad_segment(&path))? as u64,
                tuple[1].as_i64().ok_or_else(|| bad_segment(&path))? as u64,
                match &tuple[2] {
                    Value::Bytes(b) => b.clone(),
                    Value::Str(s) => s.as_bytes().to_vec(),
                    Value::None => Vec::new(),
                    _ => return Err(bad_segment(&path)),
                },
            ),
            _ => return Err(bad_segment(&path)),
        };

        index.insert(
            path,
            Entry { offset: xor_mask(offset_raw, key), length: xor_mask(length_raw, key), prefix },
        );
    }
    Ok(index)
}

fn bad_segment(path: &str) -> RpaError {
    RpaError::bad_index_for("segment is not a (offset, length[, prefix]) tuple of the expected types", path)
}

/// Build the raw pickle value for a finished layout, masking offset/length
/// when `key != 0`. The writer always emits the 2-tuple form (§6, §9 open
/// question).
pub fn to_pickle_value(entries: &[(String, u64, u64)], key: u32) -> Value {
    let pairs = entries
        .iter()
        .map(|(path, offset, length)| {
            let masked_offset = xor_mask(*offset, key) as i64;
            let masked_length = xor_mask(*length, key) as i64;
            (
                Value::Str(path.clone()),
                Value::List(vec![Value::Tuple(vec![
                    Value::Int(masked_offset),
                    Value::Int(masked_length),
                ])]),
            )
        })
        .collect();
    Value::Dict(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Family;

    #[test]
    fn xor_mask_is_its_own_inverse() {
        let key = 0x42u32;
        let masked = xor_mask(0x01020304, key);
        assert_eq!(masked, 0x01020346);
        assert_eq!(xor_mask(masked, key), 0x01020304);
    }

    #[test]
    fn xor_mask_noop_for_zero_key() {
        assert_eq!(xor_mask(123456, 0), 123456);
    }

    #[test]
    fn round_trips_through_pickle_and_zlib() {
        let entries = vec![
            ("a.txt".to_string(), 40u64, 5u64),
            ("b/c.bin".to_string(), 45u64, 3u64),
        ];
        let key = 0x42u32;
        let value = to_pickle_value(&entries, key);
        let pickled = pickle::encode(&value, 2).unwrap();
        let compressed = zlib::deflate_zlib(&pickled).unwrap();

        let header = Header { family: Family::V4, offset: 0, key, raw_line: String::new() };
        let index = read(&header, &compressed, None).unwrap();
        assert_eq!(index.paths(), &["a.txt", "b/c.bin"]);
        assert_eq!(index.get("a.txt").unwrap().offset, 40);
        assert_eq!(index.get("a.txt").unwrap().length, 5);
    }

    #[test]
    fn rejects_entry_with_empty_segment_list() {
        let value = Value::Dict(vec![(Value::Str("x".into()), Value::List(vec![]))]);
        let err = build_index(value, 0).unwrap_err();
        assert!(matches!(err, RpaError::BadIndex(_)));
    }
}
