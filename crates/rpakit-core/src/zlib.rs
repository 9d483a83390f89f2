//! Zlib codec: wraps deflate/inflate in zlib-wrapped and raw modes.
//!
//! Every decompression in this codebase tries zlib-wrapped first, then
//! falls back to raw deflate — this module is the single place that rule
//! lives, so the index codec's junk-prefix recovery (`index.rs`) can just
//! call `inflate_any` at successive offsets.

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// How many leading bytes of junk the reader tolerates before the real
/// zlib/deflate stream starts, when probing a candidate region.
pub const JUNK_PREFIX_BUDGET: usize = 256;

/// Try zlib-wrapped inflate, then raw deflate. Returns `None` if neither
/// succeeds *and consumes the whole input* — a successful inflate that
/// leaves trailing garbage is still accepted, matching how real archives
/// sometimes carry padding after the compressed index.
pub fn inflate_any(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    if ZlibDecoder::new(data).read_to_end(&mut out).is_ok() && !out.is_empty() {
        return Some(out);
    }
    out.clear();
    if DeflateDecoder::new(data).read_to_end(&mut out).is_ok() && !out.is_empty() {
        return Some(out);
    }
    None
}

/// Scan `data` for a zlib/raw-deflate stream starting within the first
/// `JUNK_PREFIX_BUDGET` bytes. Returns the decompressed payload and the
/// byte offset at which the real stream began.
pub fn inflate_with_junk_tolerance(data: &[u8]) -> Option<(Vec<u8>, usize)> {
    let budget = JUNK_PREFIX_BUDGET.min(data.len());
    for start in 0..=budget {
        if let Some(out) = inflate_any(&data[start..]) {
            return Some((out, start));
        }
    }
    None
}

/// Deflate `data` with a zlib wrapper at the default compression level.
pub fn deflate_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_zlib_wrapped() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let compressed = deflate_zlib(&payload).unwrap();
        assert_eq!(inflate_any(&compressed).unwrap(), payload);
    }

    #[test]
    fn accepts_raw_deflate() {
        use flate2::write::DeflateEncoder;
        let payload = b"raw deflate payload, no zlib header here".to_vec();
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&payload).unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(inflate_any(&compressed).unwrap(), payload);
    }

    #[test]
    fn junk_prefix_recovered_within_budget() {
        let payload = b"member index payload".to_vec();
        let compressed = deflate_zlib(&payload).unwrap();
        let mut junked = vec![0xAAu8; 17];
        junked.extend_from_slice(&compressed);
        let (out, offset) = inflate_with_junk_tolerance(&junked).unwrap();
        assert_eq!(out, payload);
        assert_eq!(offset, 17);
    }

    #[test]
    fn junk_prefix_beyond_budget_fails() {
        let payload = b"member index payload".to_vec();
        let compressed = deflate_zlib(&payload).unwrap();
        let mut junked = vec![0xAAu8; JUNK_PREFIX_BUDGET + 1];
        junked.extend_from_slice(&compressed);
        assert!(inflate_with_junk_tolerance(&junked).is_none());
    }
}
