//! Header codec: the family-detecting first line of an archive (§4.1).

use crate::error::{Result, RpaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V1,
    V2,
    V3,
    V3_2,
    V4,
}

impl Family {
    pub fn tag(self) -> &'static str {
        match self {
            Family::V1 => "RPA-1.0",
            Family::V2 => "RPA-2.0",
            Family::V3 => "RPA-3.0",
            Family::V3_2 => "RPA-3.2",
            Family::V4 => "RPA-4.0",
        }
    }

    pub fn has_offset(self) -> bool {
        !matches!(self, Family::V1)
    }

    pub fn has_key(self) -> bool {
        matches!(self, Family::V3 | Family::V3_2 | Family::V4)
    }

    pub fn uses_sidecar(self) -> bool {
        matches!(self, Family::V1)
    }

    /// Default pickle protocol for freshly-written archives of this family
    /// (§4.3 — "protocol 2 by default for older families, 4 for the
    /// newest").
    pub fn default_pickle_protocol(self) -> u8 {
        match self {
            Family::V4 => 4,
            _ => 2,
        }
    }

    /// Default XOR key used when the caller does not override one.
    pub fn default_key(self) -> u32 {
        match self {
            Family::V3 | Family::V3_2 => 0xDEAD_BEEF,
            Family::V4 => 0xDEAD_BEEF,
            Family::V1 | Family::V2 => 0,
        }
    }

    pub fn allows_marker(self) -> bool {
        !matches!(self, Family::V1)
    }
}

#[derive(Debug, Clone)]
pub struct Header {
    pub family: Family,
    pub offset: u64,
    pub key: u32,
    pub raw_line: String,
}

/// Parse the header line out of the first bytes of an archive. Only the
/// first 50 bytes (or up to the first newline, whichever is shorter) are
/// consulted, per §4.1.
pub fn parse(data: &[u8]) -> Result<Header> {
    let window = &data[..data.len().min(50)];
    let line_bytes = match window.iter().position(|&b| b == b'\n') {
        Some(nl) => &window[..nl],
        None => window,
    };
    let raw_line = String::from_utf8_lossy(line_bytes).into_owned();

    let mut tokens = raw_line.split_whitespace();
    let tag = match tokens.next() {
        Some(t) if t.starts_with("RPA-") => t,
        _ => {
            // Missing or unrecognised first token: fall back to family-1
            // with a zero offset (§4.1 — cheaper than erroring, some
            // legacy archives omit the header entirely).
            return Ok(Header { family: Family::V1, offset: 0, key: 0, raw_line });
        }
    };

    let family = match tag {
        "RPA-1.0" | "RPA-1" => Family::V1,
        "RPA-2.0" => Family::V2,
        "RPA-3.0" => Family::V3,
        "RPA-3.2" => Family::V3_2,
        "RPA-4.0" => Family::V4,
        other => return Err(RpaError::bad_header(format!("unrecognised family tag {other:?}"))),
    };

    let offset = if family.has_offset() {
        let tok = tokens
            .next()
            .ok_or_else(|| RpaError::bad_header(format!("{tag} header missing offset")))?;
        parse_hex_u64(tok)?
    } else {
        0
    };

    let key = if family.has_key() {
        let tok = tokens
            .next()
            .ok_or_else(|| RpaError::bad_header(format!("{tag} header missing key")))?;
        parse_hex_u32(tok)?
    } else {
        0
    };

    Ok(Header { family, offset, key, raw_line })
}

fn parse_hex_u64(tok: &str) -> Result<u64> {
    u64::from_str_radix(tok, 16)
        .map_err(|_| RpaError::bad_header(format!("bad offset {tok:?}: not hex")))
}

fn parse_hex_u32(tok: &str) -> Result<u32> {
    u32::from_str_radix(tok, 16)
        .map_err(|_| RpaError::bad_header(format!("bad key {tok:?}: not hex")))
}

/// Render the header line for `family` at the given `offset`/`key`.
/// Reserves the exact final width: callers that need a placeholder of known
/// width before `offset` is known should call this with `offset = 0` and
/// compare lengths, per §4.6's "patch the header placeholder" step.
pub fn emit(family: Family, offset: u64, key: u32) -> String {
    match family {
        Family::V1 => format!("{}\n", family.tag()),
        Family::V2 => format!("{} {:016X}\n", family.tag(), offset),
        Family::V3 | Family::V3_2 | Family::V4 => {
            format!("{} {:016X} {:08X}\n", family.tag(), offset, key)
        }
    }
}
