//! Runtime classifier: inspects an extracted compiled-script file's byte
//! format and estimates interpreter generation (§4.7). Advisory only — it
//! never drives control flow elsewhere in this crate.

use crate::zlib;

const RPC2_MAGIC: &[u8] = b"RENPY RPC2";
const SLOT_TABLE_START: usize = 12;
const SLOT_RECORD_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Rpc1,
    Rpc2,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub format: Format,
    pub python_major: Option<u8>,
    pub renpy_major: Option<u8>,
    pub pickle_protocol: Option<u8>,
    pub confidence: Confidence,
    pub script_version: Option<u64>,
    pub has_init_offset: bool,
    pub notes: Vec<String>,
    pub label: String,
}

struct SlotRecord {
    slot: u32,
    start: u32,
    length: u32,
}

fn read_slot_table(data: &[u8]) -> Option<Vec<SlotRecord>> {
    let mut slots = Vec::new();
    let mut pos = SLOT_TABLE_START;
    loop {
        let record = data.get(pos..pos + SLOT_RECORD_LEN)?;
        let slot = u32::from_le_bytes(record[0..4].try_into().unwrap());
        if slot == 0 {
            break;
        }
        let start = u32::from_le_bytes(record[4..8].try_into().unwrap());
        let length = u32::from_le_bytes(record[8..12].try_into().unwrap());
        slots.push(SlotRecord { slot, start, length });
        pos += SLOT_RECORD_LEN;
    }
    Some(slots)
}

/// Classify `bytes`, the full contents of one extracted compiled-script
/// file.
pub fn classify(bytes: &[u8]) -> Classification {
    if bytes.len() >= SLOT_TABLE_START && &bytes[..RPC2_MAGIC.len().min(bytes.len())] == RPC2_MAGIC {
        return classify_rpc2(bytes);
    }
    if zlib::inflate_any(bytes).is_some() {
        return Classification {
            format: Format::Rpc1,
            python_major: Some(2),
            renpy_major: Some(6),
            pickle_protocol: None,
            confidence: Confidence::Medium,
            script_version: None,
            has_init_offset: false,
            notes: vec!["whole-file zlib stream, no slot table".to_string()],
            label: "≤ 6.17 legacy".to_string(),
        };
    }
    Classification {
        format: Format::Unknown,
        python_major: None,
        renpy_major: None,
        pickle_protocol: None,
        confidence: Confidence::Low,
        script_version: None,
        has_init_offset: false,
        notes: vec!["neither RPC2 magic nor a whole-file zlib stream was found".to_string()],
        label: "unknown".to_string(),
    }
}

fn classify_rpc2(bytes: &[u8]) -> Classification {
    let mut notes = Vec::new();
    let slots = match read_slot_table(bytes) {
        Some(s) => s,
        None => {
            return Classification {
                format: Format::Rpc2,
                python_major: None,
                renpy_major: None,
                pickle_protocol: None,
                confidence: Confidence::Low,
                script_version: None,
                has_init_offset: false,
                notes: vec!["slot table truncated".to_string()],
                label: "unknown".to_string(),
            }
        }
    };

    let slot1 = slots.iter().find(|s| s.slot == 1);
    // A populated slot 2 carries the init-offset record in the layouts this
    // classifier has seen; its presence is the only signal available from
    // the slot table alone.
    let has_init_offset = slots.iter().any(|s| s.slot == 2 && s.length > 0);

    let Some(slot1) = slot1 else {
        notes.push("no slot-1 record in slot table".to_string());
        return Classification {
            format: Format::Rpc2,
            python_major: None,
            renpy_major: None,
            pickle_protocol: None,
            confidence: Confidence::Low,
            script_version: None,
            has_init_offset,
            notes,
            label: "unknown".to_string(),
        };
    };

    let start = slot1.start as usize;
    let end = start.saturating_add(slot1.length as usize);
    let Some(region) = bytes.get(start..end) else {
        notes.push("slot-1 record out of range".to_string());
        return Classification {
            format: Format::Rpc2,
            python_major: None,
            renpy_major: None,
            pickle_protocol: None,
            confidence: Confidence::Low,
            script_version: None,
            has_init_offset,
            notes,
            label: "unknown".to_string(),
        };
    };

    let Some(decompressed) = zlib::inflate_any(region) else {
        notes.push("slot-1 record did not decompress".to_string());
        return Classification {
            format: Format::Rpc2,
            python_major: None,
            renpy_major: None,
            pickle_protocol: None,
            confidence: Confidence::Low,
            script_version: None,
            has_init_offset,
            notes,
            label: "unknown".to_string(),
        };
    };

    let (pickle_protocol, generation3) = match decompressed.first() {
        Some(0x80) => {
            let proto = decompressed.get(1).copied();
            (proto, proto.map(|p| p >= 3).unwrap_or(false))
        }
        _ => {
            notes.push("slot-1 payload does not start with a PROTO opcode".to_string());
            (None, false)
        }
    };

    let python_major = Some(if generation3 { 3 } else { 2 });
    let renpy_major = Some(if generation3 { 8 } else { 6 });
    let label = if generation3 { "8.x".to_string() } else { "6.x/7.x".to_string() };

    Classification {
        format: Format::Rpc2,
        python_major,
        renpy_major,
        pickle_protocol,
        confidence: Confidence::Medium,
        script_version: None,
        has_init_offset,
        notes,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_table_bytes(slots: &[(u32, u32, u32)]) -> Vec<u8> {
        let mut out = vec![0u8; SLOT_TABLE_START];
        out[..RPC2_MAGIC.len()].copy_from_slice(RPC2_MAGIC);
        for (slot, start, length) in slots {
            out.extend_from_slice(&slot.to_le_bytes());
            out.extend_from_slice(&start.to_le_bytes());
            out.extend_from_slice(&length.to_le_bytes());
        }
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    #[test]
    fn classifies_rpc2_python3() {
        let payload = {
            let mut p = vec![0x80u8, 0x04];
            p.extend_from_slice(b"rest of a pickled stream padding out the buffer");
            p
        };
        let compressed = zlib::deflate_zlib(&payload).unwrap();
        let mut bytes = slot_table_bytes(&[(1, 0, 0)]);
        let slot1_start = bytes.len() as u32;
        bytes.extend_from_slice(&compressed);
        // Patch slot 1's (start, length) now that we know where it landed.
        let slot_pos = SLOT_TABLE_START;
        bytes[slot_pos + 4..slot_pos + 8].copy_from_slice(&slot1_start.to_le_bytes());
        bytes[slot_pos + 8..slot_pos + 12].copy_from_slice(&(compressed.len() as u32).to_le_bytes());

        let result = classify(&bytes);
        assert_eq!(result.format, Format::Rpc2);
        assert_eq!(result.python_major, Some(3));
        assert_eq!(result.renpy_major, Some(8));
        assert_eq!(result.pickle_protocol, Some(4));
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.label, "8.x");
    }

    #[test]
    fn classifies_rpc1_whole_file_zlib() {
        let payload = b"legacy compiled script bytes".repeat(4);
        let compressed = zlib::deflate_zlib(&payload).unwrap();
        let result = classify(&compressed);
        assert_eq!(result.format, Format::Rpc1);
        assert_eq!(result.label, "\u{2264} 6.17 legacy");
    }

    #[test]
    fn classifies_unknown_for_garbage() {
        let result = classify(b"not a script at all, just noise");
        assert_eq!(result.format, Format::Unknown);
        assert_eq!(result.confidence, Confidence::Low);
    }
}
