//! Optional external-serializer delegation channel (§4.3, §6).
//!
//! The reference tool always delegates pickle emission to its embedded
//! runtime; this port makes the native writer (`pickle::writer`) the
//! default and keeps this channel only so `WriterOptions::serializer` can
//! exercise the documented fallback path end-to-end. The subprocess itself
//! is an out-of-scope collaborator — callers supply its path.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use serde::Serialize;

use crate::error::{Result, RpaError};

#[derive(Serialize)]
pub struct SerializeRequest {
    pub protocol: u8,
    pub entries: Vec<SerializeEntry>,
}

#[derive(Serialize)]
pub struct SerializeEntry {
    pub path: String,
    pub segments: Vec<SerializeSegment>,
}

#[derive(Serialize)]
pub struct SerializeSegment {
    pub offset: u64,
    pub length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_b64: Option<String>,
}

/// A lazily-spawned, process-wide, mutex-guarded subprocess (§5 — "never
/// concurrently driven by two writers in the same process"). The channel
/// itself is stateless per call: each request is a self-contained
/// base64-framed line in, base64-framed line out.
pub struct ExternalSerializer {
    program: PathBuf,
    child: Mutex<Option<Child>>,
}

impl ExternalSerializer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), child: Mutex::new(None) }
    }

    pub fn serialize(&self, request: &SerializeRequest) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(request)
            .map_err(|e| RpaError::Unsupported(format!("external serializer request: {e}")))?;
        let framed = base64_encode(&json);

        let mut guard = self.child.lock().expect("external serializer mutex poisoned");
        if guard.is_none() {
            *guard = Some(spawn(&self.program)?);
        }
        let child = guard.as_mut().expect("just populated");

        let stdin = child.stdin.as_mut().expect("piped at spawn");
        write_line(stdin, &framed)?;

        let stdout = child.stdout.as_mut().expect("piped at spawn");
        let line = read_line(stdout)?;
        base64_decode(line.trim_end())
            .ok_or_else(|| RpaError::Unsupported("external serializer returned invalid base64".to_string()))
    }
}

fn spawn(program: &Path) -> Result<Child> {
    Command::new(program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| RpaError::Io(std::io::Error::new(e.kind(), format!("spawning {}: {e}", program.display()))))
}

fn write_line(stdin: &mut ChildStdin, line: &str) -> Result<()> {
    stdin.write_all(line.as_bytes()).map_err(RpaError::Io)?;
    stdin.write_all(b"\n").map_err(RpaError::Io)?;
    stdin.flush().map_err(RpaError::Io)
}

fn read_line(stdout: &mut ChildStdout) -> Result<String> {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    reader.read_line(&mut line).map_err(RpaError::Io)?;
    if line.is_empty() {
        return Err(RpaError::Unsupported("external serializer closed its stdout".to_string()));
    }
    Ok(line)
}

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() + 2) / 3 * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied();
        let b2 = chunk.get(2).copied();

        out.push(ALPHABET[(b0 >> 2) as usize] as char);
        out.push(ALPHABET[(((b0 & 0x03) << 4) | (b1.unwrap_or(0) >> 4)) as usize] as char);
        out.push(match b1 {
            Some(b1) => ALPHABET[(((b1 & 0x0f) << 2) | (b2.unwrap_or(0) >> 6)) as usize] as char,
            None => '=',
        });
        out.push(match b2 {
            Some(b2) => ALPHABET[(b2 & 0x3f) as usize] as char,
            None => '=',
        });
    }
    out
}

fn base64_decode(s: &str) -> Option<Vec<u8>> {
    fn index_of(c: u8) -> Option<u8> {
        ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
    }

    let bytes: Vec<u8> = s.bytes().filter(|&b| b != b'\r' && b != b'\n').collect();
    if bytes.is_empty() {
        return Some(Vec::new());
    }
    if bytes.len() % 4 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    for chunk in bytes.chunks(4) {
        let pad = chunk.iter().filter(|&&b| b == b'=').count();
        let vals: Vec<u8> = chunk
            .iter()
            .map(|&b| if b == b'=' { Some(0) } else { index_of(b) })
            .collect::<Option<Vec<u8>>>()?;

        out.push((vals[0] << 2) | (vals[1] >> 4));
        if pad < 2 {
            out.push((vals[1] << 4) | (vals[2] >> 2));
        }
        if pad < 1 {
            out.push((vals[2] << 6) | vals[3]);
        }
    }
    Some(out)
}
