//! Native pickle writer.
//!
//! Targets protocol 2 by default, optionally 4 (`WriterOptions::pickle_proto`
//! in `writer.rs`). Only the opcodes needed to emit
//! `dict[str, list[tuple[int, int]]]` — the index's on-wire shape — are
//! implemented; this is deliberately narrower than the reader; see §4.3 and
//! §9 ("Native pickle writer is the default").

use super::value::Value;

pub fn encode(value: &Value, protocol: u8) -> std::io::Result<Vec<u8>> {
    let mut w = Writer { out: Vec::new(), memo_next: 0 };
    w.out.push(super::opcodes::PROTO);
    w.out.push(protocol);
    w.write_value(value, protocol);
    w.out.push(super::opcodes::STOP);
    Ok(w.out)
}

struct Writer {
    out: Vec<u8>,
    memo_next: u32,
}

impl Writer {
    fn write_value(&mut self, value: &Value, protocol: u8) {
        match value {
            Value::None => self.out.push(super::opcodes::NONE),
            Value::Bool(true) => self.out.push(super::opcodes::NEWTRUE),
            Value::Bool(false) => self.out.push(super::opcodes::NEWFALSE),
            Value::Int(n) => self.write_int(*n),
            Value::Float(f) => self.write_float(*f),
            Value::Str(s) => self.write_str(s, protocol),
            Value::Bytes(b) => self.write_bytes(b),
            Value::List(items) => self.write_list(items, protocol),
            Value::Tuple(items) => self.write_tuple(items, protocol),
            Value::Dict(pairs) => self.write_dict(pairs, protocol),
            Value::Set(items) => self.write_set(items, protocol),
            Value::Global { module, name } => self.write_global(module, name),
        }
        self.memoize(protocol);
    }

    /// `MEMOIZE` (protocol >= 4) carries no explicit index — writer and
    /// reader both track an implicit counter. Protocol 2 has no such
    /// opcode, so fall back to `BINPUT`/`LONG_BINPUT` with an explicit one.
    fn memoize(&mut self, protocol: u8) {
        if protocol >= 4 {
            self.out.push(super::opcodes::MEMOIZE);
        } else {
            let idx = self.memo_next;
            if idx <= 0xff {
                self.out.push(super::opcodes::BINPUT);
                self.out.push(idx as u8);
            } else {
                self.out.push(super::opcodes::LONG_BINPUT);
                self.out.extend_from_slice(&idx.to_le_bytes());
            }
        }
        self.memo_next += 1;
    }

    fn write_int(&mut self, n: i64) {
        if (0..=0xff).contains(&n) {
            self.out.push(super::opcodes::BININT1);
            self.out.push(n as u8);
        } else if (0..=0xffff).contains(&n) {
            self.out.push(super::opcodes::BININT2);
            self.out.extend_from_slice(&(n as u16).to_le_bytes());
        } else if (i32::MIN as i64..=i32::MAX as i64).contains(&n) {
            self.out.push(super::opcodes::BININT);
            self.out.extend_from_slice(&(n as i32).to_le_bytes());
        } else {
            self.out.push(super::opcodes::LONG1);
            let bytes = n.to_le_bytes();
            self.out.push(bytes.len() as u8);
            self.out.extend_from_slice(&bytes);
        }
    }

    fn write_float(&mut self, f: f64) {
        self.out.push(super::opcodes::BINFLOAT);
        self.out.extend_from_slice(&f.to_be_bytes());
    }

    fn write_str(&mut self, s: &str, protocol: u8) {
        let bytes = s.as_bytes();
        if protocol >= 4 && bytes.len() < 256 {
            self.out.push(super::opcodes::SHORT_BINUNICODE);
            self.out.push(bytes.len() as u8);
        } else {
            self.out.push(super::opcodes::BINUNICODE);
            self.out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        }
        self.out.extend_from_slice(bytes);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        if bytes.len() < 256 {
            self.out.push(super::opcodes::SHORT_BINBYTES);
            self.out.push(bytes.len() as u8);
        } else {
            self.out.push(super::opcodes::BINBYTES);
            self.out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        }
        self.out.extend_from_slice(bytes);
    }

    fn write_tuple(&mut self, items: &[Value], protocol: u8) {
        match items.len() {
            0 => self.out.push(super::opcodes::EMPTY_TUPLE),
            1 => {
                self.write_value(&items[0], protocol);
                self.out.push(super::opcodes::TUPLE1);
            }
            2 => {
                self.write_value(&items[0], protocol);
                self.write_value(&items[1], protocol);
                self.out.push(super::opcodes::TUPLE2);
            }
            3 => {
                self.write_value(&items[0], protocol);
                self.write_value(&items[1], protocol);
                self.write_value(&items[2], protocol);
                self.out.push(super::opcodes::TUPLE3);
            }
            _ => {
                self.out.push(super::opcodes::MARK);
                for item in items {
                    self.write_value(item, protocol);
                }
                self.out.push(super::opcodes::TUPLE);
            }
        }
    }

    fn write_list(&mut self, items: &[Value], protocol: u8) {
        self.out.push(super::opcodes::EMPTY_LIST);
        if items.is_empty() {
            return;
        }
        self.out.push(super::opcodes::MARK);
        for item in items {
            self.write_value(item, protocol);
        }
        self.out.push(super::opcodes::APPENDS);
    }

    fn write_dict(&mut self, pairs: &[(Value, Value)], protocol: u8) {
        self.out.push(super::opcodes::EMPTY_DICT);
        if pairs.is_empty() {
            return;
        }
        self.out.push(super::opcodes::MARK);
        for (k, v) in pairs {
            self.write_value(k, protocol);
            self.write_value(v, protocol);
        }
        self.out.push(super::opcodes::SETITEMS);
    }

    fn write_set(&mut self, items: &[Value], protocol: u8) {
        self.out.push(super::opcodes::EMPTY_SET);
        if items.is_empty() {
            return;
        }
        self.out.push(super::opcodes::MARK);
        for item in items {
            self.write_value(item, protocol);
        }
        self.out.push(super::opcodes::ADDITEMS);
    }

    fn write_global(&mut self, module: &str, name: &str) {
        self.out.push(super::opcodes::SHORT_BINUNICODE);
        self.out.push(module.len() as u8);
        self.out.extend_from_slice(module.as_bytes());
        self.out.push(super::opcodes::SHORT_BINUNICODE);
        self.out.push(name.len() as u8);
        self.out.extend_from_slice(name.as_bytes());
        self.out.push(super::opcodes::STACK_GLOBAL);
    }
}
