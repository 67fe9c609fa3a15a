//! Explicit schema descriptors for user-extensible node/edge attributes.
//!
//! The reference implementation discovers record layout by reflecting over
//! a user-supplied dataclass. This crate has no runtime reflection, so the
//! caller instead hands a [Schema] at open time: an ordered list of typed
//! fields from which a fixed packed width and a packer/unpacker are derived.

use serde::{Deserialize, Serialize};

use crate::{err_at, Result};

/// One field of an attribute schema.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    Bool,
    I32,
    I64,
    F32,
    /// Fixed-width zero-padded byte string of `width` bytes.
    Str(u16),
}

impl FieldKind {
    /// Packed width of this field, in bytes.
    pub fn width(&self) -> usize {
        match self {
            FieldKind::Bool => 1,
            FieldKind::I32 => 4,
            FieldKind::I64 => 8,
            FieldKind::F32 => 4,
            FieldKind::Str(w) => *w as usize,
        }
    }
}

/// One attribute value, tagged with the kind it was declared as.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    Str(String),
}

impl Value {
    fn kind(&self) -> FieldKind {
        match self {
            Value::Bool(_) => FieldKind::Bool,
            Value::I32(_) => FieldKind::I32,
            Value::I64(_) => FieldKind::I64,
            Value::F32(_) => FieldKind::F32,
            Value::Str(s) => FieldKind::Str(s.len() as u16),
        }
    }
}

/// Ordered list of named, typed fields describing the trailing
/// user-attribute bytes of a node or edge record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<(String, FieldKind)>,
}

impl Schema {
    pub fn new() -> Schema {
        Schema { fields: Vec::new() }
    }

    pub fn field(mut self, name: &str, kind: FieldKind) -> Schema {
        self.fields.push((name.to_string(), kind));
        self
    }

    /// Total packed width, in bytes, of all fields in this schema.
    pub fn width(&self) -> usize {
        self.fields.iter().map(|(_, k)| k.width()).sum()
    }

    /// 32-bit fingerprint of the ordered field-kind list, stamped into the
    /// static header so a reopen with a disagreeing schema fails fast
    /// instead of silently misreading trailing attribute bytes.
    pub fn fingerprint(&self) -> u32 {
        let mut buf = Vec::new();
        for (name, kind) in &self.fields {
            buf.extend_from_slice(name.as_bytes());
            buf.push(0);
            match kind {
                FieldKind::Bool => buf.push(0),
                FieldKind::I32 => buf.push(1),
                FieldKind::I64 => buf.push(2),
                FieldKind::F32 => buf.push(3),
                FieldKind::Str(w) => {
                    buf.push(4);
                    buf.extend_from_slice(&w.to_le_bytes());
                }
            }
        }
        crate::hash::hash32(&buf)
    }

    /// Pack `values`, positionally matched against `self.fields`, into `out`.
    pub fn pack(&self, values: &[Value], out: &mut Vec<u8>) -> Result<()> {
        if values.len() != self.fields.len() {
            return err_at!(
                InvalidInput,
                msg: "expected {} attrs, got {}",
                self.fields.len(),
                values.len()
            );
        }
        for ((_, kind), value) in self.fields.iter().zip(values.iter()) {
            if value.kind() != *kind {
                if let (FieldKind::Str(w), Value::Str(s)) = (kind, value) {
                    if s.len() > *w as usize {
                        return err_at!(KeyTooLong, msg: "attr string {:?} exceeds width {}", s, w);
                    }
                } else {
                    return err_at!(InvalidInput, msg: "attr kind mismatch for field {:?}", kind);
                }
            }
            match (kind, value) {
                (FieldKind::Bool, Value::Bool(b)) => out.push(*b as u8),
                (FieldKind::I32, Value::I32(v)) => out.extend_from_slice(&v.to_le_bytes()),
                (FieldKind::I64, Value::I64(v)) => out.extend_from_slice(&v.to_le_bytes()),
                (FieldKind::F32, Value::F32(v)) => out.extend_from_slice(&v.to_le_bytes()),
                (FieldKind::Str(w), Value::Str(s)) => {
                    let mut buf = vec![0u8; *w as usize];
                    buf[..s.len()].copy_from_slice(s.as_bytes());
                    out.extend_from_slice(&buf);
                }
                _ => return err_at!(Fatal, msg: "unreachable attr kind mismatch"),
            }
        }
        Ok(())
    }

    /// Unpack `self.fields.len()` values out of `buf`, in schema order.
    pub fn unpack(&self, mut buf: &[u8]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(self.fields.len());
        for (_, kind) in &self.fields {
            let w = kind.width();
            if buf.len() < w {
                return err_at!(InvalidFile, msg: "truncated attribute record");
            }
            let (field, rest) = buf.split_at(w);
            buf = rest;
            let value = match kind {
                FieldKind::Bool => Value::Bool(field[0] != 0),
                FieldKind::I32 => Value::I32(i32::from_le_bytes(field.try_into().unwrap())),
                FieldKind::I64 => Value::I64(i64::from_le_bytes(field.try_into().unwrap())),
                FieldKind::F32 => Value::F32(f32::from_le_bytes(field.try_into().unwrap())),
                FieldKind::Str(_) => {
                    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
                    let s = err_at!(FailConvert, std::str::from_utf8(&field[..end]))?;
                    Value::Str(s.to_string())
                }
            };
            values.push(value);
        }
        Ok(values)
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
