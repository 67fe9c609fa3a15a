//! Fixed-width little-endian packing for the header, node records, and
//! edge records. Every record begins with `is_node: bool` then
//! `exists: bool` so a linear scanner can skip a record without decoding
//! the rest of it (spec §6).
//!
//! Slot index `0` doubles as the global sentinel's position and as the
//! "no link" marker for every `parent`/`left`/`right`/`out_edge_*`/
//! `in_edge_*` field: real node slots start at `R` (the sentinel occupies
//! `0..R`) and real edge slots start even further out, so `0` never
//! collides with a live position.

use crate::schema::{Schema, Value};
use crate::{err_at, Result};

pub const NIL: u64 = 0;
pub const MAGIC: &[u8; 8] = b"KNBK0001";
pub const FORMAT_VERSION: u32 = 1;

/// Fixed portion of a node record, not counting the `key` field (whose
/// width depends on `Layout::max_key_len`) or trailing attributes.
const NODE_FIXED_SIZE: usize = 1 + 1 + 4 + 8 + 8 + 8 + 8 + 8 + 8;
/// Fixed portion of an edge record, not counting trailing attributes.
const EDGE_FIXED_SIZE: usize = 1 + 1 + 1 + 8 + 8 + 8 + 4 + 8 + 8 + 8 + 8 + 8 + 8 + 8;

/// Static on-disk header. Everything after `table_size` exists so a
/// reopen can detect parameters that disagree with the caller's config
/// (spec §10.2) instead of silently misreading trailing attribute bytes.
#[derive(Clone, Debug)]
pub struct Header {
    pub n_nodes: u64,
    pub n_edges: u64,
    pub node_id: u64,
    pub next_table_position: u64,
    pub table_size: u64,
    pub class_length: u64,
    pub max_key_len: u16,
    pub max_str_len: u16,
    pub edge_record_size: u32,
    pub node_slots: u32,
    pub table_increment: u64,
    pub node_schema_fingerprint: u32,
    pub edge_schema_fingerprint: u32,
}

impl Header {
    pub const SIZE: usize = 8 + 4 + 8 * 6 + 2 + 2 + 4 + 4 + 8 + 4 + 4;

    pub fn encode(&self, out: &mut [u8]) {
        let mut off = 0;
        macro_rules! put {
            ($v:expr) => {{
                let bytes = $v.to_le_bytes();
                out[off..off + bytes.len()].copy_from_slice(&bytes);
                off += bytes.len();
            }};
        }
        out[off..off + 8].copy_from_slice(MAGIC);
        off += 8;
        put!(FORMAT_VERSION);
        put!(self.n_nodes);
        put!(self.n_edges);
        put!(self.node_id);
        put!(self.next_table_position);
        put!(self.table_size);
        put!(self.class_length);
        put!(self.max_key_len);
        put!(self.max_str_len);
        put!(self.edge_record_size);
        put!(self.node_slots);
        put!(self.table_increment);
        put!(self.node_schema_fingerprint);
        put!(self.edge_schema_fingerprint);
    }

    pub fn decode(buf: &[u8]) -> Result<Header> {
        if buf.len() < Header::SIZE {
            return err_at!(InvalidFile, msg: "truncated header");
        }
        if &buf[0..8] != MAGIC {
            return err_at!(InvalidFile, msg: "bad magic");
        }
        let mut off = 8;
        macro_rules! take {
            ($ty:ty) => {{
                const N: usize = std::mem::size_of::<$ty>();
                let v = <$ty>::from_le_bytes(buf[off..off + N].try_into().unwrap());
                off += N;
                v
            }};
        }
        let version: u32 = take!(u32);
        if version != FORMAT_VERSION {
            return err_at!(InvalidFile, msg: "unsupported format version {}", version);
        }
        Ok(Header {
            n_nodes: take!(u64),
            n_edges: take!(u64),
            node_id: take!(u64),
            next_table_position: take!(u64),
            table_size: take!(u64),
            class_length: take!(u64),
            max_key_len: take!(u16),
            max_str_len: take!(u16),
            edge_record_size: take!(u32),
            node_slots: take!(u32),
            table_increment: take!(u64),
            node_schema_fingerprint: take!(u32),
            edge_schema_fingerprint: take!(u32),
        })
    }
}

/// Derived sizing for node/edge records, fixed once at file-creation time
/// from `max_key_len` and the two attribute schemas.
#[derive(Clone, Debug)]
pub struct Layout {
    pub max_key_len: u16,
    pub edge_record_size: u32,
    pub node_slots: u32,
    pub node_schema: Schema,
    pub edge_schema: Schema,
}

impl Layout {
    pub fn new(max_key_len: u16, node_schema: Schema, edge_schema: Schema) -> Layout {
        let edge_record_size = (EDGE_FIXED_SIZE + edge_schema.width()) as u32;
        let node_size = NODE_FIXED_SIZE + max_key_len as usize + node_schema.width();
        let node_slots = ((node_size + edge_record_size as usize - 1)
            / edge_record_size as usize) as u32;
        Layout {
            max_key_len,
            edge_record_size,
            node_slots,
            node_schema,
            edge_schema,
        }
    }

    pub fn node_byte_size(&self) -> usize {
        self.node_slots as usize * self.edge_record_size as usize
    }
}

/// A node record, see spec §3. `position` is filled in on read; callers
/// must not rely on it before the record has been read from or written
/// to a slot.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    pub exists: bool,
    pub hash: u32,
    pub key: String,
    pub index: u64,
    pub position: u64,
    pub parent: u64,
    pub left: u64,
    pub right: u64,
    pub edge_start: u64,
    pub attrs: Vec<Value>,
}

impl NodeRecord {
    pub fn encode(&self, layout: &Layout, out: &mut [u8]) -> Result<()> {
        if self.key.len() > layout.max_key_len as usize {
            return err_at!(KeyTooLong, msg: "key {:?} exceeds max_key_len {}", self.key, layout.max_key_len);
        }
        let mut off = 0;
        out[off] = 1; // is_node
        off += 1;
        out[off] = self.exists as u8;
        off += 1;
        out[off..off + 4].copy_from_slice(&self.hash.to_le_bytes());
        off += 4;
        let klen = layout.max_key_len as usize;
        out[off..off + self.key.len()].copy_from_slice(self.key.as_bytes());
        for b in &mut out[off + self.key.len()..off + klen] {
            *b = 0;
        }
        off += klen;
        macro_rules! put {
            ($v:expr) => {{
                let bytes: [u8; 8] = $v.to_le_bytes();
                out[off..off + 8].copy_from_slice(&bytes);
                off += 8;
            }};
        }
        put!(self.index);
        put!(self.position);
        put!(self.parent);
        put!(self.left);
        put!(self.right);
        put!(self.edge_start);
        let mut attrs_buf = Vec::with_capacity(layout.node_schema.width());
        layout.node_schema.pack(&self.attrs, &mut attrs_buf)?;
        out[off..off + attrs_buf.len()].copy_from_slice(&attrs_buf);
        Ok(())
    }

    pub fn decode(layout: &Layout, buf: &[u8]) -> Result<NodeRecord> {
        let mut off = 1; // skip is_node, caller already checked it
        let exists = buf[off] != 0;
        off += 1;
        let hash = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        off += 4;
        let klen = layout.max_key_len as usize;
        let key_bytes = &buf[off..off + klen];
        let end = key_bytes.iter().position(|&b| b == 0).unwrap_or(klen);
        let key = err_at!(FailConvert, std::str::from_utf8(&key_bytes[..end]))?.to_string();
        off += klen;
        macro_rules! take {
            () => {{
                let v = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
                off += 8;
                v
            }};
        }
        let index = take!();
        let position = take!();
        let parent = take!();
        let left = take!();
        let right = take!();
        let edge_start = take!();
        let attrs = layout.node_schema.unpack(&buf[off..])?;
        Ok(NodeRecord {
            exists,
            hash,
            key,
            index,
            position,
            parent,
            left,
            right,
            edge_start,
            attrs,
        })
    }

    /// Fast-path prefix used by the hot tree-descent loop: only
    /// `(hash, left, right)`, skipping the key and attribute bytes.
    pub fn decode_tree_info(layout: &Layout, buf: &[u8]) -> (u32, u64, u64) {
        let hash = u32::from_le_bytes(buf[2..6].try_into().unwrap());
        let left_off = 6 + layout.max_key_len as usize + 24;
        let left = u64::from_le_bytes(buf[left_off..left_off + 8].try_into().unwrap());
        let right = u64::from_le_bytes(buf[left_off + 8..left_off + 16].try_into().unwrap());
        (hash, left, right)
    }
}

/// An edge record, see spec §3. Every edge participates in two trees at
/// once: the `out_edge_*` triple under its source's out-tree, and the
/// `in_edge_*` triple under its target's in-tree.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRecord {
    pub exists: bool,
    pub is_edge_start: bool,
    pub position: u64,
    pub source_position: u64,
    pub target_position: u64,
    pub hash: u32,
    pub edge_type: i64,
    pub out_edge_left: u64,
    pub out_edge_right: u64,
    pub out_edge_parent: u64,
    pub in_edge_left: u64,
    pub in_edge_right: u64,
    pub in_edge_parent: u64,
    pub attrs: Vec<Value>,
}

impl EdgeRecord {
    pub fn encode(&self, layout: &Layout, out: &mut [u8]) -> Result<()> {
        let mut off = 0;
        out[off] = 0; // is_node
        off += 1;
        out[off] = self.exists as u8;
        off += 1;
        out[off] = self.is_edge_start as u8;
        off += 1;
        macro_rules! put8 {
            ($v:expr) => {{
                let bytes: [u8; 8] = $v.to_le_bytes();
                out[off..off + 8].copy_from_slice(&bytes);
                off += 8;
            }};
        }
        put8!(self.position);
        put8!(self.source_position);
        put8!(self.target_position);
        out[off..off + 4].copy_from_slice(&self.hash.to_le_bytes());
        off += 4;
        put8!(self.edge_type);
        put8!(self.out_edge_left);
        put8!(self.out_edge_right);
        put8!(self.out_edge_parent);
        put8!(self.in_edge_left);
        put8!(self.in_edge_right);
        put8!(self.in_edge_parent);
        let mut attrs_buf = Vec::with_capacity(layout.edge_schema.width());
        layout.edge_schema.pack(&self.attrs, &mut attrs_buf)?;
        out[off..off + attrs_buf.len()].copy_from_slice(&attrs_buf);
        Ok(())
    }

    pub fn decode(layout: &Layout, buf: &[u8]) -> Result<EdgeRecord> {
        let mut off = 1; // skip is_node
        let exists = buf[off] != 0;
        off += 1;
        let is_edge_start = buf[off] != 0;
        off += 1;
        macro_rules! take8 {
            () => {{
                let v = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
                off += 8;
                v
            }};
        }
        let position = take8!();
        let source_position = take8!();
        let target_position = take8!();
        let hash = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
        off += 4;
        let edge_type = i64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
        off += 8;
        let out_edge_left = take8!();
        let out_edge_right = take8!();
        let out_edge_parent = take8!();
        let in_edge_left = take8!();
        let in_edge_right = take8!();
        let in_edge_parent = take8!();
        let attrs = layout.edge_schema.unpack(&buf[off..])?;
        Ok(EdgeRecord {
            exists,
            is_edge_start,
            position,
            source_position,
            target_position,
            hash,
            edge_type,
            out_edge_left,
            out_edge_right,
            out_edge_parent,
            in_edge_left,
            in_edge_right,
            in_edge_parent,
            attrs,
        })
    }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
