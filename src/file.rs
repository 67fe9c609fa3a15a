//! Memory-mapped backing file: growth, remap-on-grow, short-read retry,
//! and the advisory exclusive/shared lock that enforces the single-writer
//! rule (spec §5, §10.3).

use fs2::FileExt;
use memmap2::{Mmap, MmapMut};

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::codec::{EdgeRecord, Header, Layout, NodeRecord, MAGIC};
use crate::schema::Schema;
use crate::{err_at, Result};

/// Sentinel hash stamped on the immovable node at slot 0. Chosen outside
/// the 32-bit hash's natural range of comparison against any hash a real
/// key could fold to, so the sentinel never compares equal to a real node.
pub const SENTINEL_HASH: u32 = 1 << 31;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    New,
    ReadWrite,
    ReadOnly,
}

enum Mapping {
    Mut(MmapMut),
    Ro(Mmap),
}

impl Mapping {
    fn as_slice(&self) -> &[u8] {
        match self {
            Mapping::Mut(m) => &m[..],
            Mapping::Ro(m) => &m[..],
        }
    }

    fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        match self {
            Mapping::Mut(m) => Ok(&mut m[..]),
            Mapping::Ro(_) => err_at!(InvalidInput, msg: "file opened read-only"),
        }
    }
}

/// Open, growable, memory-mapped slot table backing a [crate::graph::Graph].
pub struct GraphFile {
    file: File,
    mapping: Mapping,
    mode: Mode,
    pub header: Header,
    pub layout: Layout,
}

impl GraphFile {
    /// Create a brand new file, writing the header and the sentinel slot
    /// (slot `0`), then one `table_increment` worth of zeroed slots.
    pub fn create<P: AsRef<Path>>(
        path: P,
        max_key_len: u16,
        max_str_len: u16,
        table_increment: u64,
        node_schema: Schema,
        edge_schema: Schema,
    ) -> Result<GraphFile> {
        let layout = Layout::new(max_key_len, node_schema, edge_schema);
        let header = Header {
            n_nodes: 1, // the sentinel itself
            n_edges: 0,
            node_id: 0,
            next_table_position: layout.node_slots as u64,
            table_size: table_increment,
            class_length: 0,
            max_key_len,
            max_str_len,
            edge_record_size: layout.edge_record_size,
            node_slots: layout.node_slots,
            table_increment,
            node_schema_fingerprint: layout.node_schema.fingerprint(),
            edge_schema_fingerprint: layout.edge_schema.fingerprint(),
        };

        let file = err_at!(
            IOError,
            OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(path.as_ref())
        )?;
        err_at!(Locked, file.lock_exclusive())?;

        let body_len = header.table_size as usize * layout.edge_record_size as usize;
        let total = Header::SIZE + body_len;
        err_at!(IOError, file.set_len(total as u64))?;

        let mut mmap = err_at!(IOError, unsafe { MmapMut::map_mut(&file) })?;
        header.encode(&mut mmap[..Header::SIZE]);

        let sentinel = NodeRecord {
            exists: true,
            hash: SENTINEL_HASH,
            key: String::new(),
            index: 0,
            position: 0,
            parent: 0,
            left: 0,
            right: 0,
            edge_start: 0,
            attrs: vec![],
        };
        let sentinel_off = Header::SIZE;
        sentinel.encode(&layout, &mut mmap[sentinel_off..sentinel_off + layout.node_byte_size()])?;

        log::info!("kinbaku: created {:?}, {} slots", path.as_ref(), header.table_size);

        Ok(GraphFile {
            file,
            mapping: Mapping::Mut(mmap),
            mode: Mode::New,
            header,
            layout,
        })
    }

    /// Open an existing file. `node_schema`/`edge_schema` must match the
    /// ones the file was created with; a disagreeing fingerprint fails
    /// fast with [crate::ErrorKind::SchemaMismatch] rather than silently
    /// misinterpreting trailing attribute bytes.
    pub fn open<P: AsRef<Path>>(
        path: P,
        mode: Mode,
        node_schema: Schema,
        edge_schema: Schema,
    ) -> Result<GraphFile> {
        if mode == Mode::New {
            return err_at!(InvalidInput, msg: "use GraphFile::create for Mode::New");
        }
        let file = err_at!(
            IOError,
            OpenOptions::new()
                .read(true)
                .write(mode == Mode::ReadWrite)
                .open(path.as_ref())
        )?;
        match mode {
            Mode::ReadWrite => err_at!(Locked, file.lock_exclusive())?,
            Mode::ReadOnly => err_at!(Locked, file.lock_shared())?,
            Mode::New => unreachable!(),
        }

        let mapping = match mode {
            Mode::ReadWrite => Mapping::Mut(err_at!(IOError, unsafe { MmapMut::map_mut(&file) })?),
            Mode::ReadOnly => Mapping::Ro(err_at!(IOError, unsafe { Mmap::map(&file) })?),
            Mode::New => unreachable!(),
        };

        let header = Header::decode(&mapping.as_slice()[..Header::SIZE])?;
        let layout = Layout::new(header.max_key_len, node_schema, edge_schema);

        if layout.node_schema.fingerprint() != header.node_schema_fingerprint
            || layout.edge_schema.fingerprint() != header.edge_schema_fingerprint
        {
            return err_at!(SchemaMismatch, msg: "attribute schema does not match {:?}", path.as_ref());
        }
        if layout.edge_record_size != header.edge_record_size || layout.node_slots != header.node_slots {
            return err_at!(SchemaMismatch, msg: "record layout does not match {:?}", path.as_ref());
        }

        log::info!("kinbaku: opened {:?} ({:?}), {} nodes, {} edges", path.as_ref(), mode, header.n_nodes, header.n_edges);

        Ok(GraphFile {
            file,
            mapping,
            mode,
            header,
            layout,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn body_len(&self) -> usize {
        self.header.table_size as usize * self.layout.edge_record_size as usize
    }

    /// Append `table_increment` more slots and remap. Triggered by the
    /// allocator once `next_table_position` runs within 10% of
    /// `table_size` (spec §4.1).
    pub fn grow(&mut self) -> Result<()> {
        let add_slots = self.header.table_increment;
        let add_bytes = add_slots as usize * self.layout.edge_record_size as usize;
        let new_total = Header::SIZE + self.body_len() + add_bytes;
        err_at!(IOError, self.file.set_len(new_total as u64))?;
        self.header.table_size += add_slots;
        self.remap()?;
        self.sync_header()?;
        log::info!("kinbaku: grew table to {} slots", self.header.table_size);
        Ok(())
    }

    fn remap(&mut self) -> Result<()> {
        self.mapping = match self.mode {
            Mode::ReadWrite | Mode::New => {
                Mapping::Mut(err_at!(IOError, unsafe { MmapMut::map_mut(&self.file) })?)
            }
            Mode::ReadOnly => Mapping::Ro(err_at!(IOError, unsafe { Mmap::map(&self.file) })?),
        };
        Ok(())
    }

    pub fn should_grow(&self) -> bool {
        let headroom = self.header.table_increment / 10;
        self.header.next_table_position + headroom > self.header.table_size
    }

    pub fn sync_header(&mut self) -> Result<()> {
        let header = self.header.clone();
        let buf = self.mapping.as_mut_slice()?;
        header.encode(&mut buf[..Header::SIZE]);
        Ok(())
    }

    fn slot_offset(&self, pos: u64) -> usize {
        Header::SIZE + pos as usize * self.layout.edge_record_size as usize
    }

    /// Read `len` bytes at slot `pos`, retrying once after a remap if the
    /// current mapping turns out to be shorter than expected (another
    /// writer grew the file underneath us — spec §5).
    fn read_bytes(&mut self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let off = self.slot_offset(pos);
        if off + len > self.mapping.as_slice().len() {
            self.remap()?;
        }
        let buf = self.mapping.as_slice();
        if off + len > buf.len() {
            return err_at!(InvalidInput, msg: "slot {} out of range", pos);
        }
        Ok(buf[off..off + len].to_vec())
    }

    /// Peek the two leading bytes of a slot (`is_node`, `exists`) without
    /// decoding the rest of the record — the scanner fast-skip from §6.
    pub fn read_kind(&mut self, pos: u64) -> Result<(bool, bool)> {
        let buf = self.read_bytes(pos, 2)?;
        Ok((buf[0] != 0, buf[1] != 0))
    }

    pub fn read_node(&mut self, pos: u64) -> Result<NodeRecord> {
        let len = self.layout.node_byte_size();
        let buf = self.read_bytes(pos, len)?;
        NodeRecord::decode(&self.layout, &buf)
    }

    pub fn read_node_tree_info(&mut self, pos: u64) -> Result<(u32, u64, u64)> {
        let len = self.layout.node_byte_size();
        let buf = self.read_bytes(pos, len)?;
        Ok(NodeRecord::decode_tree_info(&self.layout, &buf))
    }

    pub fn write_node(&mut self, pos: u64, node: &NodeRecord) -> Result<()> {
        let off = self.slot_offset(pos);
        let len = self.layout.node_byte_size();
        let layout = self.layout.clone();
        let buf = self.mapping.as_mut_slice()?;
        node.encode(&layout, &mut buf[off..off + len])
    }

    pub fn erase_node(&mut self, pos: u64) -> Result<()> {
        let off = self.slot_offset(pos);
        let len = self.layout.node_byte_size();
        let buf = self.mapping.as_mut_slice()?;
        for b in &mut buf[off..off + len] {
            *b = 0;
        }
        buf[off] = 1; // is_node, exists already zero (false)
        Ok(())
    }

    pub fn read_edge(&mut self, pos: u64) -> Result<EdgeRecord> {
        let len = self.layout.edge_record_size as usize;
        let buf = self.read_bytes(pos, len)?;
        EdgeRecord::decode(&self.layout, &buf)
    }

    pub fn write_edge(&mut self, pos: u64, edge: &EdgeRecord) -> Result<()> {
        let off = self.slot_offset(pos);
        let len = self.layout.edge_record_size as usize;
        let layout = self.layout.clone();
        let buf = self.mapping.as_mut_slice()?;
        edge.encode(&layout, &mut buf[off..off + len])
    }

    pub fn erase_edge(&mut self, pos: u64) -> Result<()> {
        let off = self.slot_offset(pos);
        let len = self.layout.edge_record_size as usize;
        let buf = self.mapping.as_mut_slice()?;
        for b in &mut buf[off..off + len] {
            *b = 0;
        }
        // is_node stays 0, exists stays 0: a tombstoned edge slot.
        Ok(())
    }

    /// Total number of slots the table currently has room for.
    pub fn table_size(&self) -> u64 {
        self.header.table_size
    }
}

impl Drop for GraphFile {
    fn drop(&mut self) {
        if self.mode != Mode::ReadOnly {
            let _ = self.sync_header();
            if let Mapping::Mut(m) = &self.mapping {
                let _ = m.flush();
            }
        }
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
