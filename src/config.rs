//! Graph configuration, following the teacher's builder pattern
//! (`Config::new(..)` plus chainable `set_*` methods, see
//! `robt::config::Config`).

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::file::Mode;
use crate::schema::Schema;

/// Default width, in bytes, of a node key.
pub const MAX_KEY_LEN: u16 = 15;
/// Default width, in bytes, of a fixed-length string attribute.
pub const MAX_STR_LEN: u16 = 15;
/// Default number of entries held in each of `GraphCache`'s caches.
pub const CACHE_LEN: usize = 10_000;
/// Default number of slots appended to the file on each growth.
pub const TABLE_INCREMENT: u64 = 100_000;

/// Configuration for opening or creating a [crate::graph::Graph].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub path: PathBuf,
    pub max_key_len: u16,
    pub max_str_len: u16,
    pub cache_len: usize,
    pub table_increment: u64,
    pub preload: bool,
    #[serde(skip)]
    pub mode: ModeConfig,
    #[serde(skip)]
    pub node_schema: Schema,
    #[serde(skip)]
    pub edge_schema: Schema,
}

/// Serde-free mirror of [Mode]; `Config` itself is `Serialize` so it can
/// round-trip through `toml` (see `util::files::load_toml`), but open
/// mode and the attribute schemas are call-site decisions, not
/// externalized database parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModeConfig {
    New,
    ReadWrite,
    ReadOnly,
}

impl Default for ModeConfig {
    fn default() -> ModeConfig {
        ModeConfig::ReadWrite
    }
}

impl From<ModeConfig> for Mode {
    fn from(m: ModeConfig) -> Mode {
        match m {
            ModeConfig::New => Mode::New,
            ModeConfig::ReadWrite => Mode::ReadWrite,
            ModeConfig::ReadOnly => Mode::ReadOnly,
        }
    }
}

impl Config {
    /// Create a new configuration value with the same defaults as the
    /// reference implementation (`max_str_len=15`, `max_key_len=15`,
    /// `table_increment=100_000`, `preload=false`); use the `set_*`
    /// methods to add more configuration.
    pub fn new<P: AsRef<Path>>(path: P) -> Config {
        Config {
            path: path.as_ref().to_path_buf(),
            max_key_len: MAX_KEY_LEN,
            max_str_len: MAX_STR_LEN,
            cache_len: CACHE_LEN,
            table_increment: TABLE_INCREMENT,
            preload: false,
            mode: ModeConfig::ReadWrite,
            node_schema: Schema::new(),
            edge_schema: Schema::new(),
        }
    }

    pub fn set_max_key_len(&mut self, n: u16) -> &mut Self {
        self.max_key_len = n;
        self
    }

    pub fn set_max_str_len(&mut self, n: u16) -> &mut Self {
        self.max_str_len = n;
        self
    }

    pub fn set_cache_len(&mut self, n: usize) -> &mut Self {
        self.cache_len = n;
        self
    }

    pub fn set_table_increment(&mut self, n: u64) -> &mut Self {
        self.table_increment = n;
        self
    }

    pub fn set_preload(&mut self, preload: bool) -> &mut Self {
        self.preload = preload;
        self
    }

    pub fn set_mode(&mut self, mode: ModeConfig) -> &mut Self {
        self.mode = mode;
        self
    }

    pub fn set_node_schema(&mut self, schema: Schema) -> &mut Self {
        self.node_schema = schema;
        self
    }

    pub fn set_edge_schema(&mut self, schema: Schema) -> &mut Self {
        self.edge_schema = schema;
        self
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
