//! Kinbaku is an embedded, single-file, on-disk directed multigraph
//! storage engine. A graph is memory-mapped in place: nodes and edges
//! are fixed-width slots in one growable file, indexed by a global
//! node-BST and, per node, a pair of out-/in-edge BSTs (spec §3, §4).
//!
//! Mutations apply directly to the mapping; there is no write-ahead log
//! or background compaction. Concurrency is single-writer/many-reader,
//! enforced with an advisory file lock (spec §5).
//!
//! ```no_run
//! use kinbaku::{Config, Graph, ModeConfig};
//!
//! let mut config = Config::new("/tmp/example.kbk");
//! config.set_mode(ModeConfig::New);
//! let mut graph = Graph::open(config).unwrap();
//! graph.add_node("alice", vec![]).unwrap();
//! graph.add_node("bob", vec![]).unwrap();
//! graph.add_edge("alice", "bob", 0, vec![]).unwrap();
//! assert_eq!(graph.neighbors("alice").unwrap(), vec!["bob".to_string()]);
//! ```

mod alloc;
mod cache;
mod codec;
mod config;
mod error;
mod file;
mod graph;
mod hash;
mod schema;
mod tree;

pub use crate::config::{Config, ModeConfig};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::file::Mode;
pub use crate::graph::{Edge, Graph, Node, DEFAULT_EDGE_TYPE};
pub use crate::schema::{FieldKind, Schema, Value};
