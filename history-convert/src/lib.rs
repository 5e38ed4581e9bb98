//! Converts a legacy task/release configuration-management history into a
//! `git fast-import` stream, reconstructing it as a sequence of commits
//! tagged by release with merges where branching occurred.
//!
//! The entry point is [`convert`]: given a [`History`] (the release chain,
//! each carrying its own file-history DAG, task hypergraph, and release
//! hypergraph) and a [`ContentFetcher`] for blob bytes, it writes a complete
//! stream to any [`std::io::Write`] sink.
//!
//! The conversion pipeline, leaves first:
//! - [`graph`] / [`hypergraph`] — directed-graph and hypergraph primitives
//!   (cycle detection, transitive reduction, strongly-connected components).
//! - [`sanitize`] — extracts file objects shared by multiple tasks into
//!   synthetic `common-<t1>-<t2>` tasks.
//! - [`commits`] — builds the commits graph from a release window's files,
//!   tasks, and release boundaries.
//! - [`resolve`] — detects and resolves cycles, in the file-history DAG
//!   before the commits graph is built, and by iteratively splitting tasks
//!   afterward.
//! - [`emit`] — walks the resolved commits graph in dependency order per
//!   release and drives [`format`] and [`fast_import_stream`] to produce the
//!   final record stream.

pub mod commits;
mod emit;
mod error;
pub mod format;
pub mod graph;
pub mod hypergraph;
pub mod model;
pub mod resolve;
pub mod sanitize;

pub use emit::convert;
pub use error::ConvertError;
pub use model::{
    AttributeValue, ContentFetcher, DirChanges, FileObject, History, NoContent, ObjectId, ObjectType, Release, ReleaseId, Task,
    TaskId,
};
