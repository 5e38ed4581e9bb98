use thiserror::Error;

use crate::model::{ObjectId, ReleaseId, TaskId};

/// An error fatal to the whole conversion: there is no partial success, and
/// no retry inside the core (only the bounded internal recoveries documented
/// per variant below).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The release chain, a file-history edge, or a hypergraph link pointed
    /// somewhere that does not exist, or a file object was reachable from no
    /// task and no release boundary.
    #[error("malformed input: {detail}")]
    MalformedInput { detail: String },

    /// The cycle resolver exhausted every candidate cut for a cycle in the
    /// commits graph without finding one that removes it.
    #[error("could not resolve cycle in release {release} involving {nodes:?}")]
    UnresolvableCycle {
        release: ReleaseId,
        nodes: Vec<String>,
    },

    /// The caller's content fetcher failed for an object (as opposed to
    /// legitimately having no content, which is `Ok(None)`).
    #[error("failed to fetch content for object {object}: {detail}")]
    MissingContent { object: ObjectId, detail: String },

    /// The emitter tried to reference a parent mark that was never assigned,
    /// which should be unreachable given an acyclic commits graph — surfaced
    /// rather than panicking so a caller sees the failing node.
    #[error("commit for {node} in release {release} has no mark for parent {parent}")]
    FormatterViolation {
        release: ReleaseId,
        node: String,
        parent: String,
    },

    /// A task referenced by a commits-graph node does not exist in the
    /// release it was built for.
    #[error("release {release} has no task named {task}")]
    UnknownTask { release: ReleaseId, task: TaskId },

    #[error(transparent)]
    Build(#[from] fast_import_stream::BuildError),

    #[error("io error writing fast-import stream: {0}")]
    Io(#[from] std::io::Error),
}
