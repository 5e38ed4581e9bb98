use thiserror::Error;

/// A violation of the fast-import stream grammar, caught while constructing a
/// record rather than left to the importer to reject.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("commit declares merge parents but no `from` parent")]
    MergeWithoutFrom,
}
