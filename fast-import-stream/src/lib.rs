// Copyright (C) contributors to this repository. All rights reserved.
//
// Distributed under the GPL 2.0 with a linking exception. For the full terms,
// see the included COPYING file.

//! Library for constructing `git fast-import`–format streams, to materialize
//! converted history as a repository.
//!
//! This crate only writes streams; it has no notion of tasks, releases, or
//! file-history graphs. Those live in the crate that drives this one.

pub mod ast;
mod dump;
mod error;

pub use ast::{Blob, Commit, FileMode, FileOp, Mark, MarkAllocator, PersonIdent, Record, Reset};
pub use dump::{dump_stream, Dump};
pub use error::BuildError;
