use std::num::NonZeroU64;

use bstr::BString;

use crate::error::BuildError;

/// A reference to an object by an integer, which allows the writer to recall
/// it later without knowing its hash. The value `:0` is reserved and cannot be
/// used as a mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Mark(NonZeroU64);

impl Mark {
    #[inline]
    pub fn new(mark: u64) -> Option<Mark> {
        NonZeroU64::new(mark).map(Mark)
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// A monotonically increasing mark allocator, starting at 1 (mark `:0` is
/// reserved by the format and never issued).
#[derive(Clone, Debug, Default)]
pub struct MarkAllocator {
    next: u64,
}

impl MarkAllocator {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        MarkAllocator { next: 0 }
    }

    /// Allocates and returns a fresh mark.
    pub fn next_mark(&mut self) -> Mark {
        self.next += 1;
        Mark::new(self.next).expect("counter starts above zero")
    }
}

/// An identity, as it appears in an `author`/`committer` line: a display name,
/// an email address, and a timestamp with a fixed `+0000` offset (the source
/// data carries no timezone information).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonIdent {
    pub name: BString,
    pub email: BString,
    pub when_unix: i64,
}

impl PersonIdent {
    #[inline]
    pub fn new(name: impl Into<BString>, email: impl Into<BString>, when_unix: i64) -> Self {
        PersonIdent {
            name: name.into(),
            email: email.into(),
            when_unix,
        }
    }
}

/// A `blob` command: an anonymous object referred to only by mark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub mark: Mark,
    /// Blob content, when the caller's content fetcher could supply it.
    /// Absent content degrades to a markless-data blob with no `data`
    /// section, matching the source's behavior with content plumbing
    /// disabled.
    pub data: Option<Vec<u8>>,
}

impl Blob {
    #[inline]
    pub fn new(mark: Mark) -> Self {
        Blob { mark, data: None }
    }

    #[inline]
    #[must_use]
    pub fn with_data(mark: Mark, data: Vec<u8>) -> Self {
        Blob {
            mark,
            data: Some(data),
        }
    }
}

/// A single entry in a commit's file-change list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOp {
    /// `M <mode> :<mark> <path>` — add or modify a file to point at `mark`.
    Modify {
        mode: FileMode,
        mark: Mark,
        path: BString,
    },
    /// `D <path>` — remove a path.
    Delete { path: BString },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileMode {
    Regular,
}

impl FileMode {
    #[inline]
    #[must_use]
    pub fn as_octal(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
        }
    }
}

/// A `commit` command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub branch: BString,
    pub mark: Mark,
    pub author: PersonIdent,
    pub committer: PersonIdent,
    pub message: Vec<u8>,
    pub from: Option<Mark>,
    pub merge: Vec<Mark>,
    pub file_ops: Vec<FileOp>,
}

impl Commit {
    /// Validates that a commit which declares merge parents also declares a
    /// `from` parent, since `merge` without `from` is meaningless in the
    /// fast-import grammar.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.from.is_none() && !self.merge.is_empty() {
            return Err(BuildError::MergeWithoutFrom);
        }
        Ok(())
    }
}

/// A `reset` command, used once at the end of the stream to point
/// `refs/heads/master` at the final commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reset {
    pub ref_name: BString,
    pub from: Option<Mark>,
}

/// Any top-level record in a fast-import stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Blob(Blob),
    Commit(Commit),
    Reset(Reset),
}

impl From<Blob> for Record {
    #[inline]
    fn from(b: Blob) -> Self {
        Record::Blob(b)
    }
}

impl From<Commit> for Record {
    #[inline]
    fn from(c: Commit) -> Self {
        Record::Commit(c)
    }
}

impl From<Reset> for Record {
    #[inline]
    fn from(r: Reset) -> Self {
        Record::Reset(r)
    }
}
