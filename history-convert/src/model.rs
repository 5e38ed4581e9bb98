//! The data model the conversion core operates on: file objects, tasks, and
//! releases, along with the per-release graphs linking them. Everything is
//! keyed by opaque string identifiers rather than owning pointers, so the
//! graphs in [`crate::graph`] and [`crate::hypergraph`] can freely express
//! the many-to-many relationships between them without cyclic ownership.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConvertError;
use crate::graph::DiGraph;
use crate::hypergraph::Hypergraph;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub String);

        impl $name {
            #[inline]
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(ObjectId);
string_id!(TaskId);
string_id!(ReleaseId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    Dir,
    File,
}

/// The set of child names deleted in a directory object's version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirChanges {
    pub deleted: Vec<String>,
}

/// A single immutable versioned artifact from the source configuration
/// management system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileObject {
    pub object_name: ObjectId,
    pub name: String,
    pub kind: ObjectType,
    pub instance: String,
    /// Monotone version number within `(name, kind, instance)`, used to break
    /// ties when several versions share an `integrate_time`.
    pub version: u32,
    pub path: String,
    pub author: String,
    pub integrate_time: i64,
    pub dir_changes: Option<DirChanges>,
}

impl FileObject {
    /// The logical-file key used to collapse multiple versions of the same
    /// file within a task down to one (see `reduce_objects_for_commit`).
    pub(crate) fn logical_key(&self) -> (&str, ObjectType, &str) {
        (&self.name, self.kind, &self.instance)
    }
}

/// A value in a [`Task`]'s attribute bag: either a plain string, or a nested
/// bag (used only for `inspection_task`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Nested(BTreeMap<String, String>),
}

/// A set of file-object versions completed together, analogous to a
/// changeset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub object_name: TaskId,
    pub author: String,
    pub complete_time: i64,
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// A named snapshot in the release chain, with the graphs describing how its
/// window of history maps to commits.
#[derive(Clone, Debug)]
pub struct Release {
    pub name: ReleaseId,
    pub previous: Option<ReleaseId>,
    pub next: Option<ReleaseId>,
    pub created: i64,
    pub author: String,
    pub objects: BTreeMap<ObjectId, FileObject>,
    pub tasks: BTreeMap<TaskId, Task>,
    pub files_graph: DiGraph<ObjectId>,
    pub tasks_hypergraph: Hypergraph<ObjectId, TaskId>,
    pub releases_hypergraph: Hypergraph<ObjectId, ReleaseId>,
}

impl Release {
    pub fn object(&self, id: &ObjectId) -> Option<&FileObject> {
        self.objects.get(id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }
}

/// The full release chain handed to the converter: a singly-linked list of
/// [`Release`]s, each carrying its own window graphs.
#[derive(Clone, Debug, Default)]
pub struct History {
    pub releases: BTreeMap<ReleaseId, Release>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        History {
            releases: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, release: Release) {
        self.releases.insert(release.name.clone(), release);
    }

    /// The release with no `previous`, i.e. the start of the chain.
    pub fn initial_release(&self) -> Result<&Release, ConvertError> {
        let mut heads = self.releases.values().filter(|r| r.previous.is_none());
        let head = heads.next().ok_or(ConvertError::MalformedInput {
            detail: "no release chain head (every release has a previous)".into(),
        })?;
        if heads.next().is_some() {
            return Err(ConvertError::MalformedInput {
                detail: "more than one release chain head".into(),
            });
        }
        Ok(head)
    }

    /// Walks `previous`/`next` links starting at the head, checking the chain
    /// is a single acyclic sequence covering every release.
    pub fn ordered_releases(&self) -> Result<Vec<&Release>, ConvertError> {
        let mut order = Vec::with_capacity(self.releases.len());
        let mut current = Some(self.initial_release()?);
        let mut seen = std::collections::BTreeSet::new();
        while let Some(release) = current {
            if !seen.insert(release.name.clone()) {
                return Err(ConvertError::MalformedInput {
                    detail: format!("release chain revisits {}", release.name),
                });
            }
            order.push(release);
            current = match &release.next {
                Some(next_id) => Some(self.releases.get(next_id).ok_or_else(|| {
                    ConvertError::MalformedInput {
                        detail: format!("release {} has dangling next {}", release.name, next_id),
                    }
                })?),
                None => None,
            };
        }
        if order.len() != self.releases.len() {
            return Err(ConvertError::MalformedInput {
                detail: "release chain does not cover every release".into(),
            });
        }
        Ok(order)
    }
}

/// Supplies blob content for a file object. The conversion core treats
/// content as optional and orthogonal to graph conversion: a fetcher that
/// cannot find bytes for an object returns `Ok(None)`, which the formatter
/// renders as a markless blob (§ design notes).
pub trait ContentFetcher {
    fn fetch(&self, object: &FileObject) -> Result<Option<Vec<u8>>, ConvertError>;
}

/// A fetcher that never supplies content, for callers that only care about
/// the converted commit graph shape (e.g. tests).
pub struct NoContent;

impl ContentFetcher for NoContent {
    fn fetch(&self, _object: &FileObject) -> Result<Option<Vec<u8>>, ConvertError> {
        Ok(None)
    }
}
