//! Commits-graph builder (§4.C): assembles the graph whose nodes are tasks
//! and releases (plus, per the record formatter's "object not associated to
//! task" case in §4.F, any release-boundary file object that belongs to no
//! task at all) and whose edges encode emission order.

use crate::graph::DiGraph;
use crate::hypergraph::Hypergraph;
use crate::model::{ObjectId, ReleaseId, TaskId};

/// A node of the commits graph: either a task commit, a release tag, or a
/// lone file object carried over without being grouped into any task. The
/// derived `Ord` gives a deterministic total order (variant, then identity)
/// that the cycle resolver and emitter rely on for reproducible output.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommitsNode {
    Task(TaskId),
    Object(ObjectId),
    Release(ReleaseId),
}

impl std::fmt::Display for CommitsNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitsNode::Task(t) => write!(f, "task:{t}"),
            CommitsNode::Object(o) => write!(f, "object:{o}"),
            CommitsNode::Release(r) => write!(f, "release:{r}"),
        }
    }
}

/// Builds the commits graph from a release window's files/tasks/releases
/// graphs. Pure: does not mutate any input.
///
/// Nodes are exactly the task and release identities (the source's
/// `create_commits_graph`: `commits.add_node(task)`/`commits.add_node(release)`
/// for every hyperedge, nothing else). A third kind — [`CommitsNode::Object`]
/// — is admitted only where the source's task-to-task pass would otherwise
/// index `tasks.links(obj2)[0]` on an object linked to no task and crash: a
/// file-history successor of a task's object that itself belongs to no task
/// is promoted into its own "object not associated to task" commit instead
/// (§4.F) rather than being silently dropped or panicking. A release's own
/// boundary objects that are simply never revisited by any task in this
/// window (the common case for the window's starting release) are not given
/// nodes at all — they are already represented in an ancestor commit's tree.
pub fn build(
    files: &DiGraph<ObjectId>,
    tasks: &Hypergraph<ObjectId, TaskId>,
    releases: &Hypergraph<ObjectId, ReleaseId>,
) -> DiGraph<CommitsNode> {
    let mut commits = DiGraph::new();

    // A task left with no members (every one of them moved to a common-*
    // task during sanitizing, or a split left the original task empty) is
    // not a commit at all and gets no node.
    for task in tasks.edges() {
        if tasks.links_of_edge(task).next().is_some() {
            commits.add_node(CommitsNode::Task(task.clone()));
        }
    }
    for release in releases.edges() {
        commits.add_node(CommitsNode::Release(release.clone()));
    }

    // Task -> task/object edges, from file-history edges whose source object
    // belongs to a task. `obj1` with no task at all belongs to the window's
    // starting release and contributes no edge (mirrors the source's
    // `if not tasks.has_node(obj1): continue`).
    let mut object_nodes: std::collections::BTreeSet<ObjectId> = std::collections::BTreeSet::new();
    for obj1 in files.nodes() {
        let Some(task1) = tasks.links_of_node(obj1).next() else {
            continue;
        };
        for obj2 in files.neighbors(obj1) {
            let target = match tasks.links_of_node(obj2).next() {
                Some(task2) if task2 == task1 => continue,
                Some(task2) => CommitsNode::Task(task2.clone()),
                None => {
                    object_nodes.insert(obj2.clone());
                    commits.add_node(CommitsNode::Object(obj2.clone()));
                    CommitsNode::Object(obj2.clone())
                }
            };
            commits.add_edge(CommitsNode::Task(task1.clone()), target);
        }
    }

    // Resolves an object to the commits-graph node it already participates
    // in, if any: the task it belongs to, or an object-only node admitted
    // above. An object that is neither is not part of this window's commits
    // graph at all.
    let node_of = |o: &ObjectId| -> Option<CommitsNode> {
        if let Some(task) = tasks.links_of_node(o).next() {
            Some(CommitsNode::Task(task.clone()))
        } else if object_nodes.contains(o) {
            Some(CommitsNode::Object(o.clone()))
        } else {
            None
        }
    };

    // Task/object -> release closing edges: a commit contributes a file
    // present at the release boundary.
    for release in releases.edges() {
        for obj in releases.links_of_edge(release) {
            if let Some(n) = node_of(obj) {
                commits.add_edge(n, CommitsNode::Release(release.clone()));
            }
        }
    }

    // Release -> task/object opening edges: a boundary object has a
    // file-history successor inside this commit.
    for release in releases.edges() {
        for obj in releases.links_of_edge(release) {
            for succ in files.neighbors(obj) {
                if let Some(n) = node_of(succ) {
                    commits.add_edge(CommitsNode::Release(release.clone()), n);
                }
            }
        }
    }

    commits
}
