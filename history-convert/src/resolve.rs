//! Cycle resolver (§4.D) — the algorithmic heart of the conversion. Removes
//! cycles from a release's file-history DAG before the commits graph is
//! built, then iteratively splits tasks to eliminate any cycle the commits
//! graph still has.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::commits::{self, CommitsNode};
use crate::error::ConvertError;
use crate::graph::DiGraph;
use crate::hypergraph::Hypergraph;
use crate::model::{FileObject, ObjectId, ReleaseId, TaskId};

/// Makes a file-history DAG acyclic: while a cycle exists, the file with the
/// greatest `integrate_time` in the cycle (tie-break by version, then
/// identity) loses every outgoing edge that stays inside the cycle. Then every
/// transitively-implied edge is removed.
pub fn prepare_file_history(files: &mut DiGraph<ObjectId>, objects: &BTreeMap<ObjectId, FileObject>) {
    while let Some(cycle) = files.find_cycle() {
        let cycle_set: BTreeSet<&ObjectId> = cycle.iter().collect();
        let newest = cycle
            .iter()
            .max_by_key(|id| {
                let o = &objects[*id];
                (o.integrate_time, o.version, (*id).clone())
            })
            .expect("cycle is non-empty")
            .clone();

        let successors: Vec<ObjectId> = files.neighbors(&newest).cloned().collect();
        for succ in successors {
            if cycle_set.contains(&succ) {
                files.del_edge(&newest, &succ);
            }
        }
    }

    for (u, v) in files.transitive_edges() {
        files.del_edge(&u, &v);
    }
}

/// Builds the file-object-level graph used to find the "witness" cycle for a
/// commits-graph cycle: file-history edges restricted to the cycle's member
/// objects, plus a clique over each task's own files (modeling that a task's
/// files are committed atomically).
fn create_reduced_graph(
    files: &DiGraph<ObjectId>,
    tasks: &Hypergraph<ObjectId, TaskId>,
    cycle: &[CommitsNode],
) -> DiGraph<ObjectId> {
    let mut reduced = DiGraph::new();
    let mut task_members = Vec::new();

    for node in cycle {
        match node {
            CommitsNode::Task(t) => {
                let members: Vec<ObjectId> = tasks.links_of_edge(t).cloned().collect();
                for m in &members {
                    reduced.add_node(m.clone());
                }
                task_members.push(members);
            }
            CommitsNode::Object(o) => {
                reduced.add_node(o.clone());
            }
            CommitsNode::Release(_) => {}
        }
    }

    let reduced_nodes: Vec<ObjectId> = reduced.nodes().cloned().collect();
    for node in &reduced_nodes {
        for pred in files.incidents(node) {
            if reduced.has_node(pred) {
                reduced.add_edge(pred.clone(), node.clone());
            }
        }
    }

    for members in &task_members {
        for i in 0..members.len() {
            for j in 0..members.len() {
                if i != j {
                    reduced.add_edge(members[i].clone(), members[j].clone());
                }
            }
        }
    }

    reduced
}

/// Every non-trivial subset of `members` (excluding the empty set and the
/// full set), deduplicated so a subset and its complement are not both
/// returned — they describe the same cut. Enumeration is a plain binary
/// count over `members` in its given (sorted) order, so the result is
/// deterministic.
fn find_cuts(members: &[ObjectId]) -> Vec<Vec<ObjectId>> {
    let n = members.len();
    if n < 2 {
        return Vec::new();
    }
    let total = 1usize << n;
    let mut seen = vec![false; total];
    let mut cuts = Vec::new();
    for mask in 1..(total - 1) {
        if seen[mask] {
            continue;
        }
        let complement = (total - 1) ^ mask;
        seen[mask] = true;
        seen[complement] = true;
        cuts.push(
            (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| members[i].clone())
                .collect(),
        );
    }
    cuts
}

fn fresh_split_name(tasks: &Hypergraph<ObjectId, TaskId>, task: &TaskId) -> TaskId {
    let mut k = 1u32;
    loop {
        let candidate = TaskId::new(format!("{task}_{k}"));
        if !tasks.has_edge(&candidate) {
            return candidate;
        }
        k += 1;
    }
}

/// Resolves cycles in the commits graph built from `files`/`tasks`/`releases`
/// by splitting tasks, mutating `tasks` in place with every accepted split.
/// Returns the final, acyclic commits graph.
pub fn resolve_commits_cycles(
    files: &DiGraph<ObjectId>,
    tasks: &mut Hypergraph<ObjectId, TaskId>,
    releases: &Hypergraph<ObjectId, ReleaseId>,
    release_id: &ReleaseId,
) -> Result<DiGraph<CommitsNode>, ConvertError> {
    let mut commits = commits::build(files, tasks, releases);

    while let Some(cycle) = commits.find_cycle() {
        tracing::debug!(release = %release_id, cycle = ?cycle.iter().map(ToString::to_string).collect::<Vec<_>>(), "cycle found in commits graph");

        let reduced = create_reduced_graph(files, tasks, &cycle);
        let sccs = reduced.mutual_accessibility();
        let mut unique_sccs: Vec<Vec<ObjectId>> = sccs.into_values().collect();
        unique_sccs.sort();
        unique_sccs.dedup();
        let longest = unique_sccs
            .into_iter()
            .max_by_key(|scc| (scc.len(), scc.clone()))
            .unwrap_or_default();

        let mut candidate_cuts: Vec<(TaskId, Vec<ObjectId>)> = Vec::new();
        for i in 0..longest.len() {
            let n1 = &longest[i];
            let n2 = &longest[(i + 1) % longest.len()];
            let (t1, t2) = (tasks.links_of_node(n1).next(), tasks.links_of_node(n2).next());
            if let (Some(t1), Some(t2)) = (t1, t2) {
                if t1 == t2 {
                    let task = t1.clone();
                    let members: Vec<ObjectId> = tasks.links_of_edge(&task).cloned().collect();
                    for cut in find_cuts(&members) {
                        let in1 = cut.contains(n1);
                        let in2 = cut.contains(n2);
                        if in1 != in2 {
                            candidate_cuts.push((task.clone(), cut));
                        }
                    }
                }
            }
        }

        let mut resolved = false;
        for (task, cut) in &candidate_cuts {
            let new_task = fresh_split_name(tasks, task);
            tasks.add_edge(new_task.clone());
            for obj in cut {
                tasks.unlink(obj, task);
                tasks.link(obj.clone(), new_task.clone());
            }

            let commits2 = commits::build(files, tasks, releases);
            let cycle2 = commits2.find_cycle();
            let cycle_still_present = match &cycle2 {
                Some(c2) => {
                    let set2: BTreeSet<&CommitsNode> = c2.iter().collect();
                    cycle.iter().all(|n| set2.contains(n))
                }
                None => false,
            };

            if cycle_still_present {
                tasks.del_edge(&new_task);
                for obj in cut {
                    tasks.link(obj.clone(), task.clone());
                }
                tracing::debug!(release = %release_id, task = %task, "candidate cut did not remove the cycle, undone");
                continue;
            }

            tracing::debug!(release = %release_id, task = %task, split = %new_task, "cut accepted, task split");
            commits = commits2;
            resolved = true;
            break;
        }

        if !resolved {
            return Err(ConvertError::UnresolvableCycle {
                release: release_id.clone(),
                nodes: cycle.iter().map(ToString::to_string).collect(),
            });
        }
    }

    Ok(commits)
}
