//! Task sanitizer (§4.B): extracts file objects shared by more than one task
//! into synthetic "common" tasks, so that the task hypergraph's invariant —
//! every linked file object belongs to exactly one task — holds before the
//! commits graph is built.

use crate::hypergraph::Hypergraph;
use crate::model::{ObjectId, TaskId};

/// Sanitizes `tasks` in place. For every unordered pair of tasks whose object
/// sets intersect, the shared objects are moved to a new `common-<t1>-<t2>`
/// task (`t1`, `t2` taken in sorted order so the name is deterministic).
///
/// An object shared by more than two tasks (a triple overlap) is unlinked
/// from *every* task it currently belongs to, not just the pair being
/// processed, so it lands in a single synthetic task rather than splitting
/// across several pairwise commons — the source's snapshot-then-mutate
/// version processes all pairs against the pre-sanitization link sets and
/// leaves such an object in more than one common-* task, which violates the
/// "every file object belongs to exactly one task" invariant this pass
/// exists to establish.
pub fn sanitize_tasks(tasks: &mut Hypergraph<ObjectId, TaskId>) {
    let task_ids: Vec<TaskId> = tasks.edges().cloned().collect();

    for i in 0..task_ids.len() {
        for j in (i + 1)..task_ids.len() {
            let (t1, t2) = (&task_ids[i], &task_ids[j]);
            let objs1: Vec<ObjectId> = tasks.links_of_edge(t1).cloned().collect();
            let shared: Vec<ObjectId> = objs1
                .into_iter()
                .filter(|o| tasks.links_of_edge(t2).any(|o2| o2 == o))
                .collect();
            if shared.is_empty() {
                continue;
            }

            let common = TaskId::new(format!("common-{t1}-{t2}"));
            tasks.add_edge(common.clone());
            for obj in shared {
                let current: Vec<TaskId> = tasks.links_of_node(&obj).cloned().collect();
                for t in current {
                    tasks.unlink(&obj, &t);
                }
                tasks.link(obj, common.clone());
            }
        }
    }
}
