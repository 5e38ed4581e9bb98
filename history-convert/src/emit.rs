//! Topological emitter (§4.E): walks each release's resolved commits graph in
//! dependency order and drives [`fast_import_stream`] to produce blob and
//! commit records, chaining releases together via a per-release merge commit
//! and a final `reset refs/heads/master`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::Write;

use fast_import_stream::{dump_stream, Blob, Mark, MarkAllocator, Record, Reset};

use crate::commits::CommitsNode;
use crate::error::ConvertError;
use crate::format;
use crate::model::{ContentFetcher, FileObject, History, ObjectId, ObjectType, Release};
use crate::sanitize::sanitize_tasks;

/// Owns the two pieces of state the emitter accumulates across the whole
/// conversion: the mark allocator and the lookup from commits-graph node (or
/// blobbed object) to the mark that was assigned to it. Exclusively owned by
/// [`convert`] — see the crate's concurrency notes.
#[derive(Default)]
struct MarkTable {
    marks: MarkAllocator,
    commit_lookup: BTreeMap<CommitsNode, Mark>,
    blob_marks: BTreeMap<ObjectId, Mark>,
}

/// Converts `history` into a fast-import stream written to `out`, using
/// `content` to resolve file-object bytes for blobs.
pub fn convert<W: Write>(history: &History, content: &dyn ContentFetcher, out: &mut W) -> Result<(), ConvertError> {
    let ordered = history.ordered_releases()?;
    let mut table = MarkTable::default();

    let initial = *ordered.first().ok_or_else(|| ConvertError::MalformedInput {
        detail: "history contains no releases".into(),
    })?;
    let span = tracing::info_span!("convert_release", release = %initial.name);
    let _enter = span.enter();
    emit_initial_release(initial, content, &mut table, out)?;
    drop(_enter);

    for release in &ordered[1..] {
        let span = tracing::info_span!("convert_release", release = %release.name);
        let _enter = span.enter();
        emit_release(release, content, &mut table, out)?;
    }

    let last = ordered.last().expect("checked non-empty above");
    let last_mark = *table
        .commit_lookup
        .get(&CommitsNode::Release(last.name.clone()))
        .ok_or_else(|| ConvertError::FormatterViolation {
            release: last.name.clone(),
            node: format!("release:{}", last.name),
            parent: "<final release merge>".into(),
        })?;
    dump_stream(
        &[Record::Reset(Reset {
            ref_name: "refs/heads/master".into(),
            from: Some(last_mark),
        })],
        out,
    )?;
    Ok(())
}

fn ensure_blob(
    table: &mut MarkTable,
    object: &FileObject,
    content: &dyn ContentFetcher,
    out: &mut impl Write,
) -> Result<(), ConvertError> {
    if object.kind != ObjectType::File || table.blob_marks.contains_key(&object.object_name) {
        return Ok(());
    }
    let data = content.fetch(object)?;
    let mark = table.marks.next_mark();
    let blob = if let Some(bytes) = data {
        Blob::with_data(mark, bytes)
    } else {
        Blob::new(mark)
    };
    dump_stream(&[Record::Blob(blob)], out)?;
    table.blob_marks.insert(object.object_name.clone(), mark);
    Ok(())
}

fn ensure_blobs<'a>(
    table: &mut MarkTable,
    objects: impl IntoIterator<Item = &'a FileObject>,
    content: &dyn ContentFetcher,
    out: &mut impl Write,
) -> Result<(), ConvertError> {
    for object in objects {
        ensure_blob(table, object, content, out)?;
    }
    Ok(())
}

fn emit_initial_release<W: Write>(
    release: &Release,
    content: &dyn ContentFetcher,
    table: &mut MarkTable,
    out: &mut W,
) -> Result<(), ConvertError> {
    let mut objects: Vec<&FileObject> = release.objects.values().filter(|o| o.kind == ObjectType::File).collect();
    objects.sort_by(|a, b| a.object_name.cmp(&b.object_name));
    ensure_blobs(table, objects.iter().copied(), content, out)?;

    let mark = table.marks.next_mark();
    let commit = format::build_initial_commit(release, mark, |o| table.blob_marks.get(o).copied());
    dump_stream(&[Record::Commit(commit)], out)?;
    table.commit_lookup.insert(CommitsNode::Release(release.name.clone()), mark);
    tracing::trace!(mark = mark.get(), "emitted initial commit");
    Ok(())
}

fn emit_release<W: Write>(
    release: &Release,
    content: &dyn ContentFetcher,
    table: &mut MarkTable,
    out: &mut W,
) -> Result<(), ConvertError> {
    let prev_id = release.previous.clone().ok_or_else(|| ConvertError::MalformedInput {
        detail: format!("release {} has no previous but is not the chain head", release.name),
    })?;

    let mut files = release.files_graph.clone();
    crate::resolve::prepare_file_history(&mut files, &release.objects);

    let mut tasks = release.tasks_hypergraph.clone();
    sanitize_tasks(&mut tasks);

    let mut graph = crate::resolve::resolve_commits_cycles(&files, &mut tasks, &release.releases_hypergraph, &release.name)?;

    let prev_node = CommitsNode::Release(prev_id.clone());
    let self_node = CommitsNode::Release(release.name.clone());
    let all_nodes: Vec<CommitsNode> = graph.nodes().cloned().collect();
    for node in &all_nodes {
        if *node != prev_node && *node != self_node && graph.node_order(node) == 0 {
            graph.add_edge(prev_node.clone(), node.clone());
        }
    }
    // No commit was created in this window at all: wire the release tags
    // together directly so the merge commit below still has a parent.
    if graph.node_order(&self_node) == 0 {
        graph.add_edge(prev_node.clone(), self_node.clone());
    }

    // A task or object can close into a release other than this window's
    // (e.g. one of its members is itself a boundary object of an earlier,
    // already-emitted release). That back-edge carries no new commit for
    // this window and is skipped rather than re-entering an emitted release.
    let is_stale_release = |node: &CommitsNode| matches!(node, CommitsNode::Release(rid) if *rid != release.name);

    let mut enqueued: BTreeSet<CommitsNode> = BTreeSet::new();
    let mut queue: VecDeque<CommitsNode> = VecDeque::new();
    for node in graph.neighbors(&prev_node) {
        if !is_stale_release(node) && enqueued.insert(node.clone()) {
            queue.push_back(node.clone());
        }
    }

    let mut stall = 0usize;
    let mut final_preds: Option<Vec<CommitsNode>> = None;

    while let Some(node) = queue.pop_front() {
        let preds: Vec<CommitsNode> = graph.incidents(&node).cloned().collect();
        if preds.iter().any(|p| !table.commit_lookup.contains_key(p)) {
            queue.push_back(node);
            stall += 1;
            if stall > queue.len() {
                return Err(ConvertError::MalformedInput {
                    detail: format!("release {} commits graph makes no progress past {}", release.name, queue[0]),
                });
            }
            continue;
        }
        stall = 0;

        if node == self_node {
            // The release's own boundary node closes the window: it is built
            // as the release merge commit after the loop, not as an ordinary
            // commit node, so its predecessors are stashed and it is not
            // re-enqueued.
            final_preds = Some(preds);
            continue;
        }

        let mark = emit_commit_node(release, &tasks, &node, &preds, table, content, out)?;
        table.commit_lookup.insert(node.clone(), mark);
        tracing::trace!(mark = mark.get(), node = %node, "emitted commit");

        for succ in graph.neighbors(&node).cloned().collect::<Vec<_>>() {
            if !is_stale_release(&succ) && enqueued.insert(succ.clone()) {
                queue.push_back(succ);
            }
        }
    }

    let preds = final_preds.ok_or_else(|| ConvertError::MalformedInput {
        detail: format!("release {} commits graph has no release-boundary endpoint", release.name),
    })?;
    let parents = resolve_parent_marks(release, &preds, table)?;
    let mark = table.marks.next_mark();
    let commit = format::build_release_merge_commit(release, mark, &parents);
    dump_stream(&[Record::Commit(commit)], out)?;
    table.commit_lookup.insert(self_node, mark);
    tracing::trace!(mark = mark.get(), "emitted release merge commit");

    Ok(())
}

fn resolve_parent_marks(release: &Release, preds: &[CommitsNode], table: &MarkTable) -> Result<Vec<Mark>, ConvertError> {
    preds
        .iter()
        .map(|p| {
            table.commit_lookup.get(p).copied().ok_or_else(|| ConvertError::FormatterViolation {
                release: release.name.clone(),
                node: p.to_string(),
                parent: p.to_string(),
            })
        })
        .collect()
}

fn emit_commit_node(
    release: &Release,
    tasks: &crate::hypergraph::Hypergraph<ObjectId, crate::model::TaskId>,
    node: &CommitsNode,
    preds: &[CommitsNode],
    table: &mut MarkTable,
    content: &dyn ContentFetcher,
    out: &mut impl Write,
) -> Result<Mark, ConvertError> {
    let parents = resolve_parent_marks(release, preds, table)?;

    match node {
        CommitsNode::Task(task_id) => {
            let members: Vec<ObjectId> = tasks.links_of_edge(task_id).cloned().collect();
            let objects = format::reduce_objects_for_commit(release, members.iter());
            ensure_blobs(table, objects.iter().copied(), content, out)?;

            let mark = table.marks.next_mark();
            let commit = format::build_task_commit(release, tasks, task_id, mark, &parents, |o| table.blob_marks.get(o).copied())?;
            dump_stream(&[Record::Commit(commit)], out)?;
            Ok(mark)
        }
        CommitsNode::Object(object_id) => {
            let object = release.object(object_id).ok_or_else(|| ConvertError::MalformedInput {
                detail: format!("release {} commits graph references unknown object {object_id}", release.name),
            })?;
            ensure_blob(table, object, content, out)?;

            let mark = table.marks.next_mark();
            let commit = format::build_object_commit(release, object, mark, &parents, |o| table.blob_marks.get(o).copied());
            dump_stream(&[Record::Commit(commit)], out)?;
            Ok(mark)
        }
        CommitsNode::Release(id) => Err(ConvertError::FormatterViolation {
            release: release.name.clone(),
            node: format!("release:{id}"),
            parent: "<unexpected release node before window endpoint>".into(),
        }),
    }
}
