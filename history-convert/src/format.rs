//! Record formatter (§4.F): turns a resolved commits-graph node into a
//! `fast_import_stream` record, including commit-message assembly and the
//! task-metadata synthesis fallback for the sanitizer's synthetic tasks and
//! the resolver's split tasks.

use std::borrow::Cow;
use std::collections::BTreeMap;

use fast_import_stream::{Commit, FileMode, FileOp, Mark, PersonIdent};

use crate::error::ConvertError;
use crate::hypergraph::Hypergraph;
use crate::model::{AttributeValue, FileObject, ObjectId, ObjectType, Release, Task, TaskId};

const EMAIL_DOMAIN: &str = "nokia.com";

fn ident(author: &str, when_unix: i64) -> PersonIdent {
    PersonIdent::new(author, format!("{author}@{EMAIL_DOMAIN}"), when_unix)
}

/// Resolves the [`Task`] record backing a commits-graph task node. Handles
/// two cases the release's own task map never stores directly:
///
/// - a resolver split `<task>_<k>` (possibly nested, `<task>_<k>_<j>`, ...)
///   reuses the metadata of the original task whose name remains once every
///   trailing `_<digits>` suffix is stripped;
/// - a sanitizer-synthesized `common-<t1>-<t2>` task has no author/timestamp
///   of its own, so one is synthesized from the member file object with the
///   greatest `integrate_time` (tie-break by version, then identity) — the
///   same tie-break the file-history cycle breaker uses for "newest".
pub fn task_metadata<'a>(
    release: &'a Release,
    tasks: &Hypergraph<ObjectId, TaskId>,
    task_id: &TaskId,
) -> Result<Cow<'a, Task>, ConvertError> {
    let mut base = task_id.clone();
    loop {
        if let Some(t) = release.task(&base) {
            return Ok(Cow::Borrowed(t));
        }
        if base.as_str().starts_with("common-") {
            return synthesize_common_task(release, tasks, task_id).map(Cow::Owned);
        }
        match strip_split_suffix(&base) {
            Some(stripped) => base = stripped,
            None => {
                return Err(ConvertError::UnknownTask {
                    release: release.name.clone(),
                    task: task_id.clone(),
                })
            }
        }
    }
}

fn strip_split_suffix(task_id: &TaskId) -> Option<TaskId> {
    let s = task_id.as_str();
    let pos = s.rfind('_')?;
    let suffix = &s[pos + 1..];
    (!suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit())).then(|| TaskId::new(&s[..pos]))
}

fn synthesize_common_task(release: &Release, tasks: &Hypergraph<ObjectId, TaskId>, task_id: &TaskId) -> Result<Task, ConvertError> {
    let members: Vec<&FileObject> = tasks.links_of_edge(task_id).filter_map(|o| release.object(o)).collect();
    let newest = members
        .iter()
        .max_by_key(|o| (o.integrate_time, o.version, o.object_name.clone()))
        .ok_or_else(|| ConvertError::UnknownTask {
            release: release.name.clone(),
            task: task_id.clone(),
        })?;

    let mut names: Vec<&str> = members.iter().map(|o| o.object_name.as_str()).collect();
    names.sort_unstable();

    let mut attributes = BTreeMap::new();
    attributes.insert(
        "task_synopsis".to_owned(),
        AttributeValue::Text(format!("Objects common to overlapping tasks ({task_id})")),
    );
    attributes.insert("task_description".to_owned(), AttributeValue::Text(names.join("\n")));

    Ok(Task {
        object_name: task_id.clone(),
        author: newest.author.clone(),
        complete_time: newest.integrate_time,
        attributes,
    })
}

fn attr_text(v: &AttributeValue) -> &str {
    match v {
        AttributeValue::Text(t) => t,
        AttributeValue::Nested(_) => "",
    }
}

/// Assembles a task commit's message from its attribute bag, per §4.F.
pub fn task_commit_message(task: &Task) -> Vec<u8> {
    let mut lines = vec![
        task.attributes.get("task_synopsis").map(attr_text).unwrap_or_default().to_owned(),
        String::new(),
        task.attributes.get("task_description").map(attr_text).unwrap_or_default().to_owned(),
        String::new(),
    ];

    for (key, value) in &task.attributes {
        if matches!(key.as_str(), "task_synopsis" | "task_description" | "status_log" | "inspection_task") {
            continue;
        }
        if let AttributeValue::Text(text) = value {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            lines.push(format!("Synergy-{}: {}", key.replace('_', "-"), trimmed.replace('\n', " ")));
        }
    }

    if let Some(AttributeValue::Nested(nested)) = task.attributes.get("inspection_task") {
        for (key, value) in nested {
            if key == "status_log" || value.trim().is_empty() {
                continue;
            }
            let stripped = key.replace("task_", "").replace("insp_", "").replace('_', "-");
            for line in value.lines() {
                lines.push(format!("Synergy-insp-{stripped}: {}", line.trim()));
            }
        }
    }

    lines.join("\n").into_bytes()
}

fn file_ops(objects: &[&FileObject], blob_mark: &impl Fn(&ObjectId) -> Option<Mark>) -> Vec<FileOp> {
    let mut ops = Vec::new();
    for o in objects {
        match o.kind {
            ObjectType::File => {
                if let Some(mark) = blob_mark(&o.object_name) {
                    ops.push(FileOp::Modify {
                        mode: FileMode::Regular,
                        mark,
                        path: o.path.clone().into(),
                    });
                }
            }
            ObjectType::Dir => {
                if let Some(changes) = &o.dir_changes {
                    for name in &changes.deleted {
                        ops.push(FileOp::Delete {
                            path: format!("{}/{name}", o.path).into(),
                        });
                    }
                }
            }
        }
    }
    ops
}

/// Collapses multiple versions of the same logical file (`name`/`type`/
/// `instance`) down to the one with the greatest `(integrate_time, version)`.
/// Results are sorted by object identity for deterministic emission.
pub fn reduce_objects_for_commit<'a>(release: &'a Release, objects: impl Iterator<Item = &'a ObjectId>) -> Vec<&'a FileObject> {
    let mut latest: BTreeMap<(&'a str, ObjectType, &'a str), &'a FileObject> = BTreeMap::new();
    for id in objects {
        let Some(o) = release.object(id) else { continue };
        latest
            .entry(o.logical_key())
            .and_modify(|cur| {
                if (o.integrate_time, o.version) > (cur.integrate_time, cur.version) {
                    *cur = o;
                }
            })
            .or_insert(o);
    }
    let mut result: Vec<&FileObject> = latest.into_values().collect();
    result.sort_by(|a, b| a.object_name.cmp(&b.object_name));
    result
}

fn parent_split(parents: &[Mark]) -> (Option<Mark>, Vec<Mark>) {
    (parents.first().copied(), parents.get(1..).map(<[Mark]>::to_vec).unwrap_or_default())
}

/// Builds the commit for a task node.
pub fn build_task_commit(
    release: &Release,
    tasks: &Hypergraph<ObjectId, TaskId>,
    task_id: &TaskId,
    mark: Mark,
    parents: &[Mark],
    blob_mark: impl Fn(&ObjectId) -> Option<Mark>,
) -> Result<Commit, ConvertError> {
    let task = task_metadata(release, tasks, task_id)?;
    let message = task_commit_message(&task);
    let members: Vec<ObjectId> = tasks.links_of_edge(task_id).cloned().collect();
    let objects = reduce_objects_for_commit(release, members.iter());
    let (from, merge) = parent_split(parents);

    Ok(Commit {
        branch: format!("refs/tags/{}", release.name).into(),
        mark,
        author: ident(&task.author, task.complete_time),
        committer: ident(&task.author, task.complete_time),
        message,
        from,
        merge,
        file_ops: file_ops(&objects, &blob_mark),
    })
}

/// Builds the commit for a lone file object not grouped into any task.
pub fn build_object_commit(
    release: &Release,
    object: &FileObject,
    mark: Mark,
    parents: &[Mark],
    blob_mark: impl Fn(&ObjectId) -> Option<Mark>,
) -> Commit {
    let message = format!("Object not associated to task in release: {}", object.object_name).into_bytes();
    let (from, merge) = parent_split(parents);
    Commit {
        branch: format!("refs/tags/{}", release.name).into(),
        mark,
        author: ident(&object.author, object.integrate_time),
        committer: ident(&object.author, object.integrate_time),
        message,
        from,
        merge,
        file_ops: file_ops(&[object], &blob_mark),
    }
}

/// Builds the initial release's single commit, with every non-directory file
/// object in the release present.
pub fn build_initial_commit(release: &Release, mark: Mark, blob_mark: impl Fn(&ObjectId) -> Option<Mark>) -> Commit {
    let mut objects: Vec<&FileObject> = release.objects.values().filter(|o| o.kind == ObjectType::File).collect();
    objects.sort_by(|a, b| a.object_name.cmp(&b.object_name));

    Commit {
        branch: format!("refs/tags/{}", release.name).into(),
        mark,
        author: ident("Nokia", release.created),
        committer: ident("Nokia", release.created),
        message: b"Initial commit".to_vec(),
        from: None,
        merge: Vec::new(),
        file_ops: file_ops(&objects, &blob_mark),
    }
}

/// Builds the release-boundary merge commit that ties together every node
/// left pending at the end of a release's emission.
pub fn build_release_merge_commit(release: &Release, mark: Mark, parents: &[Mark]) -> Commit {
    let (from, merge) = parent_split(parents);
    Commit {
        branch: format!("refs/tags/{}", release.name).into(),
        mark,
        author: ident(&release.author, release.created),
        committer: ident(&release.author, release.created),
        message: format!("Release {}", release.name).into_bytes(),
        from,
        merge,
        file_ops: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DirChanges, Release as ReleaseModel, ReleaseId};
    use crate::{graph::DiGraph, hypergraph::Hypergraph as HG};

    fn file(name: &str, integrate_time: i64, version: u32, author: &str) -> FileObject {
        FileObject {
            object_name: ObjectId::new(name),
            name: name.to_owned(),
            kind: ObjectType::File,
            instance: "1".into(),
            version,
            path: format!("{name}.txt"),
            author: author.into(),
            integrate_time,
            dir_changes: None,
        }
    }

    fn empty_release() -> ReleaseModel {
        ReleaseModel {
            name: ReleaseId::new("R1"),
            previous: None,
            next: None,
            created: 1000,
            author: "ada".into(),
            objects: BTreeMap::new(),
            tasks: BTreeMap::new(),
            files_graph: DiGraph::new(),
            tasks_hypergraph: HG::new(),
            releases_hypergraph: HG::new(),
        }
    }

    #[test]
    fn task_message_assembles_trailers_in_key_order() {
        let mut attrs = BTreeMap::new();
        attrs.insert("task_synopsis".to_owned(), AttributeValue::Text("Fix the thing".into()));
        attrs.insert("task_description".to_owned(), AttributeValue::Text("Longer story.".into()));
        attrs.insert("priority".to_owned(), AttributeValue::Text("high".into()));
        attrs.insert("status_log".to_owned(), AttributeValue::Text("noise".into()));
        let task = Task {
            object_name: TaskId::new("T1"),
            author: "ada".into(),
            complete_time: 1000,
            attributes: attrs,
        };

        let msg = String::from_utf8(task_commit_message(&task)).unwrap();
        assert_eq!(msg, "Fix the thing\n\nLonger story.\n\nSynergy-priority: high");
    }

    #[test]
    fn split_task_reuses_original_metadata() {
        let mut release = empty_release();
        release.tasks.insert(
            TaskId::new("T1"),
            Task {
                object_name: TaskId::new("T1"),
                author: "ada".into(),
                complete_time: 42,
                attributes: BTreeMap::new(),
            },
        );
        let tasks = HG::new();
        let resolved = task_metadata(&release, &tasks, &TaskId::new("T1_2")).unwrap();
        assert_eq!(resolved.author, "ada");
        assert_eq!(resolved.complete_time, 42);
    }

    #[test]
    fn common_task_synthesizes_from_newest_member() {
        let mut release = empty_release();
        release.objects.insert(ObjectId::new("F1"), file("F1", 10, 1, "ada"));
        release.objects.insert(ObjectId::new("F2"), file("F2", 99, 1, "bob"));

        let mut tasks: HG<ObjectId, TaskId> = HG::new();
        tasks.link(ObjectId::new("F1"), TaskId::new("common-T1-T2"));
        tasks.link(ObjectId::new("F2"), TaskId::new("common-T1-T2"));

        let resolved = task_metadata(&release, &tasks, &TaskId::new("common-T1-T2")).unwrap();
        assert_eq!(resolved.author, "bob");
        assert_eq!(resolved.complete_time, 99);
    }

    #[test]
    fn reduce_keeps_newest_version_of_logical_file() {
        let mut release = empty_release();
        release.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1, "ada"));
        let mut newer = file("F1-2", 20, 2, "ada");
        newer.name = "F1-1".into(); // same logical file
        release.objects.insert(ObjectId::new("F1-2"), newer);

        let ids = [ObjectId::new("F1-1"), ObjectId::new("F1-2")];
        let reduced = reduce_objects_for_commit(&release, ids.iter());
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].object_name, ObjectId::new("F1-2"));
    }

    #[test]
    fn directory_deletion_emits_delete_ops() {
        let mut dir = file("D1", 5, 1, "ada");
        dir.kind = ObjectType::Dir;
        dir.path = "d".into();
        dir.dir_changes = Some(DirChanges {
            deleted: vec!["a".into(), "b".into()],
        });
        let ops = file_ops(&[&dir], &|_| None);
        assert_eq!(
            ops,
            vec![
                FileOp::Delete { path: "d/a".into() },
                FileOp::Delete { path: "d/b".into() },
            ]
        );
    }
}
