//! End-to-end conversion scenarios driving [`history_convert::convert`]
//! straight through to a fast-import stream, one per history shape the
//! conversion pipeline has to handle.

use std::collections::BTreeMap;

use history_convert::{
    convert, AttributeValue, FileObject, History, NoContent, ObjectId, ObjectType, Release, ReleaseId, Task, TaskId,
};
use history_convert::graph::DiGraph;
use history_convert::hypergraph::Hypergraph;

fn file(name: &str, integrate_time: i64, version: u32) -> FileObject {
    FileObject {
        object_name: ObjectId::new(name),
        name: name.to_owned(),
        kind: ObjectType::File,
        instance: "1".into(),
        version,
        path: format!("{name}.txt"),
        author: "ada".into(),
        integrate_time,
        dir_changes: None,
    }
}

fn empty_release(name: &str, previous: Option<&str>, next: Option<&str>, created: i64) -> Release {
    Release {
        name: ReleaseId::new(name),
        previous: previous.map(ReleaseId::new),
        next: next.map(ReleaseId::new),
        created,
        author: "release-bot".into(),
        objects: BTreeMap::new(),
        tasks: BTreeMap::new(),
        files_graph: DiGraph::new(),
        tasks_hypergraph: Hypergraph::new(),
        releases_hypergraph: Hypergraph::new(),
    }
}

fn init_logger() {
    use tracing_subscriber::util::SubscriberInitExt;
    let _ = tracing_subscriber::fmt::Subscriber::builder()
        .with_target(false)
        .without_time()
        .with_max_level(tracing::Level::DEBUG)
        .finish()
        .try_init();
}

fn run(history: &History) -> String {
    init_logger();
    let mut out = Vec::new();
    convert(history, &NoContent, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// S2 — two tasks that both touch the same file object converge on a single
/// synthetic `common-*` task commit instead of two conflicting ones.
#[test]
fn overlapping_tasks_converge_on_a_common_task_commit() {
    let mut r1 = empty_release("R1", None, Some("R2"), 1000);
    r1.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));

    let mut r2 = empty_release("R2", Some("R1"), None, 2000);
    r2.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));
    r2.objects.insert(ObjectId::new("F1-2"), file("F1-2", 20, 2));
    r2.files_graph.add_edge(ObjectId::new("F1-1"), ObjectId::new("F1-2"));
    r2.tasks.insert(
        TaskId::new("T1"),
        Task {
            object_name: TaskId::new("T1"),
            author: "ada".into(),
            complete_time: 1500,
            attributes: BTreeMap::from([(
                "task_synopsis".to_owned(),
                AttributeValue::Text("First pass".into()),
            )]),
        },
    );
    r2.tasks.insert(
        TaskId::new("T2"),
        Task {
            object_name: TaskId::new("T2"),
            author: "bob".into(),
            complete_time: 1600,
            attributes: BTreeMap::from([(
                "task_synopsis".to_owned(),
                AttributeValue::Text("Second pass".into()),
            )]),
        },
    );
    r2.tasks_hypergraph.link(ObjectId::new("F1-2"), TaskId::new("T1"));
    r2.tasks_hypergraph.link(ObjectId::new("F1-2"), TaskId::new("T2"));
    r2.releases_hypergraph.link(ObjectId::new("F1-1"), ReleaseId::new("R1"));
    r2.releases_hypergraph.link(ObjectId::new("F1-2"), ReleaseId::new("R2"));

    let mut history = History::new();
    history.insert(r1);
    history.insert(r2);

    let text = run(&history);
    assert!(text.contains("Objects common to overlapping tasks"));
    assert!(!text.contains("First pass"));
    assert!(!text.contains("Second pass"));
    assert_eq!(text.matches("commit refs/tags/R2").count(), 2); // common task + release merge
}

/// S3 — a commits-graph cycle induced by two tasks that each depend on the
/// other's file lineage is broken by splitting one task.
#[test]
fn induced_commits_cycle_is_resolved_by_splitting_a_task() {
    let mut r1 = empty_release("R1", None, Some("R2"), 1000);
    r1.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));
    r1.objects.insert(ObjectId::new("F2-1"), file("F2-1", 10, 1));

    let mut r2 = empty_release("R2", Some("R1"), None, 2000);
    for (name, t, v) in [
        ("F1-1", 10, 1),
        ("F2-1", 10, 1),
        ("F1-2", 20, 2),
        ("F1-3", 30, 3),
        ("F2-2", 20, 2),
        ("F2-3", 30, 3),
    ] {
        r2.objects.insert(ObjectId::new(name), file(name, t, v));
    }
    r2.files_graph.add_edge(ObjectId::new("F1-1"), ObjectId::new("F1-2"));
    r2.files_graph.add_edge(ObjectId::new("F1-2"), ObjectId::new("F1-3"));
    r2.files_graph.add_edge(ObjectId::new("F2-1"), ObjectId::new("F2-2"));
    r2.files_graph.add_edge(ObjectId::new("F2-2"), ObjectId::new("F2-3"));

    r2.tasks.insert(
        TaskId::new("T1"),
        Task {
            object_name: TaskId::new("T1"),
            author: "ada".into(),
            complete_time: 1500,
            attributes: BTreeMap::new(),
        },
    );
    r2.tasks.insert(
        TaskId::new("T2"),
        Task {
            object_name: TaskId::new("T2"),
            author: "bob".into(),
            complete_time: 1600,
            attributes: BTreeMap::new(),
        },
    );
    // T1 needs F2-1 (from T2's slice) and T2 needs F1-2 (from T1's slice): a
    // commits-graph cycle that the files graph alone does not have.
    r2.tasks_hypergraph.link(ObjectId::new("F1-2"), TaskId::new("T1"));
    r2.tasks_hypergraph.link(ObjectId::new("F2-2"), TaskId::new("T1"));
    r2.tasks_hypergraph.link(ObjectId::new("F1-3"), TaskId::new("T2"));
    r2.tasks_hypergraph.link(ObjectId::new("F2-1"), TaskId::new("T2"));

    r2.releases_hypergraph.link(ObjectId::new("F1-1"), ReleaseId::new("R1"));
    r2.releases_hypergraph.link(ObjectId::new("F2-1"), ReleaseId::new("R1"));
    r2.releases_hypergraph.link(ObjectId::new("F1-3"), ReleaseId::new("R2"));
    r2.releases_hypergraph.link(ObjectId::new("F2-3"), ReleaseId::new("R2"));

    let mut history = History::new();
    history.insert(r1);
    history.insert(r2);

    // Must not error with UnresolvableCycle and must produce a stream with a
    // split task.
    let text = run(&history);
    assert!(text.contains("reset refs/heads/master"));
    assert!(text.to_lowercase().contains("commit refs/tags/r2"));
}

/// S4 — a file-history cycle (two versions each claiming to precede the
/// other) is broken deterministically before any commit is built.
#[test]
fn file_history_cycle_does_not_block_conversion() {
    let mut r1 = empty_release("R1", None, Some("R2"), 1000);
    r1.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));

    let mut r2 = empty_release("R2", Some("R1"), None, 2000);
    r2.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));
    r2.objects.insert(ObjectId::new("F1-2"), file("F1-2", 20, 2));
    r2.files_graph.add_edge(ObjectId::new("F1-1"), ObjectId::new("F1-2"));
    r2.files_graph.add_edge(ObjectId::new("F1-2"), ObjectId::new("F1-1"));
    r2.tasks.insert(
        TaskId::new("T1"),
        Task {
            object_name: TaskId::new("T1"),
            author: "ada".into(),
            complete_time: 1500,
            attributes: BTreeMap::from([("task_synopsis".to_owned(), AttributeValue::Text("Fix cycle".into()))]),
        },
    );
    r2.tasks_hypergraph.link(ObjectId::new("F1-2"), TaskId::new("T1"));
    r2.releases_hypergraph.link(ObjectId::new("F1-1"), ReleaseId::new("R1"));
    r2.releases_hypergraph.link(ObjectId::new("F1-2"), ReleaseId::new("R2"));

    let mut history = History::new();
    history.insert(r1);
    history.insert(r2);

    let text = run(&history);
    assert!(text.contains("Fix cycle"));
    assert!(text.contains("reset refs/heads/master"));
}

/// S5 — a task spanning two versions of the same logical file within one
/// release only emits the newer version's blob and file op.
#[test]
fn multi_version_task_keeps_only_the_newest_logical_file() {
    let mut r1 = empty_release("R1", None, Some("R2"), 1000);
    r1.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));

    let mut r2 = empty_release("R2", Some("R1"), None, 2000);
    r2.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));
    let mut mid = file("F1-2", 20, 2);
    mid.name = "F1".into();
    r2.objects.insert(ObjectId::new("F1-2"), mid);
    let mut newest = file("F1-3", 30, 3);
    newest.name = "F1".into();
    r2.objects.insert(ObjectId::new("F1-3"), newest);

    r2.files_graph.add_edge(ObjectId::new("F1-1"), ObjectId::new("F1-2"));
    r2.files_graph.add_edge(ObjectId::new("F1-2"), ObjectId::new("F1-3"));
    r2.tasks.insert(
        TaskId::new("T1"),
        Task {
            object_name: TaskId::new("T1"),
            author: "ada".into(),
            complete_time: 1500,
            attributes: BTreeMap::from([("task_synopsis".to_owned(), AttributeValue::Text("Two edits".into()))]),
        },
    );
    r2.tasks_hypergraph.link(ObjectId::new("F1-2"), TaskId::new("T1"));
    r2.tasks_hypergraph.link(ObjectId::new("F1-3"), TaskId::new("T1"));
    r2.releases_hypergraph.link(ObjectId::new("F1-1"), ReleaseId::new("R1"));
    r2.releases_hypergraph.link(ObjectId::new("F1-3"), ReleaseId::new("R2"));

    let mut history = History::new();
    history.insert(r1);
    history.insert(r2);

    let text = run(&history);
    // Only one file op should reference the logical file F1: the newest
    // version (F1-3.txt), never the superseded F1-2.txt.
    assert!(text.contains("F1-3.txt"));
    assert!(!text.contains("F1-2.txt"));
}

/// S6 — a directory object whose version records deletions of two children
/// emits `D` file ops rather than blobs.
#[test]
fn directory_deletion_emits_delete_file_ops() {
    let mut r1 = empty_release("R1", None, Some("R2"), 1000);
    r1.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));

    let mut r2 = empty_release("R2", Some("R1"), None, 2000);
    r2.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));
    let mut dir = file("D1-2", 20, 2);
    dir.kind = ObjectType::Dir;
    dir.path = "dir".into();
    dir.dir_changes = Some(history_convert::DirChanges {
        deleted: vec!["old-a".into(), "old-b".into()],
    });
    r2.objects.insert(ObjectId::new("D1-2"), dir);
    r2.files_graph.add_edge(ObjectId::new("F1-1"), ObjectId::new("D1-2"));
    r2.tasks.insert(
        TaskId::new("T1"),
        Task {
            object_name: TaskId::new("T1"),
            author: "ada".into(),
            complete_time: 1500,
            attributes: BTreeMap::from([("task_synopsis".to_owned(), AttributeValue::Text("Prune dir".into()))]),
        },
    );
    r2.tasks_hypergraph.link(ObjectId::new("D1-2"), TaskId::new("T1"));
    r2.releases_hypergraph.link(ObjectId::new("F1-1"), ReleaseId::new("R1"));
    r2.releases_hypergraph.link(ObjectId::new("D1-2"), ReleaseId::new("R2"));

    let mut history = History::new();
    history.insert(r1);
    history.insert(r2);

    let text = run(&history);
    assert!(text.contains("D dir/old-a"));
    assert!(text.contains("D dir/old-b"));
    assert!(!text.contains("blob\nmark :2")); // directory objects never get a blob
}

/// Unknown leading `previous` or a revisited release is rejected before any
/// output is produced.
#[test]
fn malformed_release_chain_is_rejected() {
    let mut r1 = empty_release("R1", Some("R0"), None, 1000);
    r1.objects.insert(ObjectId::new("F1-1"), file("F1-1", 10, 1));
    let mut history = History::new();
    history.insert(r1);

    let mut out = Vec::new();
    let err = convert(&history, &NoContent, &mut out).unwrap_err();
    assert!(matches!(err, history_convert::ConvertError::MalformedInput { .. }));
}

