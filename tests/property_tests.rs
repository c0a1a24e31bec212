//! Property tests over random directory trees: a sweep removes exactly the
//! folders with no content beneath them, and a restore brings them all back.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use dirsweep::recovery::restorer::restore_from_log;
use dirsweep::scanner::deletion::{DeletionConfig, delete_empty_folders};

/// A tree node: a folder holding zero-byte files, files with content and
/// child folders.
#[derive(Debug, Clone)]
struct Node {
    empty_files: usize,
    content_files: usize,
    children: Vec<Node>,
}

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = (0usize..3, prop_oneof![3 => Just(0usize), 1 => Just(1usize)]).prop_map(
        |(empty_files, content_files)| Node {
            empty_files,
            content_files,
            children: Vec::new(),
        },
    );
    leaf.prop_recursive(3, 24, 3, |inner| {
        (
            0usize..2,
            prop_oneof![4 => Just(0usize), 1 => Just(1usize)],
            prop::collection::vec(inner, 0..3),
        )
            .prop_map(|(empty_files, content_files, children)| Node {
                empty_files,
                content_files,
                children,
            })
    })
}

/// Materialize `node` at `dir`; returns whether anything with content lives
/// beneath it, and records every folder that should be swept.
fn materialize(node: &Node, dir: &Path, swept: &mut BTreeSet<PathBuf>) -> bool {
    fs::create_dir_all(dir).unwrap();
    for i in 0..node.empty_files {
        fs::write(dir.join(format!("empty{i}.txt")), "").unwrap();
    }
    for i in 0..node.content_files {
        fs::write(dir.join(format!("data{i}.txt")), "content").unwrap();
    }
    let mut has_content = node.content_files > 0;
    for (i, child) in node.children.iter().enumerate() {
        has_content |= materialize(child, &dir.join(format!("d{i}")), swept);
    }
    if !has_content {
        swept.insert(dir.to_path_buf());
    }
    has_content
}

fn all_dirs(root: &Path, out: &mut BTreeSet<PathBuf>) {
    if !root.is_dir() {
        return;
    }
    out.insert(root.to_path_buf());
    for entry in fs::read_dir(root).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            all_dirs(&path, out);
        }
    }
}

/// Every file under `root` with its contents.
fn all_files(root: &Path, out: &mut BTreeMap<PathBuf, String>) {
    if !root.is_dir() {
        return;
    }
    for entry in fs::read_dir(root).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            all_files(&path, out);
        } else {
            out.insert(path.clone(), fs::read_to_string(&path).unwrap());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sweep_removes_exactly_the_contentless_folders(node in node_strategy()) {
        let work = tempfile::tempdir().unwrap();
        let root = work.path().join("root");
        let mut expected = BTreeSet::new();
        materialize(&node, &root, &mut expected);
        let mut before = BTreeSet::new();
        all_dirs(&root, &mut before);
        let mut files_before = BTreeMap::new();
        all_files(&root, &mut files_before);

        let log = work.path().join("delete_log.json");
        let report = delete_empty_folders(
            &root,
            DeletionConfig { recovery_log: log.clone(), dry_run: false },
        )
        .unwrap();

        let swept: BTreeSet<PathBuf> =
            report.records.iter().map(|r| PathBuf::from(&r.path)).collect();
        prop_assert_eq!(&swept, &expected);
        prop_assert!(report.failures.is_empty());

        let mut after = BTreeSet::new();
        all_dirs(&root, &mut after);
        let survivors: BTreeSet<PathBuf> = before.difference(&expected).cloned().collect();
        prop_assert_eq!(&after, &survivors);

        // Children are always logged before their parent.
        for (i, record) in report.records.iter().enumerate() {
            for later in &report.records[i + 1..] {
                prop_assert!(!Path::new(&later.path).starts_with(&record.path)
                    || later.path == record.path);
            }
        }

        if !expected.is_empty() {
            let restored = restore_from_log(&log).unwrap();
            prop_assert!(restored.is_complete());
            let mut again = BTreeSet::new();
            all_dirs(&root, &mut again);
            prop_assert_eq!(&again, &before);
            let mut files_again = BTreeMap::new();
            all_files(&root, &mut files_again);
            prop_assert_eq!(&files_again, &files_before);
        }
    }

    #[test]
    fn dry_run_reports_the_same_folders_without_touching_disk(node in node_strategy()) {
        let work = tempfile::tempdir().unwrap();
        let root = work.path().join("root");
        let mut expected = BTreeSet::new();
        materialize(&node, &root, &mut expected);
        let mut before = BTreeSet::new();
        all_dirs(&root, &mut before);

        let log = work.path().join("delete_log.json");
        let report = delete_empty_folders(
            &root,
            DeletionConfig { recovery_log: log.clone(), dry_run: true },
        )
        .unwrap();

        let flagged: BTreeSet<PathBuf> =
            report.records.iter().map(|r| PathBuf::from(&r.path)).collect();
        prop_assert_eq!(&flagged, &expected);
        let mut after = BTreeSet::new();
        all_dirs(&root, &mut after);
        prop_assert_eq!(&after, &before);
        prop_assert!(!log.exists());
    }
}
