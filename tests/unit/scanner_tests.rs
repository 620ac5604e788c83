use std::path::{Path, PathBuf};

use metastrip::scanner::{FileScanner, ScanOptions};
use proptest::prelude::*;

use crate::fixtures::TestFixtures;

/// Directory depth of `file` below `root`; root contents are level 0
fn depth_below(root: &Path, file: &Path) -> usize {
    file.strip_prefix(root)
        .map(|rel| rel.components().count() - 1)
        .unwrap_or(usize::MAX)
}

fn build_tree(root: &Path, depths: &[usize]) -> Vec<PathBuf> {
    depths
        .iter()
        .enumerate()
        .map(|(i, depth)| {
            let mut dir = root.to_path_buf();
            for level in 1..=*depth {
                dir.push(format!("level{}", level));
            }
            TestFixtures::write(&dir.join(format!("doc{}.pdf", i)), b"%PDF-1.4\n%%EOF\n")
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn no_file_deeper_than_max_depth(
        depths in prop::collection::vec(0usize..6, 1..8),
        max_depth in 1usize..5,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let written = build_tree(dir.path(), &depths);

        let scanner = FileScanner::new(ScanOptions {
            recursive: true,
            max_depth,
            validate_signature: true,
        });
        let found = scanner.collect(&[dir.path()]).files;

        for file in &found {
            prop_assert!(depth_below(dir.path(), file) <= max_depth);
        }
        let expected = written
            .iter()
            .filter(|f| depth_below(dir.path(), f) <= max_depth)
            .count();
        prop_assert_eq!(found.len(), expected);
    }
}

#[test]
fn test_non_recursive_ignores_subfolders() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path(), &[0, 1, 2]);

    let found = FileScanner::new(ScanOptions::default())
        .collect(&[dir.path()])
        .files;
    assert_eq!(found, vec![dir.path().join("doc0.pdf")]);
}

#[test]
fn test_files_without_signature_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    TestFixtures::write(&dir.path().join("real.pdf"), &TestFixtures::minimal_pdf());
    TestFixtures::write(&dir.path().join("renamed.pdf"), b"GIF89a");
    TestFixtures::write(&dir.path().join("notes.txt"), b"%PDF-1.4");

    let found = FileScanner::new(ScanOptions::default())
        .collect(&[dir.path()])
        .files;
    assert_eq!(found, vec![dir.path().join("real.pdf")]);
}

#[test]
fn test_results_are_sorted_across_roots() {
    let dir = tempfile::tempdir().unwrap();
    let b = TestFixtures::write(&dir.path().join("b/x.pdf"), b"%PDF-1.7");
    let a = TestFixtures::write(&dir.path().join("a/y.pdf"), b"%PDF-1.7");

    let result = FileScanner::new(ScanOptions::default())
        .collect(&[dir.path().join("b"), dir.path().join("a"), b.clone()]);
    assert_eq!(result.files, vec![a, b]);
    assert!(result.missing.is_empty());
}
