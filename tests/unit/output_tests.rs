use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use metastrip::config::Settings;
use metastrip::output::{choose_backup_path, Destination};
use proptest::prelude::*;

#[test]
fn test_destination_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("in/report.pdf");
    let out_dir = dir.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();
    let out_file = dir.path().join("single.pdf");

    // overwrite wins over an output setting
    assert_eq!(
        Destination::from_settings(true, Some(&out_dir)).resolve(&source),
        source
    );
    assert_eq!(
        Destination::from_settings(false, Some(&out_dir)).resolve(&source),
        out_dir.join("report.pdf")
    );
    assert_eq!(
        Destination::from_settings(false, Some(&out_file)).resolve(&source),
        out_file
    );
    assert_eq!(
        Destination::from_settings(false, None).resolve(&source),
        dir.path().join("in/report_clean.pdf")
    );
}

#[test]
fn test_destination_decided_once() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("later");
    let destination = Destination::from_settings(false, Some(&out));

    fs::create_dir_all(&out).unwrap();
    assert_eq!(destination.resolve(Path::new("a.pdf")), out);
}

#[test]
fn test_corrupt_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metastrip_config.json");
    fs::write(&path, "{ \"backup\": tru").unwrap();
    assert_eq!(Settings::load(&path), Settings::default());
}

proptest! {
    #[test]
    fn backup_path_is_first_unused_candidate(taken in prop::collection::btree_set(0u64..6, 0..6)) {
        let source = Path::new("docs/contract.pdf");
        let ts = 1_718_000_000;
        let candidate = |n: u64| if n == 0 {
            PathBuf::from(format!("docs/contract.pdf.bak_{}", ts))
        } else {
            PathBuf::from(format!("docs/contract.pdf.bak_{}_{}", ts, n))
        };
        let existing: HashSet<PathBuf> = taken.iter().map(|n| candidate(*n)).collect();

        let chosen = choose_backup_path(source, ts, |p| existing.contains(p));
        let first_free = (0..).find(|n| !taken.contains(n)).unwrap();
        prop_assert_eq!(chosen, candidate(first_free));
    }
}
