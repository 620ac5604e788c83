use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use lopdf::Document;
use metastrip::config::{CompressionLevel, RunConfig};
use metastrip::external::FixedTool;
use metastrip::metadata::{read_info, DirectiveSet};
use metastrip::pipeline::{
    CancelToken, FileOutcome, FileProcessor, Pipeline, ProgressEvent, ProgressSink, RunStatus,
    TracingSink,
};
use parking_lot::Mutex;

use crate::fixtures::TestFixtures;

fn strip_author() -> DirectiveSet {
    let mut directives = DirectiveSet::default();
    directives.remove("/Author").unwrap();
    directives.set("/Title", "Redacted").unwrap();
    directives
}

fn pipeline(config: RunConfig, qpdf: Option<PathBuf>) -> Pipeline {
    Pipeline::new(FileProcessor::new(
        config,
        strip_author(),
        Arc::new(FixedTool(qpdf)),
    ))
}

/// Records every event and optionally cancels once a given file has finished
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
    cancel_after: Option<(usize, CancelToken)>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    fn cancelling_after(index: usize, token: CancelToken) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_after: Some((index, token)),
        }
    }

    fn started_indices(&self) -> Vec<usize> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::FileStarted { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let (ProgressEvent::FileFinished { index, .. }, Some((after, token))) =
            (&event, &self.cancel_after)
        {
            if index == after {
                token.cancel();
            }
        }
        self.events.lock().push(event);
    }
}

fn author_of(path: &Path) -> Option<String> {
    read_info(&Document::load(path).unwrap()).get("Author").cloned()
}

#[test]
fn test_failing_file_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let files = TestFixtures::batch(dir.path(), 5, &[3]);

    let sink = RecordingSink::new();
    let report = pipeline(RunConfig::default(), None).execute_blocking(
        &files,
        &CancelToken::new(),
        &sink,
    );

    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.files.len(), 5);
    assert_eq!(report.summary.success, 4);
    assert_eq!(report.summary.errors, 1);
    assert_eq!(report.summary.processed(), 5);
    assert!(report.files[2].outcome.is_failure());
    assert_eq!(sink.started_indices(), vec![1, 2, 3, 4, 5]);

    for i in [1, 2, 4, 5] {
        let cleaned = dir.path().join(format!("file{}_clean.pdf", i));
        assert_eq!(author_of(&cleaned), None);
    }
    assert!(!dir.path().join("file3_clean.pdf").exists());
}

#[test]
fn test_cyclic_xref_does_not_stall_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let files = TestFixtures::batch(dir.path(), 5, &[]);
    TestFixtures::write(&files[2], &TestFixtures::self_referencing_xref_pdf());

    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let report = pipeline(RunConfig::default(), None).execute_blocking(
            &files,
            &CancelToken::new(),
            &TracingSink,
        );
        let _ = tx.send(report);
    });

    let report = rx
        .recv_timeout(Duration::from_secs(30))
        .expect("batch stalled on the cyclic cross-reference file");
    worker.join().unwrap();

    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.summary.processed(), 5);
    for i in [1, 2, 4, 5] {
        let cleaned = dir.path().join(format!("file{}_clean.pdf", i));
        assert_eq!(author_of(&cleaned), None);
    }
}

#[test]
fn test_cancel_after_second_file() {
    let dir = tempfile::tempdir().unwrap();
    let files = TestFixtures::batch(dir.path(), 5, &[]);

    let cancel = CancelToken::new();
    let sink = RecordingSink::cancelling_after(2, cancel.clone());
    let report = pipeline(RunConfig::default(), None).execute_blocking(&files, &cancel, &sink);

    assert_eq!(report.status(), RunStatus::Cancelled);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.summary.success, 2);
    assert_eq!(sink.started_indices(), vec![1, 2]);
    assert!(!dir.path().join("file3_clean.pdf").exists());
    assert!(matches!(
        sink.events.lock().last(),
        Some(ProgressEvent::Finished(summary)) if summary.is_cancelled()
    ));
}

#[test]
fn test_directives_rewrite_info_dictionary() {
    let dir = tempfile::tempdir().unwrap();
    let source = TestFixtures::write(&dir.path().join("in.pdf"), &TestFixtures::minimal_pdf());
    let out_dir = dir.path().join("out");
    fs::create_dir_all(&out_dir).unwrap();

    let config = RunConfig::new(false, false, Some(&out_dir), CompressionLevel::None);
    let report = pipeline(config, None).execute_blocking(
        &[source.clone()],
        &CancelToken::new(),
        &TracingSink,
    );

    assert_eq!(report.files[0].destination, out_dir.join("in.pdf"));
    let info = read_info(&Document::load(out_dir.join("in.pdf")).unwrap());
    assert!(!info.contains_key("Author"));
    assert_eq!(info.get("Title").map(String::as_str), Some("Redacted"));
    assert_eq!(info.get("Producer").map(String::as_str), Some("Fixture Writer"));
    assert_eq!(author_of(&source).as_deref(), Some("Jane Doe"));
}

#[test]
fn test_overwrite_with_backup() {
    let dir = tempfile::tempdir().unwrap();
    let source = TestFixtures::write(&dir.path().join("doc.pdf"), &TestFixtures::minimal_pdf());
    let original = fs::read(&source).unwrap();

    let config = RunConfig::new(true, true, None, CompressionLevel::None);
    let report = pipeline(config, None).execute_blocking(
        &[source.clone()],
        &CancelToken::new(),
        &TracingSink,
    );

    assert_eq!(report.files[0].outcome, FileOutcome::Success);
    assert_eq!(author_of(&source), None);

    let backups: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("doc.pdf.bak_"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read(backups[0].path()).unwrap(), original);
}

#[test]
fn test_overwrite_without_backup_leaves_no_copies() {
    let dir = tempfile::tempdir().unwrap();
    let source = TestFixtures::write(&dir.path().join("doc.pdf"), &TestFixtures::minimal_pdf());

    let config = RunConfig::new(false, true, None, CompressionLevel::None);
    pipeline(config, None).execute_blocking(&[source], &CancelToken::new(), &TracingSink);

    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["doc.pdf".to_string()]);
}

#[tokio::test]
async fn test_async_execute_matches_blocking_run() {
    let dir = tempfile::tempdir().unwrap();
    let files = TestFixtures::batch(dir.path(), 3, &[2]);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let sink: Arc<dyn ProgressSink> = Arc::new(tx);
    let report = Arc::new(pipeline(RunConfig::default(), None))
        .execute(files, CancelToken::new(), sink)
        .await
        .unwrap();

    assert_eq!(report.summary.success, 2);
    assert_eq!(report.summary.errors, 1);

    let mut finished = 0;
    while let Ok(event) = rx.try_recv() {
        if let ProgressEvent::FileFinished { .. } = event {
            finished += 1;
        }
    }
    assert_eq!(finished, 3);
}

#[cfg(unix)]
mod compression {
    use super::*;

    #[test]
    fn test_growth_after_compression_is_a_regression() {
        let dir = tempfile::tempdir().unwrap();
        let source = TestFixtures::write(&dir.path().join("a.pdf"), &TestFixtures::minimal_pdf());
        let qpdf = TestFixtures::fake_qpdf(
            &dir.path().join("tools"),
            "for last; do :; done\nhead -c 8192 /dev/zero >> \"$last\"",
        );

        let config = RunConfig::new(false, false, None, CompressionLevel::Maximum);
        let report = pipeline(config, Some(qpdf)).execute_blocking(
            &[source],
            &CancelToken::new(),
            &TracingSink,
        );

        assert!(matches!(
            report.files[0].outcome,
            FileOutcome::SizeRegression { before, after } if after > before
        ));
        assert_eq!(report.summary.success, 1);
        assert_eq!(report.summary.regressions, 1);
        assert_eq!(report.summary.errors, 0);
    }

    #[test]
    fn test_qpdf_receives_level_flags() {
        let dir = tempfile::tempdir().unwrap();
        let source = TestFixtures::write(&dir.path().join("a.pdf"), &TestFixtures::minimal_pdf());
        let args_file = dir.path().join("args.txt");
        let qpdf = TestFixtures::fake_qpdf(
            &dir.path().join("tools"),
            &format!("echo \"$@\" > \"{}\"", args_file.display()),
        );

        let config = RunConfig::new(false, false, None, CompressionLevel::Low);
        let report = pipeline(config, Some(qpdf)).execute_blocking(
            &[source],
            &CancelToken::new(),
            &TracingSink,
        );

        assert_eq!(report.files[0].outcome, FileOutcome::Success);
        let args = fs::read_to_string(&args_file).unwrap();
        let expected_target = dir.path().join("a_clean.pdf");
        assert_eq!(
            args.trim(),
            format!(
                "--compression-level=1 --stream-data=compress --replace-input {}",
                expected_target.display()
            )
        );
    }

    #[test]
    fn test_qpdf_failure_fails_the_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let files = TestFixtures::batch(dir.path(), 2, &[]);
        let qpdf = TestFixtures::fake_qpdf(
            &dir.path().join("tools"),
            "echo 'qpdf: damaged stream' >&2\nexit 2",
        );

        let config = RunConfig::new(false, false, None, CompressionLevel::High);
        let report = pipeline(config, Some(qpdf)).execute_blocking(
            &files,
            &CancelToken::new(),
            &TracingSink,
        );

        assert_eq!(report.summary.errors, 2);
        match &report.files[0].outcome {
            FileOutcome::Failure { reason } => assert!(reason.contains("qpdf: damaged stream")),
            other => panic!("unexpected outcome {:?}", other),
        }
        // metadata was already written before qpdf ran
        assert!(dir.path().join("file1_clean.pdf").exists());
    }
}
