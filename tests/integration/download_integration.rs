#![cfg(unix)]

use std::fs;
use std::io::{Cursor, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use metastrip::external::{FixedAnswer, Platform, QpdfManager, ToolProvider, ToolState};
use mockito::mock;
use zip::write::FileOptions;

fn release_archive(prefix: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().unix_permissions(0o644);

    writer
        .add_directory(format!("{}/bin/", prefix), options)
        .unwrap();
    writer
        .start_file(format!("{}/bin/qpdf", prefix), options)
        .unwrap();
    writer
        .write_all(b"#!/bin/sh\necho 'qpdf version 12.2.0'\n")
        .unwrap();
    writer
        .start_file(format!("{}/lib/libqpdf.so.30", prefix), options)
        .unwrap();
    writer.write_all(b"not really a library").unwrap();
    writer
        .start_file(format!("{}/share/doc/qpdf/README.md", prefix), options)
        .unwrap();
    writer.write_all(b"docs").unwrap();

    writer.finish().unwrap().into_inner()
}

fn manager(dir: &Path, base_url: String, consent: bool) -> QpdfManager {
    QpdfManager::new(Box::new(FixedAnswer(consent)))
        .with_install_dir(dir.join("install"))
        .with_base_url(base_url)
        .with_search_path(dir.join("empty"))
}

#[test]
fn test_download_installs_binary_and_libraries() {
    let Ok(platform) = Platform::detect() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let route = format!("/ok/v12.2.0/{}", platform.asset);
    let _release = mock("GET", route.as_str())
        .with_status(200)
        .with_body(release_archive("qpdf-12.2.0-test"))
        .create();

    let manager = manager(dir.path(), format!("{}/ok", mockito::server_url()), true);
    let installed = manager.qpdf_path().expect("qpdf installed");

    let install = dir.path().join("install");
    assert_eq!(installed, install.join("bin/qpdf"));
    assert_eq!(manager.state(), ToolState::Downloaded(installed.clone()));
    assert!(install.join("lib/libqpdf.so.30").exists());
    assert!(!install.join("bin/README.md").exists());
    assert!(!install.join("bin").join(&platform.asset).exists());

    let mode = fs::metadata(&installed).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);

    // cached: no second download
    assert_eq!(manager.qpdf_path(), Some(installed));
}

#[test]
fn test_failed_download_is_cached_as_unavailable() {
    let Ok(platform) = Platform::detect() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let route = format!("/missing/v12.2.0/{}", platform.asset);
    let _release = mock("GET", route.as_str()).with_status(404).create();

    let manager = manager(dir.path(), format!("{}/missing", mockito::server_url()), true);
    assert_eq!(manager.qpdf_path(), None);
    assert_eq!(manager.state(), ToolState::Unavailable);
    assert!(!dir
        .path()
        .join("install/bin")
        .join(&platform.asset)
        .exists());
}

#[test]
fn test_declined_download_never_touches_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(dir.path(), "http://127.0.0.1:9".to_string(), false);

    assert_eq!(manager.qpdf_path(), None);
    assert_eq!(manager.state(), ToolState::UserDeclined);
    assert!(!dir.path().join("install/bin").exists());
}
