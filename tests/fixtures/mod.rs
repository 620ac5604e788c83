//! Shared fixtures: PDFs built with lopdf, fake qpdf executables, folder trees
#![allow(dead_code)]

use lopdf::{dictionary, Document, Object};
use std::fs;
use std::path::{Path, PathBuf};

pub struct TestFixtures;

impl TestFixtures {
    /// One-page PDF whose info dictionary holds `info`
    pub fn pdf_with_info(info: &[(&str, &str)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if !info.is_empty() {
            let mut dict = lopdf::Dictionary::new();
            for (key, value) in info {
                dict.set(*key, Object::string_literal(*value));
            }
            let info_id = doc.add_object(dict);
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialise fixture");
        bytes
    }

    pub fn minimal_pdf() -> Vec<u8> {
        Self::pdf_with_info(&[
            ("Author", "Jane Doe"),
            ("Title", "Quarterly Draft"),
            ("Producer", "Fixture Writer"),
        ])
    }

    /// Has the PDF signature but no parseable structure
    pub fn malformed_pdf() -> Vec<u8> {
        b"%PDF-1.4\nthis is not a pdf body\n".to_vec()
    }

    /// Cross-reference section whose trailer `/Prev` points back at itself
    pub fn self_referencing_xref_pdf() -> Vec<u8> {
        b"%PDF-1.4\nxref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 /Prev 9 >>\nstartxref\n9\n%%EOF"
            .to_vec()
    }

    pub fn write(path: &Path, bytes: &[u8]) -> PathBuf {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(path, bytes).expect("write fixture");
        path.to_path_buf()
    }

    /// `n` PDFs named `file1.pdf`..`fileN.pdf`; indices in `broken` get malformed content
    pub fn batch(dir: &Path, n: usize, broken: &[usize]) -> Vec<PathBuf> {
        (1..=n)
            .map(|i| {
                let bytes = if broken.contains(&i) {
                    Self::malformed_pdf()
                } else {
                    Self::minimal_pdf()
                };
                Self::write(&dir.join(format!("file{}.pdf", i)), &bytes)
            })
            .collect()
    }

    /// Shell script standing in for qpdf
    #[cfg(unix)]
    pub fn fake_qpdf(dir: &Path, body: &str) -> PathBuf {
        Self::script(dir, "fake-qpdf", body)
    }

    /// Script named `qpdf`, for putting `dir` on a child process's `PATH`
    #[cfg(unix)]
    pub fn qpdf_on_path(dir: &Path, body: &str) -> PathBuf {
        Self::script(dir, "qpdf", body)
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::create_dir_all(dir).expect("create tool dir");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }
}
