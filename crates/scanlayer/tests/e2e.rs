//! OCR followed by assembly over the same tree.

mod common;

use common::harness::{fake_engine, pdf_page_widths};
use common::TestHarness;
use scanlayer::{run_assembly, run_ocr};

#[test]
fn test_ocr_then_assembly() {
    let mut harness = TestHarness::new();
    harness.workers = 3;
    for doc in ["letters", "ledger"] {
        for page in 1..=4u32 {
            harness.write_png(doc, &format!("page_{:04}.png", page), 20 + page, 16);
        }
    }

    let ocr = run_ocr(&harness.ocr_config(), fake_engine, &TestHarness::no_cancel()).unwrap();
    assert_eq!(ocr.processed, 8);
    assert_eq!(ocr.failed, 0);
    assert!(ocr.errors.is_empty());

    let assembly = run_assembly(&harness.assembly_config(), &TestHarness::no_cancel()).unwrap();
    assert_eq!(assembly.processed, 2);
    assert_eq!(assembly.pages, 8);
    assert!(assembly.errors.is_empty());

    for doc in ["letters", "ledger"] {
        assert_eq!(pdf_page_widths(&harness.pdf_path(doc)), vec![21, 22, 23, 24]);
    }
}

#[test]
fn test_enhanced_output_is_saved_beside_pages() {
    let harness = TestHarness::new();
    harness.write_png("doc", "page_0001.png", 24, 24);
    harness.write_result("doc", "page_0001", &["text"]);

    let mut config = harness.assembly_config();
    config.options.enhance = true;
    config.options.save_enhanced = true;

    let summary = run_assembly(&config, &TestHarness::no_cancel()).unwrap();

    assert_eq!(summary.pages, 1);
    assert!(harness
        .output_root
        .join("doc_searchable_enhanced.pdf")
        .exists());
    assert!(harness
        .image_root
        .join("doc_enhanced")
        .join("page_0001.png")
        .exists());
}
