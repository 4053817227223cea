// 構造的圧縮サーチテスト

use lopdf::{Document, Object, Stream, dictionary};

use budget_pdf::error::BudgetPdfError;
use budget_pdf::pipeline::compression_search::{
    CompressionOutcome, compress_under_budget, search,
};

/// A multi-page PDF with uncompressed content and many link annotations.
fn create_linked_pdf(num_pages: usize, links_per_page: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for n in 0..num_pages {
        let annots: Vec<Object> = (0..links_per_page)
            .map(|i| {
                doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => "Link",
                    "Rect" => vec![0.into(), (i as i64).into(), 100.into(), 20.into()],
                    "A" => dictionary! {
                        "S" => "URI",
                        "URI" => Object::string_literal(format!("https://example.com/page/{n}/link/{i}")),
                    },
                })
                .into()
            })
            .collect();

        let content = format!("BT /F1 12 Tf 72 720 Td (page {n}) Tj ET\n").repeat(200);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Annots" => annots,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => num_pages as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

// ============================================================
// 1. 探索ループ（PDF非依存）
// ============================================================

#[test]
fn test_stops_at_first_fitting_pass() {
    let mut calls = Vec::new();
    let outcome = search(10, 100, |pass| {
        calls.push(pass);
        Ok(vec![0u8; 400 - 100 * pass as usize])
    })
    .expect("search");

    assert_eq!(calls, vec![1, 2, 3]);
    match outcome {
        CompressionOutcome::Fitted { asset, passes } => {
            assert_eq!(passes, 3);
            assert_eq!(asset.len(), 100);
        }
        other => panic!("expected Fitted, got {other:?}"),
    }
}

#[test]
fn test_exhaustion_returns_smallest_attempt() {
    // サイズは単調に減らない: 4パス目が最小
    let sizes = [500usize, 450, 470, 300, 320, 330, 340, 350, 360, 370];
    let mut calls = 0u32;
    let outcome = search(10, 10, |pass| {
        calls += 1;
        Ok(vec![0u8; sizes[pass as usize - 1]])
    })
    .expect("best effort is not an error");

    assert_eq!(calls, 10);
    assert!(!outcome.is_fitted());
    assert_eq!(outcome.passes(), 10);
    assert_eq!(outcome.asset().len(), 300);
    assert!(outcome.asset().len() <= sizes[0]);
}

#[test]
fn test_pass_error_propagates() {
    let result = search(10, 10, |pass| {
        if pass == 2 {
            Err(BudgetPdfError::encode("serialization failed"))
        } else {
            Ok(vec![0u8; 100])
        }
    });
    assert!(matches!(result, Err(BudgetPdfError::EncodeError(_))));
}

#[test]
fn test_zero_passes_is_config_error() {
    let result = search(0, 10, |_| Ok(Vec::new()));
    assert!(matches!(result, Err(BudgetPdfError::ConfigError(_))));
}

// ============================================================
// 2. 実PDFでの圧縮
// ============================================================

#[test]
fn test_generous_budget_fits_on_first_pass() {
    let pdf = create_linked_pdf(2, 5);
    let outcome = compress_under_budget(&pdf, pdf.len(), 10).expect("compress");
    assert!(outcome.is_fitted());
    assert_eq!(outcome.passes(), 1);
    assert!(outcome.asset().bytes().starts_with(b"%PDF-"));
}

#[test]
fn test_stripping_links_reaches_budget_on_second_pass() {
    let pdf = create_linked_pdf(3, 40);
    let first = compress_under_budget(&pdf, usize::MAX, 10)
        .expect("compress")
        .into_asset();
    let budget = first.len() - 1;

    let outcome = compress_under_budget(&pdf, budget, 10).expect("compress");
    assert!(outcome.is_fitted(), "link removal should fit: {outcome:?}");
    assert_eq!(outcome.passes(), 2);
    assert!(outcome.asset().len() <= budget);
}

#[test]
fn test_impossible_budget_is_best_effort() {
    let pdf = create_linked_pdf(2, 10);
    let first_pass = compress_under_budget(&pdf, usize::MAX, 10)
        .expect("compress")
        .into_asset()
        .len();

    let outcome = compress_under_budget(&pdf, 1, 10).expect("best effort");
    match &outcome {
        CompressionOutcome::BestEffort { asset, passes } => {
            assert_eq!(*passes, 10);
            assert!(asset.len() <= first_pass);
            assert!(asset.len() > 1);
        }
        other => panic!("expected BestEffort, got {other:?}"),
    }
}

#[test]
fn test_undecodable_input_is_decode_error() {
    let result = compress_under_budget(b"not a pdf at all", 1_000, 10);
    assert!(matches!(result, Err(BudgetPdfError::DecodeError(_))));
}
