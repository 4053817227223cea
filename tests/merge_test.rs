// PDF結合テスト
//
// テスト用PDFはすべてlopdfで動的に生成する。

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use budget_pdf::error::BudgetPdfError;
use budget_pdf::pdf::merge::merge_documents;
use budget_pdf::pdf::reader::PdfReader;
use budget_pdf::raster::asset::Encoding;

/// Build a PDF whose pages are tagged with a comment `% <tag> page <n>` in
/// their content stream. MediaBox lives on the Pages node only, so pages
/// inherit it.
fn create_tagged_pdf(tag: &str, num_pages: usize, media_box: [i64; 4]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=num_pages {
        let content = format!("% {tag} page {n}\nq Q").into_bytes();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => num_pages as i64,
        "MediaBox" => media_box.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        "Resources" => dictionary! {},
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

/// Add a one-item outline pointing at page 1 and an `/Info` dictionary padded
/// with `padding` bytes to a PDF produced by [`create_tagged_pdf`].
fn with_outline_and_info(pdf: &[u8], title: &str, padding: usize) -> Vec<u8> {
    let mut doc = Document::load_mem(pdf).expect("load test PDF");
    let first_page = *doc.get_pages().get(&1).expect("page 1");

    let outlines_id = doc.new_object_id();
    let item_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Parent" => outlines_id,
        "Dest" => vec![first_page.into(), "Fit".into()],
    });
    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => item_id,
            "Last" => item_id,
            "Count" => 1,
        }),
    );
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .expect("catalog reference");
    doc.get_dictionary_mut(catalog_id)
        .expect("catalog")
        .set("Outlines", outlines_id);

    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::string_literal("x".repeat(padding)),
    });
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

fn outline_title(doc: &Document, id: ObjectId) -> String {
    let item = doc.get_dictionary(id).expect("outline item");
    let title = item.get(b"Title").and_then(Object::as_str).expect("title");
    String::from_utf8_lossy(title).into_owned()
}

fn media_box(reader: &PdfReader, page: u32) -> Vec<i64> {
    let doc = reader.document();
    let page_id = *doc.get_pages().get(&page).expect("page exists");
    doc.get_dictionary(page_id)
        .and_then(|d| d.get(b"MediaBox"))
        .and_then(Object::as_array)
        .expect("MediaBox on the page itself")
        .iter()
        .map(|v| v.as_i64().expect("integer coordinate"))
        .collect()
}

fn page_tag(reader: &PdfReader, page: u32) -> String {
    let content = reader.page_content_stream(page).expect("page content");
    String::from_utf8_lossy(&content)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn test_merge_preserves_input_order() {
    let a = create_tagged_pdf("a", 1, [0, 0, 612, 792]);
    let b = create_tagged_pdf("b", 2, [0, 0, 612, 792]);
    let c = create_tagged_pdf("c", 1, [0, 0, 612, 792]);

    let merged = merge_documents(&[a, b, c]).expect("merge");
    assert_eq!(merged.encoding(), Encoding::Pdf { image_quality: None });

    let reader = PdfReader::from_bytes(merged.bytes()).expect("valid merged PDF");
    assert_eq!(reader.page_count(), 4);
    assert_eq!(page_tag(&reader, 1), "% a page 1");
    assert_eq!(page_tag(&reader, 2), "% b page 1");
    assert_eq!(page_tag(&reader, 3), "% b page 2");
    assert_eq!(page_tag(&reader, 4), "% c page 1");
}

#[test]
fn test_merge_keeps_inherited_media_box() {
    let letter = create_tagged_pdf("letter", 1, [0, 0, 612, 792]);
    let a4 = create_tagged_pdf("a4", 1, [0, 0, 595, 842]);

    let merged = merge_documents(&[letter, a4]).expect("merge");
    let reader = PdfReader::from_bytes(merged.bytes()).expect("valid merged PDF");

    assert_eq!(media_box(&reader, 1), vec![0, 0, 612, 792]);
    assert_eq!(media_box(&reader, 2), vec![0, 0, 595, 842]);
}

#[test]
fn test_merge_single_document() {
    let only = create_tagged_pdf("only", 3, [0, 0, 612, 792]);
    let merged = merge_documents(&[only]).expect("merge");
    let reader = PdfReader::from_bytes(merged.bytes()).expect("valid merged PDF");
    assert_eq!(reader.page_count(), 3);
}

#[test]
fn test_merge_has_single_catalog_and_page_tree() {
    let a = create_tagged_pdf("a", 2, [0, 0, 612, 792]);
    let b = create_tagged_pdf("b", 2, [0, 0, 612, 792]);
    let merged = merge_documents(&[a, b]).expect("merge");
    let reader = PdfReader::from_bytes(merged.bytes()).expect("valid merged PDF");

    let count_type = |name: &[u8]| {
        reader
            .document()
            .objects
            .values()
            .filter(|obj| {
                obj.as_dict()
                    .and_then(|d| d.get(b"Type"))
                    .and_then(Object::as_name)
                    .is_ok_and(|t| t == name)
            })
            .count()
    };
    assert_eq!(count_type(b"Catalog"), 1);
    assert_eq!(count_type(b"Pages"), 1);
}

#[test]
fn test_merge_reports_first_undecodable_document() {
    let good = create_tagged_pdf("good", 1, [0, 0, 612, 792]);
    let docs = vec![good, b"this is not a pdf".to_vec(), b"also broken".to_vec()];

    let err = merge_documents(&docs).expect_err("should fail");
    match &err {
        BudgetPdfError::Input { index, source } => {
            assert_eq!(*index, 2);
            assert!(matches!(**source, BudgetPdfError::DecodeError(_)));
        }
        other => panic!("expected Input error, got {other:?}"),
    }
    assert!(err.is_client_fault());
}

#[test]
fn test_merge_empty_input() {
    let docs: Vec<Vec<u8>> = Vec::new();
    let result = merge_documents(&docs);
    assert!(matches!(result, Err(BudgetPdfError::InvalidInput(_))));
}

#[test]
fn test_merge_chains_outlines_in_input_order() {
    let a = with_outline_and_info(&create_tagged_pdf("a", 1, [0, 0, 612, 792]), "Chapter A", 0);
    let b = with_outline_and_info(&create_tagged_pdf("b", 2, [0, 0, 612, 792]), "Chapter B", 0);

    let merged = merge_documents(&[a, b]).expect("merge");
    let reader = PdfReader::from_bytes(merged.bytes()).expect("valid merged PDF");
    let doc = reader.document();

    let outlines_id = doc
        .catalog()
        .and_then(|c| c.get(b"Outlines"))
        .and_then(Object::as_reference)
        .expect("merged catalog keeps outlines");
    let outlines = doc.get_dictionary(outlines_id).expect("outlines dict");
    assert_eq!(outlines.get(b"Count").and_then(Object::as_i64).expect("count"), 2);

    let first = outlines.get(b"First").and_then(Object::as_reference).expect("first");
    let last = outlines.get(b"Last").and_then(Object::as_reference).expect("last");
    assert_eq!(outline_title(doc, first), "Chapter A");
    assert_eq!(outline_title(doc, last), "Chapter B");

    let first_item = doc.get_dictionary(first).expect("first item");
    assert_eq!(
        first_item.get(b"Next").and_then(Object::as_reference).expect("next"),
        last
    );
    for id in [first, last] {
        let parent = doc
            .get_dictionary(id)
            .and_then(|d| d.get(b"Parent"))
            .and_then(Object::as_reference)
            .expect("parent");
        assert_eq!(parent, outlines_id);
    }

    // 2つ目のしおりは入力bの1ページ目（結合後の2ページ目）を指す
    let dest = doc
        .get_dictionary(last)
        .and_then(|d| d.get(b"Dest"))
        .and_then(Object::as_array)
        .expect("dest");
    let page_two = *doc.get_pages().get(&2).expect("page 2");
    assert_eq!(dest[0].as_reference().expect("page ref"), page_two);
}

#[test]
fn test_merge_drops_objects_only_reachable_from_old_catalogs() {
    let padding = 5_000;
    let a = with_outline_and_info(&create_tagged_pdf("a", 1, [0, 0, 612, 792]), "A", padding);
    let b = with_outline_and_info(&create_tagged_pdf("b", 1, [0, 0, 612, 792]), "B", padding);

    let merged = merge_documents(&[a, b]).expect("merge");
    // 旧Infoの詰め物は1つも残らない
    assert!(
        merged.len() < padding,
        "merged PDF still carries unreachable data: {} bytes",
        merged.len()
    );

    let reader = PdfReader::from_bytes(merged.bytes()).expect("valid merged PDF");
    let outlines_dicts = reader
        .document()
        .objects
        .values()
        .filter(|obj| {
            obj.as_dict()
                .and_then(|d| d.get(b"Type"))
                .and_then(Object::as_name)
                .is_ok_and(|t| t == b"Outlines")
        })
        .count();
    assert_eq!(outlines_dicts, 1);
}
