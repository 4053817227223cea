use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument};

use super::reader::PdfReader;
use crate::error::BudgetPdfError;
use crate::raster::asset::EncodedAsset;

/// ページツリーの親から継承されうるページ属性。
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// しおりの兄弟リストを辿る上限（循環参照対策）。
const MAX_OUTLINE_ITEMS: usize = 100_000;

/// 複数のPDFを入力順に連結し、1つのページツリーを持つPDFにする。
///
/// 読み込めないPDFがあれば、最初のものを `Input { index, DecodeError }` として返す。
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn merge_documents<B: AsRef<[u8]>>(documents: &[B]) -> crate::error::Result<EncodedAsset> {
    if documents.is_empty() {
        return Err(BudgetPdfError::invalid_input("no documents to merge"));
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for (i, data) in documents.iter().enumerate() {
        let reader = PdfReader::from_bytes(data.as_ref()).map_err(|e| e.at_input(i + 1))?;
        loaded.push(reader.into_document());
    }

    let mut merged = merge_loaded(loaded)?;

    let mut buf = Vec::new();
    merged
        .save_to(&mut buf)
        .map_err(|e| BudgetPdfError::encode(format!("failed to serialise merged PDF: {e}")))?;

    info!(bytes = buf.len(), "documents merged");
    Ok(EncodedAsset::pdf(buf, None))
}

/// 読み込み済みドキュメント群を1つのDocumentに統合する。
fn merge_loaded(documents: Vec<Document>) -> crate::error::Result<Document> {
    let version = documents
        .iter()
        .map(|d| d.version.clone())
        .max()
        .unwrap_or_else(|| "1.5".to_string());

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut outline_roots: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        // get_pages() はページ番号順のBTreeMap
        let ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &ids {
            push_down_inherited_attributes(&mut doc, page_id);
        }
        if let Ok(root) = doc
            .catalog()
            .and_then(|catalog| catalog.get(b"Outlines"))
            .and_then(Object::as_reference)
        {
            outline_roots.push(root);
        }
        debug!(pages = ids.len(), "document pages collected");
        page_ids.extend(ids);
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version(version);
    merged.objects = objects
        .into_iter()
        .filter(|(_, object)| !is_tree_root(object))
        .collect();
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    for &page_id in &page_ids {
        let page = merged.get_dictionary_mut(page_id).map_err(|e| {
            BudgetPdfError::decode(format!("page object {page_id:?} missing after merge: {e}"))
        })?;
        page.set("Parent", pages_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    let mut pages = Dictionary::new();
    pages.set("Type", "Pages");
    pages.set("Count", kids.len() as i64);
    pages.set("Kids", kids);
    merged.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", "Catalog");
    catalog.set("Pages", pages_id);
    if let Some(outlines_id) = chain_outlines(&mut merged, &outline_roots) {
        catalog.set("Outlines", outlines_id);
    }
    let catalog_id = merged.add_object(catalog);
    merged.trailer.set("Root", catalog_id);

    // 旧Catalogからしか辿れなかったオブジェクト（Info、Names、AcroForm等）を捨てる
    let pruned = merged.prune_objects().len();
    debug!(pruned, "unreachable objects removed");

    Ok(merged)
}

/// 各入力のしおりのトップレベル項目を入力順に1本の兄弟リストへ繋ぎ、
/// 新しい `/Outlines` 辞書のIDを返す。しおりを持つ入力がなければ `None`。
fn chain_outlines(merged: &mut Document, roots: &[ObjectId]) -> Option<ObjectId> {
    let chains: Vec<(ObjectId, ObjectId)> = roots
        .iter()
        .filter_map(|&root| {
            let dict = merged.get_dictionary(root).ok()?;
            let first = dict.get(b"First").and_then(Object::as_reference).ok()?;
            let last = dict.get(b"Last").and_then(Object::as_reference).ok()?;
            Some((first, last))
        })
        .collect();
    let (&(first, _), &(_, last)) = (chains.first()?, chains.last()?);

    let outlines_id = merged.new_object_id();
    let mut count: i64 = 0;
    for (i, &(chain_first, chain_last)) in chains.iter().enumerate() {
        let mut current = Some(chain_first);
        for _ in 0..MAX_OUTLINE_ITEMS {
            let Some(id) = current else { break };
            let Ok(item) = merged.get_dictionary_mut(id) else {
                break;
            };
            item.set("Parent", outlines_id);
            count += 1;
            if id == chain_last {
                break;
            }
            current = item.get(b"Next").and_then(Object::as_reference).ok();
        }

        if let Some(&(next_first, _)) = chains.get(i + 1) {
            if let Ok(item) = merged.get_dictionary_mut(chain_last) {
                item.set("Next", next_first);
            }
            if let Ok(item) = merged.get_dictionary_mut(next_first) {
                item.set("Prev", chain_last);
            }
        }
    }

    let mut outlines = Dictionary::new();
    outlines.set("Type", "Outlines");
    outlines.set("First", first);
    outlines.set("Last", last);
    outlines.set("Count", count);
    merged.objects.insert(outlines_id, Object::Dictionary(outlines));
    debug!(documents = chains.len(), items = count, "outlines chained");
    Some(outlines_id)
}

/// 元ドキュメントの Catalog と Pages ノードは統合後に作り直すため除外する。
fn is_tree_root(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Catalog") | Ok(b"Pages")
    )
}

/// 親Pagesノードから継承している属性をページ辞書に直接コピーする。
fn push_down_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();

    {
        let Ok(page) = doc.get_dictionary(page_id) else {
            return;
        };
        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = find_inherited(doc, page, key) {
                inherited.push((key, value));
            }
        }
    }

    if inherited.is_empty() {
        return;
    }
    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

fn find_inherited(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = dict;
    // 循環参照に備えて深さを制限する
    for _ in 0..64 {
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
    }
    None
}
