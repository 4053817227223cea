// 構造的圧縮: FlateDecode圧縮、孤立オブジェクト除去、リンク注釈除去

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId};

use crate::error::BudgetPdfError;

/// 全ページの `/Annots` から `/Subtype /Link` の注釈を除去する。
///
/// リンクは描画内容に影響しないため、サイズ削減のために削除する。
/// 注釈が空になったページからは `/Annots` キー自体を取り除く。
/// 戻り値は除去した注釈の数。
pub fn strip_link_annotations(doc: &mut Document) -> usize {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut removed = 0;

    for page_id in page_ids {
        let annots = {
            let Ok(page_dict) = doc.get_dictionary(page_id) else {
                continue;
            };
            match page_dict.get(b"Annots") {
                Ok(Object::Array(items)) => items.clone(),
                Ok(Object::Reference(id)) => {
                    match doc.get_object(*id).and_then(Object::as_array) {
                        Ok(items) => items.clone(),
                        Err(_) => continue,
                    }
                }
                _ => continue,
            }
        };

        let before = annots.len();
        let kept: Vec<Object> = annots
            .into_iter()
            .filter(|annot| !is_link_annotation(doc, annot))
            .collect();
        if kept.len() == before {
            continue;
        }
        removed += before - kept.len();

        if let Ok(page_dict) = doc.get_dictionary_mut(page_id) {
            if kept.is_empty() {
                page_dict.remove(b"Annots");
            } else {
                page_dict.set("Annots", kept);
            }
        }
    }

    removed
}

fn is_link_annotation(doc: &Document, annot: &Object) -> bool {
    let dict = match annot {
        Object::Reference(id) => match doc.get_dictionary(*id) {
            Ok(d) => d,
            Err(_) => return false,
        },
        Object::Dictionary(d) => d,
        _ => return false,
    };
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|subtype| subtype == b"Link")
}

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリーム（DCTDecodeのJPEG等）はスキップする。
pub fn compress_streams(doc: &mut Document) {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();

    for id in ids {
        let needs_compression = {
            let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
                continue;
            };
            stream.dict.get(b"Filter").is_err() && !stream.content.is_empty()
        };

        if needs_compression {
            let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
                continue;
            };

            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
            if encoder.write_all(&stream.content).is_err() {
                continue;
            }
            let Ok(compressed) = encoder.finish() else {
                continue;
            };

            // 圧縮で大きくなる場合は元のまま残す
            if compressed.len() >= stream.content.len() {
                continue;
            }
            stream.dict.set("Filter", "FlateDecode");
            stream.set_content(compressed);
        }
    }
}

/// 孤立オブジェクト（どこからも参照されていないオブジェクト）を除去する。
pub fn delete_unused_objects(doc: &mut Document) -> usize {
    doc.prune_objects().len()
}

/// 構造的圧縮の1パスを実行し、シリアライズ結果を返す。
///
/// 1パス目は再シリアライズのみ（孤立オブジェクト除去 + ストリーム圧縮）。
/// 2パス目以降はリンク注釈の除去も行う。`doc` への変更は次のパスに引き継がれる。
pub fn run_pass(doc: &mut Document, pass: u32) -> crate::error::Result<Vec<u8>> {
    if pass >= 2 {
        let links = strip_link_annotations(doc);
        tracing::debug!(pass, links, "link annotations stripped");
    }
    let pruned = delete_unused_objects(doc);
    compress_streams(doc);
    tracing::debug!(pass, pruned, "document re-serialized");

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| BudgetPdfError::encode(format!("PDF serialization failed: {e}")))?;
    Ok(buf)
}
