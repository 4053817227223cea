use lopdf::{Document, Object};

use crate::error::BudgetPdfError;

pub struct PdfReader {
    doc: Document,
}

impl PdfReader {
    /// メモリ上のPDFバイト列からPdfReaderを作成する。
    pub fn from_bytes(data: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(data)
            .map_err(|e| BudgetPdfError::decode(format!("failed to load PDF: {e}")))?;
        Ok(Self { doc })
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// 内部のlopdf Documentを取り出す。
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// 指定ページ(1-indexed)のコンテンツストリームをバイト列として返す。
    pub fn page_content_stream(&self, page_num: u32) -> crate::error::Result<Vec<u8>> {
        let page_id = self.get_page_id(page_num)?;
        self.doc
            .get_page_content(page_id)
            .map_err(|e| BudgetPdfError::decode(e.to_string()))
    }

    /// 指定ページ(1-indexed)のアノテーションのSubtype一覧を返す。
    pub fn page_annotation_subtypes(&self, page_num: u32) -> crate::error::Result<Vec<String>> {
        let page_id = self.get_page_id(page_num)?;
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| BudgetPdfError::decode(e.to_string()))?;

        let annots = match page_dict.get(b"Annots") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match self.doc.get_object(*id).and_then(Object::as_array) {
                Ok(items) => items.clone(),
                Err(_) => return Ok(Vec::new()),
            },
            _ => return Ok(Vec::new()),
        };

        let subtypes = annots
            .iter()
            .filter_map(|annot| {
                let dict = match annot {
                    Object::Reference(id) => self.doc.get_dictionary(*id).ok()?,
                    Object::Dictionary(d) => d,
                    _ => return None,
                };
                let subtype = dict.get(b"Subtype").and_then(Object::as_name).ok()?;
                Some(String::from_utf8_lossy(subtype).into_owned())
            })
            .collect();
        Ok(subtypes)
    }

    /// ページ番号(1-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_num: u32) -> crate::error::Result<lopdf::ObjectId> {
        let pages = self.doc.get_pages();
        pages
            .get(&page_num)
            .copied()
            .ok_or_else(|| BudgetPdfError::decode(format!("page {} not found", page_num)))
    }
}
