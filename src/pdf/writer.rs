use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument};

use super::layout::{PageGeometry, PageLayout};
use crate::error::BudgetPdfError;
use crate::raster::ColorModel;
use crate::raster::asset::{EncodedAsset, Encoding, QualityLevel};
use crate::raster::jpeg::{component_count, read_header};

/// ページ内で画像XObjectを参照するリソース名。
const IMAGE_NAME: &str = "Im0";

/// JPEG画像を1ページずつ配置したPDFを構築する。
pub struct ImagePageWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    geometry: PageGeometry,
}

impl ImagePageWriter {
    pub fn new(geometry: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            geometry,
        }
    }

    /// JPEGバイト列をそのまま DCTDecode の画像XObjectとして追加する。
    ///
    /// 受け付けるのは8bitのRGBとグレースケールのみ。それ以外は LayoutError。
    /// 戻り値はXObjectのオブジェクトID。
    pub fn add_jpeg_xobject(
        &mut self,
        jpeg_data: &[u8],
        width: u32,
        height: u32,
        color_model: ColorModel,
    ) -> crate::error::Result<ObjectId> {
        let color_space = match color_model {
            ColorModel::Rgb => "DeviceRGB",
            ColorModel::Luma => "DeviceGray",
            other => {
                return Err(BudgetPdfError::layout(format!(
                    "cannot embed a {other:?} JPEG; expected 8-bit RGB or grayscale"
                )));
            }
        };
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let stream = Stream::new(dict, jpeg_data.to_vec());
        Ok(self.doc.add_object(Object::Stream(stream)))
    }

    /// 配置に従って画像を描画するコンテンツストリームを生成する。
    ///
    /// `q <w> 0 0 <h> <x> <y> cm /<name> Do Q`
    pub fn build_image_content_stream(name: &str, layout: &PageLayout) -> Vec<u8> {
        format!(
            "q {:.3} 0 0 {:.3} {:.3} {:.3} cm /{name} Do Q",
            layout.width, layout.height, layout.x, layout.y
        )
        .into_bytes()
    }

    /// JPEG画像1枚を中央配置したページを追加する。
    ///
    /// 画像ヘッダから寸法を読めない場合は LayoutError を返す。
    pub fn write_image_page(&mut self, jpeg_data: &[u8]) -> crate::error::Result<ObjectId> {
        // CMYKのJPEGはヘッダ上RGBとして報告されるため、フレームヘッダで判定する
        if component_count(jpeg_data) == Some(4) {
            return Err(BudgetPdfError::layout(
                "cannot embed a 4-component (CMYK) JPEG; expected 8-bit RGB or grayscale",
            ));
        }
        let header = read_header(jpeg_data).map_err(|e| {
            BudgetPdfError::layout(format!("image dimensions unavailable: {e}"))
        })?;
        let layout = PageLayout::compute(&self.geometry, header.width, header.height)?;

        let image_id =
            self.add_jpeg_xobject(jpeg_data, header.width, header.height, header.color_model)?;

        let mut xobject_dict = Dictionary::new();
        xobject_dict.set(IMAGE_NAME, Object::Reference(image_id));
        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobject_dict),
        });

        let content_bytes = Self::build_image_content_stream(IMAGE_NAME, &layout);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content_bytes)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.geometry.width() as f32),
                Object::Real(self.geometry.height() as f32),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());

        debug!(
            page = self.kids.len(),
            scale = layout.scale,
            x = layout.x,
            y = layout.y,
            "image page written"
        );
        Ok(page_id)
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// ページツリーとCatalogを確定し、PDFドキュメントをバイト列として出力する。
    pub fn save_to_bytes(mut self) -> crate::error::Result<Vec<u8>> {
        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.kids.len() as i64,
            "Kids" => self.kids,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| BudgetPdfError::encode(format!("PDF serialization failed: {e}")))?;
        Ok(buf)
    }
}

/// Lays out canonical JPEGs one per page on a fixed page geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentAssembler {
    geometry: PageGeometry,
}

impl DocumentAssembler {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Build a PDF with one centered page per image, in input order.
    ///
    /// Only 8-bit RGB or grayscale JPEGs (the normalizer's output) are
    /// accepted. The first image that is unreadable or in another colour
    /// layout aborts assembly with a [`BudgetPdfError::LayoutError`]
    /// attributed to that image.
    #[instrument(skip_all, fields(images = images.len()))]
    pub fn assemble(&self, images: &[EncodedAsset]) -> crate::error::Result<EncodedAsset> {
        if images.is_empty() {
            return Err(BudgetPdfError::invalid_input(
                "cannot assemble a document without images",
            ));
        }

        let mut writer = ImagePageWriter::new(self.geometry);
        for (i, image) in images.iter().enumerate() {
            writer
                .write_image_page(image.bytes())
                .map_err(|e| e.at_input(i + 1))?;
        }

        let bytes = writer.save_to_bytes()?;
        debug!(bytes = bytes.len(), "document assembled");
        Ok(EncodedAsset::pdf(bytes, shared_quality(images)))
    }
}

/// The JPEG quality common to every image, if they all share one.
fn shared_quality(images: &[EncodedAsset]) -> Option<QualityLevel> {
    let mut qualities = images.iter().map(|image| match image.encoding() {
        Encoding::Jpeg(q) => Some(q),
        Encoding::Pdf { .. } => None,
    });
    let first = qualities.next().flatten()?;
    qualities.all(|q| q == Some(first)).then_some(first)
}
