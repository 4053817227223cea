use crate::error::BudgetPdfError;

/// 固定ページ寸法と余白（単位はPDFポイント）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    width: f64,
    height: f64,
    margin: f64,
}

impl PageGeometry {
    /// US Letter (8.5 x 11 in), 20pt margin on each side.
    pub const LETTER: Self = Self {
        width: 612.0,
        height: 792.0,
        margin: 20.0,
    };

    pub fn new(width: f64, height: f64, margin: f64) -> crate::error::Result<Self> {
        if !(width.is_finite() && height.is_finite() && margin.is_finite()) {
            return Err(BudgetPdfError::config("page geometry must be finite"));
        }
        if margin < 0.0 {
            return Err(BudgetPdfError::config(format!(
                "page margin must not be negative, got {margin}"
            )));
        }
        if width - 2.0 * margin <= 0.0 || height - 2.0 * margin <= 0.0 {
            return Err(BudgetPdfError::config(format!(
                "margin {margin} leaves no printable area on a {width}x{height} page"
            )));
        }
        Ok(Self {
            width,
            height,
            margin,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// 余白を除いた描画可能領域 (width, height)。
    pub fn body(&self) -> (f64, f64) {
        (
            self.width - 2.0 * self.margin,
            self.height - 2.0 * self.margin,
        )
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::LETTER
    }
}

/// 1ページ上の画像配置。
///
/// 画像は縦横同一倍率で描画可能領域に収まるよう縮小され、ページ中央に置かれる。
/// 描画可能領域より小さい画像は拡大しない（scale = 1）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub scale: f64,
    /// 描画サイズ（ポイント）。
    pub width: f64,
    pub height: f64,
    /// ページ左下からのオフセット。
    pub x: f64,
    pub y: f64,
}

impl PageLayout {
    /// 画像のピクセル寸法からページ配置を計算する（1ピクセル = 1ポイント）。
    pub fn compute(
        geometry: &PageGeometry,
        image_width: u32,
        image_height: u32,
    ) -> crate::error::Result<Self> {
        if image_width == 0 || image_height == 0 {
            return Err(BudgetPdfError::layout(format!(
                "cannot place a {image_width}x{image_height} image"
            )));
        }

        let (body_w, body_h) = geometry.body();
        let img_w = f64::from(image_width);
        let img_h = f64::from(image_height);

        let scale = (body_w / img_w).min(body_h / img_h).min(1.0);
        let width = img_w * scale;
        let height = img_h * scale;

        Ok(Self {
            scale,
            width,
            height,
            x: (geometry.width() - width) / 2.0,
            y: (geometry.height() - height) / 2.0,
        })
    }
}
