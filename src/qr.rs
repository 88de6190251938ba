//! QR artifacts pointing at an item's detail page.

use image::{ImageFormat, Luma};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use qrcode::{EcLevel, QrCode};
use sea_orm::{ActiveModelTrait, ConnectionTrait, IntoActiveModel, Set};
use std::io::Cursor;
use std::net::SocketAddr;
use tracing::warn;

use crate::entities::item;
use crate::error::StockResult;

/// Pixels per QR module.
pub const MODULE_SIZE: u32 = 10;

/// Characters escaped when a code is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("cannot encode QR data: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("cannot write QR image: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders `data` as a PNG with the lowest error-correction level and the
/// standard four-module border.
pub fn render_png(data: &str, module_size: u32) -> Result<Vec<u8>, QrError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)?;
    let image = code
        .render::<Luma<u8>>()
        .module_dimensions(module_size, module_size)
        .quiet_zone(true)
        .build();

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Best-effort `http://<local ip>:<port>`, `http://localhost:<port>` when the
/// address cannot be determined.
pub fn detect_base_url(port: u16) -> String {
    match local_ip_address::local_ip() {
        Ok(ip) => format!("http://{}", SocketAddr::new(ip, port)),
        Err(err) => {
            warn!(error = %err, "cannot determine local address, using localhost");
            format!("http://localhost:{port}")
        }
    }
}

#[derive(Debug, Clone)]
pub struct QrGenerator {
    base_url: String,
    module_size: u32,
}

impl QrGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            module_size: MODULE_SIZE,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn target_url(&self, code: &str) -> String {
        format!(
            "{}/stock/items/{}",
            self.base_url,
            utf8_percent_encode(code, PATH_SEGMENT)
        )
    }

    pub fn render(&self, data: &str) -> Result<Vec<u8>, QrError> {
        render_png(data, self.module_size)
    }

    /// Stores a QR artifact on `item` unless it already has one.
    pub async fn attach<C: ConnectionTrait>(
        &self,
        db: &C,
        item: item::Model,
    ) -> StockResult<item::Model> {
        if item.qr_code.is_some() {
            return Ok(item);
        }
        let target = self.target_url(&item.code);
        let png = self.render(&target)?;

        let mut active = item.into_active_model();
        active.qr_target = Set(Some(target));
        active.qr_code = Set(Some(png));
        Ok(active.update(db).await?)
    }
}
