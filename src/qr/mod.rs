//! QR code helpers: decode an image, render to the terminal, write a PNG.

use std::path::Path;

use image::{ImageFormat, ImageReader, Luma};
use qrcode::render::unicode;
use qrcode::{EcLevel, QrCode};

/// QR errors
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("no QR code found in image")]
    NotFound,

    #[error("decode error: {0}")]
    Decode(String),
}

/// Read the text content of the QR code in the image at `path`.
///
/// The format is sniffed from the file contents, not the extension.
pub fn read_image_content(path: &Path) -> Result<String, QrError> {
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_luma8();

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| image.get_pixel(x as u32, y as u32).0[0],
    );

    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or(QrError::NotFound)?;
    let (_, content) = grid.decode().map_err(|e| QrError::Decode(e.to_string()))?;
    Ok(content)
}

/// Render `content` as a compact QR code made of block characters.
pub fn render_terminal(content: &str) -> Result<String, QrError> {
    let code = QrCode::new(content.as_bytes()).map_err(|e| QrError::Encode(e.to_string()))?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

/// Write `content` as a PNG QR code with low error correction.
pub fn write_png(path: &Path, content: &str) -> Result<(), QrError> {
    let code = QrCode::with_error_correction_level(content.as_bytes(), EcLevel::L)
        .map_err(|e| QrError::Encode(e.to_string()))?;
    let image = code.render::<Luma<u8>>().build();
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
