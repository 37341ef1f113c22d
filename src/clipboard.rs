use std::borrow::Cow;

use anyhow::{anyhow, Context, Result};
use arboard::Clipboard;
use image::{DynamicImage, RgbaImage};

/// Reads an image from the system clipboard. Returns `None` when the
/// clipboard holds no image.
pub fn read_image_from_clipboard() -> Result<Option<DynamicImage>> {
    let mut clipboard = Clipboard::new().context("cannot initialize clipboard")?;
    let image = match clipboard.get_image() {
        Ok(data) => data,
        Err(_) => return Ok(None),
    };

    let width = image.width as u32;
    let height = image.height as u32;
    let rgba = RgbaImage::from_raw(width, height, image.bytes.into_owned())
        .ok_or_else(|| anyhow!("clipboard image has invalid shape"))?;

    Ok(Some(DynamicImage::ImageRgba8(rgba)))
}

pub fn write_image_to_clipboard(image: &RgbaImage) -> Result<()> {
    let mut clipboard = Clipboard::new().context("cannot initialize clipboard")?;
    clipboard
        .set_image(arboard::ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: Cow::Borrowed(image.as_raw()),
        })
        .context("cannot write image to clipboard")
}
