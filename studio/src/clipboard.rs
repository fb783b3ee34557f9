//! Copying the displayed image to the system clipboard.

use std::borrow::Cow;

use arboard::{Clipboard, ImageData};
use log::{error, info};

use crate::session::ImageSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CopyError {
    #[error("Failed to decode image for the clipboard: {0}")]
    Decode(String),

    #[error("Failed to access clipboard: {0}")]
    ClipboardAccessFailed(String),

    #[error("Failed to set clipboard image: {0}")]
    ClipboardSetFailed(String),
}

impl CopyError {
    pub fn user_message(&self) -> String {
        "Copy failed - try 'save' instead".to_string()
    }
}

/// Decode the image into the RGBA buffer the clipboard takes
pub fn clipboard_image(image: &ImageSnapshot) -> Result<ImageData<'static>, CopyError> {
    let rgba = image::load_from_memory(&image.bytes)
        .map_err(|e| CopyError::Decode(e.to_string()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageData {
        width: width as usize,
        height: height as usize,
        bytes: Cow::Owned(rgba.into_raw()),
    })
}

/// Put the image on the system clipboard
pub fn copy_image(image: &ImageSnapshot) -> Result<(), CopyError> {
    let data = clipboard_image(image)?;
    let (width, height) = (data.width, data.height);

    let mut clipboard = Clipboard::new().map_err(|e| {
        error!("Failed to access clipboard: {}", e);
        CopyError::ClipboardAccessFailed(e.to_string())
    })?;
    clipboard.set_image(data).map_err(|e| {
        error!("Failed to set clipboard image: {}", e);
        CopyError::ClipboardSetFailed(e.to_string())
    })?;

    info!("Copied image {} ({}x{}) to clipboard", image.id, width, height);
    Ok(())
}
