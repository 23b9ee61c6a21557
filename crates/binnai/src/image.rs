//! Decoding and saving generated images.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use thiserror::Error;

/// Error of [`decode_data_url`].
#[derive(Debug, Error)]
pub enum ImageError {
    /// The URL isn't a base64 `data:` URL.
    #[error("not a base64 data URL")]
    NotDataUrl,
    /// The payload isn't valid base64.
    #[error("invalid image payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// An image decoded from a `data:` URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// The declared media type, e.g. `image/png`.
    pub media_type: String,
    /// The raw image bytes.
    pub bytes: Vec<u8>,
}

/// Decodes a `data:<media type>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<DecodedImage, ImageError> {
    let rest = url.strip_prefix("data:").ok_or(ImageError::NotDataUrl)?;
    let (header, payload) =
        rest.split_once(',').ok_or(ImageError::NotDataUrl)?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or(ImageError::NotDataUrl)?;
    let bytes = STANDARD.decode(payload.trim())?;
    Ok(DecodedImage {
        media_type: media_type.to_owned(),
        bytes,
    })
}

/// Writes `image` into `dir` under a timestamped name, creating the
/// directory if needed. Returns the path of the new file.
pub fn save_to_dir(dir: &Path, image: &DecodedImage) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let extension = match image.media_type.as_str() {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    };
    let stem = format!("binnai-{}", Local::now().format("%Y%m%d-%H%M%S%.3f"));

    let mut path = dir.join(format!("{stem}.{extension}"));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{suffix}.{extension}"));
        suffix += 1;
    }
    fs::write(&path, &image.bytes)?;
    debug!("saved {} bytes to {}", image.bytes.len(), path.display());
    Ok(path)
}
