use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::chat::InlineImage;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid png: {0}")]
    Image(#[from] image::ImageError),
}

/// A captured bitmap some part of the page wants to share into the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub png: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

impl Snapshot {
    /// Decodes the whole image, so only complete PNGs are accepted.
    pub fn from_png(png: Vec<u8>) -> Result<Self, SnapshotError> {
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            png: png.into(),
        })
    }

    pub fn to_inline_image(&self) -> InlineImage {
        InlineImage {
            base64_image: STANDARD.encode(&self.png),
            width: self.width,
            height: self.height,
        }
    }
}

/// Fan-out of shared snapshots to whichever chat flows are listening.
#[derive(Clone)]
pub struct SnapshotHub {
    tx: broadcast::Sender<Snapshot>,
}

impl SnapshotHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    /// Returns how many listeners got it.
    pub fn share(&self, snapshot: Snapshot) -> usize {
        tracing::debug!(width = snapshot.width, height = snapshot.height, "snapshot shared");
        self.tx.send(snapshot).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::new(width, height)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
