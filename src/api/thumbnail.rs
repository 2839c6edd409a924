use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;

use super::client::{ApiError, Result};

const MAX_WIDTH: u32 = 320;
const MAX_HEIGHT: u32 = 180;

/// Decoded preview image, RGBA8, already scaled down for display.
#[derive(Clone)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ThumbnailClient {
    client: Client,
}

impl Default for ThumbnailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbnailClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<Thumbnail> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        decode(&body)
    }
}

fn decode(data: &[u8]) -> Result<Thumbnail> {
    let image = image::load_from_memory(data).map_err(|e| ApiError::Image(e.to_string()))?;
    let image = if image.width() > MAX_WIDTH || image.height() > MAX_HEIGHT {
        image.thumbnail(MAX_WIDTH, MAX_HEIGHT)
    } else {
        image
    };
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(Thumbnail {
        width,
        height,
        pixels: Bytes::from(rgba.into_raw()),
    })
}
