//! Compression API.

use crate::client::ConvertoClient;
use crate::error::{Error, Result};
use crate::types::{AudioCompressRequest, Download, ImageCompressRequest, VideoCompressRequest};

/// Compression API client.
///
/// Each call sends one batch and returns whatever the backend produced: a
/// single file or a zip of several.
pub struct CompressApi {
    client: ConvertoClient,
}

impl CompressApi {
    pub(crate) fn new(client: ConvertoClient) -> Self {
        Self { client }
    }

    /// Recompress images at `quality` percent (1-100).
    pub async fn image(&self, input_paths: &[String], quality: u8) -> Result<Download> {
        ensure_inputs(input_paths)?;
        if !(1..=100).contains(&quality) {
            return Err(Error::Config(format!(
                "image quality must be between 1 and 100, got {}",
                quality
            )));
        }
        let body = ImageCompressRequest {
            input_paths,
            quality,
        };
        self.client.post_for_download("compress/image", &body).await
    }

    /// Re-encode audio at a bitrate such as `"64k"`.
    pub async fn audio(&self, input_paths: &[String], bitrate: &str) -> Result<Download> {
        ensure_inputs(input_paths)?;
        let body = AudioCompressRequest {
            input_paths,
            bitrate,
        };
        self.client.post_for_download("compress/audio", &body).await
    }

    /// Re-encode video with a quality preset such as `"low"`.
    pub async fn video(&self, input_paths: &[String], quality: &str) -> Result<Download> {
        ensure_inputs(input_paths)?;
        let body = VideoCompressRequest {
            input_paths,
            quality,
        };
        self.client.post_for_download("compress/video", &body).await
    }
}

pub(super) fn ensure_inputs(input_paths: &[String]) -> Result<()> {
    if input_paths.is_empty() {
        return Err(Error::Config("no input files".to_string()));
    }
    Ok(())
}
