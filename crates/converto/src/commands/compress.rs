//! Compress command - image, audio and video compression.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};

use converto_client::{DEFAULT_AUDIO_BITRATE, DEFAULT_IMAGE_QUALITY, DEFAULT_VIDEO_QUALITY};

use super::{
    Context, extract_download, input_paths, report_extracted, report_saved, save_download, spinner,
};

/// Arguments for the compress command.
#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Kind of media
    #[arg(value_enum)]
    pub kind: MediaKind,

    /// Files to compress
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Image quality 1-100, or video preset (low, medium, high)
    #[arg(long)]
    pub quality: Option<String>,

    /// Audio bitrate (e.g. 64k, 128k)
    #[arg(long)]
    pub bitrate: Option<String>,

    /// Output file (default: name chosen by the backend)
    #[arg(short, long, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Save results as separate files in this directory, unpacking zips
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// Run the compress command.
pub async fn run(args: CompressArgs, ctx: &Context) -> Result<()> {
    let paths = input_paths(&args.files)?;
    let client = ctx.client().await?;
    ctx.require_auth(&client)?;
    let api = client.compress();

    let bar = spinner(ctx, format!("Compressing {} file(s)", paths.len()));
    let result = match args.kind {
        MediaKind::Image => {
            let quality = image_quality(args.quality.as_deref())?;
            api.image(&paths, quality).await
        }
        MediaKind::Audio => {
            let bitrate = args.bitrate.as_deref().unwrap_or(DEFAULT_AUDIO_BITRATE);
            api.audio(&paths, bitrate).await
        }
        MediaKind::Video => {
            let quality = args.quality.as_deref().unwrap_or(DEFAULT_VIDEO_QUALITY);
            api.video(&paths, quality).await
        }
    };
    bar.finish_and_clear();
    let download = result.context("Compression failed")?;

    let fallback = if download.is_zip() {
        "compressed.zip".to_string()
    } else {
        compressed_name(&args.files[0])
    };
    if let Some(dir) = args.output_dir {
        let files = extract_download(&download, &dir, &fallback)?;
        return report_extracted(ctx, &dir, &files);
    }
    let path = save_download(&download, args.output.as_deref(), &fallback)?;
    report_saved(ctx, &path, download.data.len())
}

fn image_quality(value: Option<&str>) -> Result<u8> {
    match value {
        None => Ok(DEFAULT_IMAGE_QUALITY),
        Some(v) => v
            .parse::<u8>()
            .ok()
            .filter(|q| (1..=100).contains(q))
            .ok_or_else(|| anyhow::anyhow!("Image quality must be 1-100, got '{}'", v)),
    }
}

fn compressed_name(input: &std::path::Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("compressed_{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_quality() {
        assert_eq!(image_quality(None).unwrap(), 70);
        assert_eq!(image_quality(Some("25")).unwrap(), 25);
        assert!(image_quality(Some("0")).is_err());
        assert!(image_quality(Some("high")).is_err());
    }

    #[test]
    fn test_compressed_name() {
        assert_eq!(
            compressed_name(std::path::Path::new("/in/photo.jpg")),
            "compressed_photo.jpg"
        );
    }
}
