//! Remove-bg command - background removal.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use super::{
    Context, extract_download, input_paths, report_extracted, report_saved, save_download, spinner,
};

/// Arguments for the remove-bg command.
#[derive(Args, Debug)]
pub struct RemoveBgArgs {
    /// Images to process
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output file (default: name chosen by the backend)
    #[arg(short, long, conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Save results as separate files in this directory, unpacking zips
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Run the remove-bg command.
pub async fn run(args: RemoveBgArgs, ctx: &Context) -> Result<()> {
    let paths = input_paths(&args.files)?;
    let client = ctx.client().await?;
    ctx.require_auth(&client)?;

    let bar = spinner(ctx, format!("Removing background from {} image(s)", paths.len()));
    let result = client.background().remove(&paths).await;
    bar.finish_and_clear();
    let download = result.context("Background removal failed")?;

    let fallback = if download.is_zip() {
        "no_background.zip"
    } else {
        "no_background.png"
    };
    if let Some(dir) = args.output_dir {
        let files = extract_download(&download, &dir, fallback)?;
        return report_extracted(ctx, &dir, &files);
    }
    let path = save_download(&download, args.output.as_deref(), fallback)?;
    report_saved(ctx, &path, download.data.len())
}
