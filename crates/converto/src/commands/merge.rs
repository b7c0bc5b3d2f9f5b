//! Merge command - combine local files and zips into one archive.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use serde::Serialize;

use converto_archive::{ArchiveMerger, ArchivePart, CollisionPolicy, PartOutcome};

use super::{Context, format_bytes, write_file};

/// Arguments for the merge command.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Files or zip archives to merge; zips are flattened
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output zip
    #[arg(short, long)]
    pub output: PathBuf,

    /// What to do with duplicate names: rename or skip (default: from config)
    #[arg(long)]
    pub on_collision: Option<String>,
}

#[derive(Debug, Serialize)]
struct MergeOutput {
    output: String,
    bytes: usize,
    entries: Vec<String>,
    renamed: usize,
    dropped: usize,
    shadowed: usize,
    fallbacks: usize,
}

/// Run the merge command.
pub async fn run(args: MergeArgs, ctx: &Context) -> Result<()> {
    let policy: CollisionPolicy = args
        .on_collision
        .unwrap_or_else(|| ctx.config.effective_archive().on_collision)
        .parse()?;

    let parts = args
        .inputs
        .iter()
        .map(|input| {
            let data = std::fs::read(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.display().to_string());
            Ok(ArchivePart::new(name, data))
        })
        .collect::<Result<Vec<_>>>()?;

    let merger = ArchiveMerger::with_collision_policy(policy);
    let (archive, summary) = merger
        .merge_with_summary(&parts)
        .context("Failed to build archive")?;
    write_file(&args.output, &archive)?;

    if ctx.json_output {
        return ctx.print_json(&MergeOutput {
            output: args.output.display().to_string(),
            bytes: archive.len(),
            fallbacks: summary.fallbacks(),
            entries: summary.entries,
            renamed: summary.renamed,
            dropped: summary.dropped,
            shadowed: summary.shadowed,
        });
    }

    println!(
        "{} {} ({}, {} entries)",
        style("✓").green(),
        args.output.display(),
        format_bytes(archive.len() as u64),
        summary.entries.len()
    );
    for (input, outcome) in args.inputs.iter().zip(&summary.outcomes) {
        match outcome {
            PartOutcome::Fallback { reason } => println!(
                "  {} {} is not a readable zip, added as a file ({})",
                style("!").yellow(),
                input.display(),
                reason
            ),
            PartOutcome::Skipped => println!(
                "  {} {} is empty, skipped",
                style("!").yellow(),
                input.display()
            ),
            PartOutcome::Nested { entries } if ctx.verbose => {
                println!("  {} ({} entries)", input.display(), entries)
            }
            _ => {}
        }
    }
    if summary.renamed > 0 || summary.dropped > 0 {
        println!(
            "  {} renamed, {} skipped because of duplicate names",
            summary.renamed, summary.dropped
        );
    }
    if summary.shadowed > 0 {
        println!(
            "  {} {} entries lost to repeated names inside an input zip",
            style("!").yellow(),
            summary.shadowed
        );
    }
    Ok(())
}
