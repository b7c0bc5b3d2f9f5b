//! Convert command - batch conversion merged into one zip.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use serde::Serialize;

use converto_archive::CollisionPolicy;
use converto_client::ConvertJob;

use super::{Context, format_bytes, input_paths, spinner, write_file};

/// Arguments for the convert command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Files to convert
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Target format for all files (e.g. `webp`), or `FILE:FORMAT` for one file
    #[arg(long = "to", required = true)]
    pub to: Vec<String>,

    /// Output zip
    #[arg(short, long, default_value = "converted.zip")]
    pub output: PathBuf,

    /// What to do with duplicate names: rename or skip (default: from config)
    #[arg(long)]
    pub on_collision: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConvertOutputJson {
    output: String,
    bytes: usize,
    entries: Vec<String>,
    renamed: usize,
    dropped: usize,
}

/// Run the convert command.
pub async fn run(args: ConvertArgs, ctx: &Context) -> Result<()> {
    let policy: CollisionPolicy = args
        .on_collision
        .unwrap_or_else(|| ctx.config.effective_archive().on_collision)
        .parse()?;

    let targets = parse_targets(&args.to)?;
    let paths = input_paths(&args.files)?;
    let jobs = args
        .files
        .iter()
        .zip(paths)
        .map(|(file, path)| {
            targets
                .format_for(file)
                .map(|format| ConvertJob::new(path, format))
                .ok_or_else(|| anyhow::anyhow!("No target format for {}", file.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let client = ctx.client().await?;
    ctx.require_auth(&client)?;

    let bar = spinner(ctx, format!("Converting {} file(s)", jobs.len()));
    let result = client
        .convert()
        .with_collision_policy(policy)
        .convert(&jobs)
        .await;
    bar.finish_and_clear();
    let output = result.context("Conversion failed")?;

    write_file(&args.output, &output.archive)?;

    if ctx.json_output {
        return ctx.print_json(&ConvertOutputJson {
            output: args.output.display().to_string(),
            bytes: output.archive.len(),
            entries: output.summary.entries.clone(),
            renamed: output.summary.renamed,
            dropped: output.summary.dropped,
        });
    }

    println!(
        "{} {} ({}, {} file(s))",
        style("✓").green(),
        args.output.display(),
        format_bytes(output.archive.len() as u64),
        output.summary.entries.len()
    );
    if ctx.verbose {
        for entry in &output.summary.entries {
            println!("  {}", entry);
        }
    }
    if output.summary.renamed > 0 || output.summary.dropped > 0 {
        println!(
            "  {} renamed, {} skipped because of duplicate names",
            output.summary.renamed, output.summary.dropped
        );
    }
    Ok(())
}

/// `--to` values: one default format plus per-file overrides.
#[derive(Debug, Default)]
struct Targets {
    default: Option<String>,
    per_file: HashMap<PathBuf, String>,
}

impl Targets {
    fn format_for(&self, file: &Path) -> Option<String> {
        self.per_file
            .get(file)
            .or(self.default.as_ref())
            .cloned()
    }
}

fn parse_targets(values: &[String]) -> Result<Targets> {
    let mut targets = Targets::default();
    for value in values {
        // Split on the last ':' so Windows drive letters stay in the path.
        match value.rsplit_once(':') {
            Some((file, format)) if !file.is_empty() => {
                if format.is_empty() {
                    anyhow::bail!("Missing format in --to {}", value);
                }
                targets.per_file.insert(PathBuf::from(file), format.to_string());
            }
            _ => {
                let format = value.trim_start_matches(':');
                if targets.default.replace(format.to_string()).is_some() {
                    anyhow::bail!("More than one default --to format given");
                }
            }
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_targets_default_and_override() {
        let targets = parse_targets(&strings(&["webp", "b.png:jpg"])).unwrap();
        assert_eq!(
            targets.format_for(&PathBuf::from("a.png")).as_deref(),
            Some("webp")
        );
        assert_eq!(
            targets.format_for(&PathBuf::from("b.png")).as_deref(),
            Some("jpg")
        );
    }

    #[test]
    fn test_parse_targets_only_overrides() {
        let targets = parse_targets(&strings(&["a.docx:pdf"])).unwrap();
        assert!(targets.format_for(&PathBuf::from("other.docx")).is_none());
    }

    #[test]
    fn test_parse_targets_windows_path() {
        let targets = parse_targets(&strings(&[r"C:\in\a.png:webp"])).unwrap();
        assert_eq!(
            targets
                .format_for(&PathBuf::from(r"C:\in\a.png"))
                .as_deref(),
            Some("webp")
        );
    }

    #[test]
    fn test_parse_targets_errors() {
        assert!(parse_targets(&strings(&["png", "jpg"])).is_err());
        assert!(parse_targets(&strings(&["a.png:"])).is_err());
    }
}
