//! Tasks command - processing history.

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, style};

use converto_client::{TaskOverview, TaskRecord};

use super::{Context, format_bytes};

/// Arguments for the tasks command.
#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Show dashboard totals instead of the task list
    #[arg(long)]
    pub overview: bool,

    /// Show at most this many tasks, newest first
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Run the tasks command.
pub async fn run(args: TasksArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client().await?;
    ctx.require_auth(&client)?;

    let mut records = client
        .tasks()
        .by_user()
        .await
        .context("Failed to fetch tasks")?;
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if args.overview {
        let overview = TaskOverview::from_records(&records);
        if ctx.json_output {
            return ctx.print_json(&serde_json::json!({
                "total_tasks": overview.total_tasks,
                "succeeded": overview.succeeded,
                "success_rate": overview.success_rate(),
                "bytes_saved": overview.bytes_saved,
                "avg_processing_secs": overview.avg_processing_secs,
                "per_service": overview
                    .per_service
                    .iter()
                    .map(|(service, count)| (service.to_string(), *count))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            }));
        }
        print_overview(&overview);
        return Ok(());
    }

    if let Some(limit) = args.limit {
        records.truncate(limit);
    }

    if ctx.json_output {
        return ctx.print_json(&records);
    }
    print_records(&records, ctx.verbose);
    Ok(())
}

fn print_overview(overview: &TaskOverview) {
    let dim = Style::new().dim();
    println!();
    println!("{}", style("Overview").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Total tasks:"), overview.total_tasks);
    println!(
        "  {} {:.1}%",
        dim.apply_to("Success rate:"),
        overview.success_rate()
    );
    println!(
        "  {} {}",
        dim.apply_to("Storage saved:"),
        format_bytes(overview.bytes_saved)
    );
    println!(
        "  {} {:.2}s",
        dim.apply_to("Avg. processing:"),
        overview.avg_processing_secs
    );
    if !overview.per_service.is_empty() {
        println!();
        for (service, count) in &overview.per_service {
            println!("  {:<20} {}", service.to_string(), count);
        }
    }
    println!();
}

fn print_records(records: &[TaskRecord], verbose: bool) {
    if records.is_empty() {
        println!("No tasks yet.");
        return;
    }

    let dim = Style::new().dim();
    println!(
        "{}",
        dim.apply_to(format!(
            "{:<19}  {:<18}  {:>10}  {:>10}  {:>7}  {}",
            "CREATED", "SERVICE", "ORIGINAL", "OUTPUT", "TIME", "STATUS"
        ))
    );
    for record in records {
        let status = if record.task_status {
            style("ok").green()
        } else {
            style("failed").red()
        };
        let output = record
            .output_file_size
            .map(|size| format_bytes(size.max(0) as u64))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<19}  {:<18}  {:>10}  {:>10}  {:>6.1}s  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.service().to_string(),
            format_bytes(record.original_file_size.max(0) as u64),
            output,
            record.task_time,
            status
        );
        if verbose && let Some(ref path) = record.original_file_path {
            println!("  {}", dim.apply_to(path));
        }
    }
}
