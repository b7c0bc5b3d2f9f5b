//! Status command - backend health.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use converto_client::ConvertoClient;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    reachable: bool,
    healthy: bool,
    backend_url: String,
}

/// Run the status command.
pub async fn run(_args: StatusArgs, ctx: &Context) -> Result<()> {
    let client = ConvertoClient::builder()
        .base_url(&ctx.backend_url)
        .timeout(ctx.config.effective_backend().timeout())
        .build()?;

    let result = client.health().check().await;
    let healthy = result.as_ref().is_ok_and(|h| h.is_healthy());

    if ctx.json_output {
        return ctx.print_json(&StatusOutput {
            reachable: result.is_ok(),
            healthy,
            backend_url: ctx.backend_url.clone(),
        });
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Converto Backend Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    match &result {
        Ok(_) if healthy => println!(
            "  {} {}",
            dim.apply_to("Status:"),
            Style::new().green().apply_to("● healthy")
        ),
        Ok(health) => println!(
            "  {} {}",
            dim.apply_to("Status:"),
            Style::new().yellow().apply_to(format!("● {}", health.status))
        ),
        Err(_) => println!(
            "  {} {}",
            dim.apply_to("Status:"),
            Style::new().red().apply_to("● unreachable")
        ),
    }
    println!("  {} {}", dim.apply_to("Backend:"), ctx.backend_url);
    if ctx.verbose
        && let Err(e) = &result
    {
        println!();
        println!("  {} {}", dim.apply_to("Error:"), e);
    }
    println!();
    Ok(())
}
