//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use converto_config::{ConvertoConfig, SecretKind, SecretSource, resolve_secret};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./converto.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Store the Google client secret in the system keyring
    SetSecret,

    /// Remove the Google client secret from the system keyring
    DeleteSecret,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local, force } => cmd_init(local, force),
        ConfigCommand::SetSecret => cmd_set_secret(),
        ConfigCommand::DeleteSecret => cmd_delete_secret(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    if ctx.json_output {
        let mut shown = config.clone();
        if let Some(ref mut google) = shown.google
            && google.has_plaintext_secret()
        {
            google.client_secret = Some("<redacted>".to_string());
        }
        return ctx.print_json(&shown);
    }

    println!("# Converto Configuration\n");

    let backend = config.effective_backend();
    println!("Backend:");
    println!("  url: {}", ctx.backend_url);
    println!("  timeout: {}s", backend.timeout_secs);
    println!();

    println!("Sign-in:");
    match config.require_google() {
        Ok(google) => {
            let secret = resolve_secret(
                SecretKind::GoogleClientSecret,
                google.client_secret.as_deref(),
            );
            println!(
                "  google: {}  {}",
                google.client_id.as_deref().unwrap_or_default(),
                secret_status(secret.as_ref().map(|s| &s.source))
            );
        }
        Err(_) => println!("  google: not configured"),
    }
    match config.require_github() {
        Ok(github) => println!(
            "  github: {}",
            github.client_id.as_deref().unwrap_or_default()
        ),
        Err(_) => println!("  github: not configured"),
    }
    let oauth = config.effective_oauth();
    println!("  callback timeout: {}s", oauth.callback_timeout_secs);
    println!("  open browser: {}", oauth.open_browser);
    println!();

    println!("Archive:");
    println!("  on_collision: {}", config.effective_archive().on_collision);
    println!();

    let logging = config.effective_logging();
    println!("Logging:");
    if logging.file {
        let dir = logging.dir.clone().or_else(converto_config::log_dir);
        println!(
            "  file: {}",
            dir.map(|d| d.display().to_string())
                .unwrap_or_else(|| "(no log directory)".to_string())
        );
    } else {
        println!("  file: disabled");
    }
    println!();

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn secret_status(source: Option<&SecretSource>) -> String {
    match source {
        Some(source) => format!("(secret: {})", source),
        None => "(no client secret)".to_string(),
    }
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let loaded = converto_config::load_config(None)?;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| serde_json::json!({"path": s.path.display().to_string(), "loaded": s.loaded}))
            .collect();
        return ctx.print_json(&sources);
    }

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    println!();

    for warning in &loaded.warnings {
        println!("  ⚠ {}", warning);
    }

    if loaded.loaded_from().is_empty() {
        println!("No config files found. Run 'converto config init' to create one.");
    }
    Ok(())
}

fn cmd_init(local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("converto.toml")
    } else {
        converto_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    converto_config::save_config(&ConvertoConfig::starter(), &path)?;
    println!("✓ Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  set [google] client_id and/or [github] client_id in that file");
    println!("  converto config set-secret    # store the Google client secret in the keyring");
    println!("  converto auth login           # sign in");

    Ok(())
}

fn cmd_set_secret() -> Result<()> {
    let kind = SecretKind::GoogleClientSecret;
    let secret = rpassword::prompt_password("Google client secret (input hidden): ")?;
    let secret = secret.trim();

    if secret.is_empty() {
        println!("No secret provided, aborting.");
        return Ok(());
    }

    match converto_config::secrets::store_in_keyring(kind, secret) {
        Ok(()) => println!("✓ Google client secret stored in system keyring"),
        Err(e) => {
            eprintln!("Failed to store in keyring: {}", e);
            eprintln!(
                "Fallback: set the {} environment variable instead.",
                kind.env_var()
            );
        }
    }
    Ok(())
}

fn cmd_delete_secret() -> Result<()> {
    match converto_config::secrets::delete_from_keyring(SecretKind::GoogleClientSecret) {
        Ok(()) => println!("✓ Google client secret removed from keyring"),
        Err(e) => eprintln!("Failed to delete from keyring: {}", e),
    }
    Ok(())
}
