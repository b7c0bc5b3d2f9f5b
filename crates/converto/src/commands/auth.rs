//! Auth command - sign in and out.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};
use console::{Style, style};
use serde::Serialize;

use converto_oauth::{CancellationToken, Provider, SessionToken};

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in through the browser (or with a password)
    Login {
        /// Identity provider
        #[arg(long, value_enum, default_value_t = LoginProvider::Google)]
        provider: LoginProvider,

        /// Sign in again even if a stored Google session can be restored
        #[arg(long)]
        force: bool,

        /// Print the backend session token (for CONVERTO_ACCESS_TOKEN)
        #[arg(long)]
        print_token: bool,

        /// Account email, for --provider password
        #[arg(long)]
        email: Option<String>,
    },

    /// Show sign-in status
    Status,

    /// Forget the stored refresh token
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoginProvider {
    Google,
    Github,
    Password,
}

#[derive(Debug, Serialize)]
struct LoginOutput<'a> {
    email: &'a str,
    name: String,
    restored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    google_configured: bool,
    github_configured: bool,
    refresh_token_stored: bool,
    token_file: Option<String>,
    session_token_set: bool,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login {
            provider,
            force,
            print_token,
            email,
        } => cmd_login(provider, force, print_token, email, ctx).await,
        AuthCommand::Status => cmd_status(ctx).await,
        AuthCommand::Logout => cmd_logout(ctx).await,
    }
}

async fn cmd_login(
    provider: LoginProvider,
    force: bool,
    print_token: bool,
    email: Option<String>,
    ctx: &Context,
) -> Result<()> {
    if provider == LoginProvider::Password {
        let session = password_login(email, ctx).await?;
        return report_login(&session, false, print_token, ctx);
    }

    let coordinator = ctx.coordinator()?;

    if provider == LoginProvider::Google && !force {
        if ctx.google_config().is_none() {
            anyhow::bail!(
                "Google sign-in is not configured. Set [google] client_id in {}",
                config_hint()
            );
        }
        if let Some(session) = coordinator
            .resume_google()
            .await
            .context("Google sign-in failed")?
        {
            return report_login(&session, true, print_token, ctx);
        }
    }

    let provider = match provider {
        LoginProvider::Github => Provider::GitHub,
        _ => Provider::Google,
    };

    // Ctrl-C abandons the pending authorization and releases the port.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = coordinator.sign_in(provider, &cancel).await;
    interrupt.abort();

    let session = result.with_context(|| format!("{} sign-in failed", provider.display_name()))?;
    report_login(&session, false, print_token, ctx)
}

async fn password_login(email: Option<String>, ctx: &Context) -> Result<SessionToken> {
    let email = match email {
        Some(email) => email,
        None => {
            eprint!("Email: ");
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            input.trim().to_string()
        }
    };
    if email.is_empty() {
        anyhow::bail!("No email provided");
    }
    let password = rpassword::prompt_password("Password: ")?;

    let client = converto_client::ConvertoClient::builder()
        .base_url(&ctx.backend_url)
        .timeout(ctx.config.effective_backend().timeout())
        .build()?;
    client
        .auth()
        .login(&email, &password)
        .await
        .context("Password sign-in failed")
}

fn report_login(
    session: &SessionToken,
    restored: bool,
    print_token: bool,
    ctx: &Context,
) -> Result<()> {
    if ctx.json_output {
        return ctx.print_json(&LoginOutput {
            email: &session.user.email,
            name: session.user.display_name(),
            restored,
            access_token: print_token.then_some(session.access_token.as_str()),
        });
    }

    let verb = if restored {
        "Session restored for"
    } else {
        "Signed in as"
    };
    println!(
        "{} {} {}",
        style("✓").green(),
        verb,
        style(session.user.display_name()).bold()
    );
    if !session.user.email.is_empty() {
        println!("  {}", session.user.email);
    }
    if print_token {
        println!();
        println!("export CONVERTO_ACCESS_TOKEN={}", session.access_token);
    }
    Ok(())
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    let store = ctx.token_store()?;
    let has_token = store.has_token();
    let token_file = ctx
        .data_dir()
        .ok()
        .map(|d| d.join(converto_oauth::token_store::TOKEN_FILE));

    let output = StatusOutput {
        google_configured: ctx.google_config().is_some(),
        github_configured: ctx.github_config().is_some(),
        refresh_token_stored: has_token,
        token_file: token_file.as_ref().map(|p| p.display().to_string()),
        session_token_set: ctx.token.is_some(),
    };

    if ctx.json_output {
        return ctx.print_json(&output);
    }

    let dim = Style::new().dim();
    let yes = |b: bool| {
        if b {
            style("yes").green()
        } else {
            style("no").red()
        }
    };

    println!("{}", style("Authentication Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Google configured:"), yes(output.google_configured));
    println!("  {} {}", dim.apply_to("GitHub configured:"), yes(output.github_configured));
    println!(
        "  {} {}",
        dim.apply_to("Stored Google sign-in:"),
        yes(output.refresh_token_stored)
    );
    if ctx.verbose
        && let Some(ref file) = output.token_file
    {
        println!("  {} {}", dim.apply_to("Token file:"), file);
    }

    match &ctx.token {
        Some(token) => println!(
            "  {} {} (from --token / CONVERTO_ACCESS_TOKEN)",
            dim.apply_to("Session token:"),
            mask(token)
        ),
        None => println!("  {} not set", dim.apply_to("Session token:")),
    }

    if !output.refresh_token_stored && ctx.token.is_none() {
        println!();
        println!("  Run 'converto auth login' to sign in.");
    }
    Ok(())
}

async fn cmd_logout(ctx: &Context) -> Result<()> {
    let store = ctx.token_store()?;
    if !store.has_token() {
        println!("No stored sign-in found.");
        return Ok(());
    }
    ctx.coordinator()?
        .sign_out()
        .await
        .context("Failed to remove stored sign-in")?;
    println!("{} Signed out.", style("✓").green());
    Ok(())
}

fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

fn config_hint() -> String {
    converto_config::user_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "converto.toml".to_string())
}
