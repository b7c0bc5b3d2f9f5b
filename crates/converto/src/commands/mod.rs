//! CLI command handlers.

pub mod auth;
pub mod compress;
pub mod config;
pub mod convert;
pub mod merge;
pub mod remove_bg;
pub mod status;
pub mod tasks;

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use converto_client::{ConvertoClient, Download};
use converto_config::{ConvertoConfig, SecretKind, resolve_secret};
use converto_oauth::{
    AuthorizationCodeExchanger, BackendSessionBridge, BrowserLauncher, GitHubConfig,
    GoogleConfig, SharedTokenStore, SignInCoordinator, SystemBrowser,
};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: ConvertoConfig,
    /// Backend API URL to connect to.
    pub backend_url: String,
    /// Session token from `--token` / `CONVERTO_ACCESS_TOKEN`.
    pub token: Option<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    fn http(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.config.effective_backend().timeout())
            .user_agent(concat!("converto/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")
    }

    /// Where the encrypted refresh token lives.
    pub fn data_dir(&self) -> Result<PathBuf> {
        converto_config::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }

    pub fn token_store(&self) -> Result<SharedTokenStore> {
        let data_dir = self.data_dir()?;
        #[cfg(feature = "keyring")]
        let store = converto_oauth::EncryptedFileTokenStore::with_keyring(&data_dir);
        #[cfg(not(feature = "keyring"))]
        let store = converto_oauth::EncryptedFileTokenStore::new(&data_dir);
        Ok(Arc::new(store))
    }

    /// Google client settings, or `None` when `[google]` has no client id.
    pub fn google_config(&self) -> Option<GoogleConfig> {
        let section = self.config.require_google().ok()?;
        let client_id = section.client_id.clone()?;
        let secret = resolve_secret(
            SecretKind::GoogleClientSecret,
            section.client_secret.as_deref(),
        );
        if let Some(ref s) = secret {
            tracing::debug!(source = %s.source, "Resolved Google client secret");
        }
        let mut config = GoogleConfig::new(client_id, secret.map(|s| s.value));
        config.redirect_port = section.redirect_port;
        Some(config)
    }

    /// GitHub client settings, or `None` when `[github]` has no client id.
    pub fn github_config(&self) -> Option<GitHubConfig> {
        let section = self.config.require_github().ok()?;
        let mut config = GitHubConfig::new(section.client_id.clone()?);
        config.redirect_port = section.redirect_port;
        Some(config)
    }

    /// Build the sign-in coordinator from configuration.
    pub fn coordinator(&self) -> Result<SignInCoordinator> {
        let http = self.http()?;
        let oauth = self.config.effective_oauth();

        let mut exchanger =
            AuthorizationCodeExchanger::new(http.clone(), &self.backend_url, self.token_store()?);
        if let Some(google) = self.google_config() {
            exchanger = exchanger.with_google(google);
        }
        let bridge = BackendSessionBridge::new(http, &self.backend_url);

        let mut coordinator = SignInCoordinator::new(exchanger, bridge)
            .with_browser(Arc::new(PrintingBrowser {
                launch: oauth.open_browser,
            }))
            .with_callback_timeout(oauth.callback_timeout());
        if let Some(github) = self.github_config() {
            coordinator = coordinator.with_github(github);
        }
        Ok(coordinator)
    }

    /// Backend client carrying the best available session token.
    ///
    /// Uses `--token` if given, otherwise tries a silent Google sign-in from
    /// the stored refresh token.
    pub async fn client(&self) -> Result<ConvertoClient> {
        let token = match &self.token {
            Some(token) => Some(token.clone()),
            None => self.resume_session().await,
        };

        let backend = self.config.effective_backend();
        let mut builder = ConvertoClient::builder()
            .base_url(&self.backend_url)
            .timeout(backend.timeout());
        if let Some(token) = token {
            builder = builder.auth_token(token);
        }
        builder.build().context("Invalid backend configuration")
    }

    async fn resume_session(&self) -> Option<String> {
        self.google_config()?;
        let coordinator = match self.coordinator() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "Cannot build sign-in coordinator");
                return None;
            }
        };
        match coordinator.resume_google().await {
            Ok(Some(session)) => Some(session.access_token),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Silent sign-in failed");
                None
            }
        }
    }

    /// Fail early with a hint when a command needs a session.
    pub fn require_auth(&self, client: &ConvertoClient) -> Result<()> {
        if client.is_authenticated() {
            Ok(())
        } else {
            anyhow::bail!(
                "Not signed in. Run 'converto auth login' or pass --token / CONVERTO_ACCESS_TOKEN."
            )
        }
    }

    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Prints the authorization URL and optionally launches the browser.
struct PrintingBrowser {
    launch: bool,
}

impl BrowserLauncher for PrintingBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        eprintln!("Open this URL in your browser to continue:");
        eprintln!();
        eprintln!("  {}", url);
        eprintln!();
        if self.launch && SystemBrowser.open(url).is_err() {
            eprintln!("(Could not open browser automatically)");
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Absolute path strings for the backend, which reads files by path.
pub fn input_paths(files: &[PathBuf]) -> Result<Vec<String>> {
    files
        .iter()
        .map(|file| {
            if !file.is_file() {
                anyhow::bail!("Not a file: {}", file.display());
            }
            let abs = std::path::absolute(file)
                .with_context(|| format!("Failed to resolve {}", file.display()))?;
            Ok(abs.to_string_lossy().into_owned())
        })
        .collect()
}

/// Spinner on stderr, hidden in JSON mode.
pub fn spinner(ctx: &Context, message: impl Into<String>) -> ProgressBar {
    if ctx.json_output {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

/// Write downloaded data to `output`, or to the backend's file name in the
/// current directory, or to `fallback`.
///
/// Only an explicit `output` may replace an existing file; derived names get
/// a ` (n)` suffix instead.
pub fn save_download(download: &Download, output: Option<&Path>, fallback: &str) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => unique_path(&PathBuf::from(download_name(download, fallback))),
    };
    write_file(&path, &download.data)?;
    Ok(path)
}

/// Save a download into `dir`, unpacking zip results into separate files.
///
/// Directory entries are skipped and only the last component of each entry
/// name is used. Existing files are never replaced.
pub fn extract_download(download: &Download, dir: &Path, fallback: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut archive = match download
        .is_zip()
        .then(|| zip::ZipArchive::new(Cursor::new(download.data.as_slice())))
    {
        Some(Ok(archive)) => archive,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Download is not a readable zip, saving as is");
            return save_single(download, dir, fallback);
        }
        None => return save_single(download, dir, fallback),
    };

    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read entry #{} of the download", i))?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry_file_name(entry.name()).map(str::to_owned) else {
            continue;
        };
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("Failed to extract {}", name))?;

        let path = unique_path(&dir.join(name));
        write_file(&path, &data)?;
        written.push(path);
    }
    Ok(written)
}

fn save_single(download: &Download, dir: &Path, fallback: &str) -> Result<Vec<PathBuf>> {
    let path = unique_path(&dir.join(download_name(download, fallback)));
    write_file(&path, &download.data)?;
    Ok(vec![path])
}

/// Only the final component of the backend's name, never its directories.
fn download_name(download: &Download, fallback: &str) -> String {
    download
        .file_name
        .as_deref()
        .and_then(entry_file_name)
        .unwrap_or(fallback)
        .to_string()
}

fn entry_file_name(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

/// `path` if it does not exist yet, otherwise the first free `name (n).ext`.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return path.to_path_buf();
    };
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    (1..)
        .map(|n| parent.join(converto_archive::numbered(&name, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Report files written by [`extract_download`].
pub fn report_extracted(ctx: &Context, dir: &Path, files: &[PathBuf]) -> Result<()> {
    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({
            "output_dir": dir.display().to_string(),
            "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
        }));
    }
    println!(
        "{} {} file(s) in {}",
        style("✓").green(),
        files.len(),
        dir.display()
    );
    if ctx.verbose {
        for file in files {
            println!("  {}", file.display());
        }
    }
    Ok(())
}

/// Print the "wrote file" line shared by the processing commands.
pub fn report_saved(ctx: &Context, path: &Path, bytes: usize) -> Result<()> {
    if ctx.json_output {
        ctx.print_json(&serde_json::json!({
            "output": path.display().to_string(),
            "bytes": bytes,
        }))
    } else {
        println!(
            "{} {} ({})",
            style("✓").green(),
            path.display(),
            format_bytes(bytes as u64)
        );
        Ok(())
    }
}
