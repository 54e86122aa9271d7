use clap::{Parser, Subcommand};
use selfupdate_core::{
    CommandInstallTrigger, DownloadState, UpdateCheckResult, UpdateController, UpdateError,
    UpdaterConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_INSTALL_COMMAND: &str = "adb install -r";

#[derive(Parser)]
#[command(name = "selfupdate")]
#[command(about = "Check for, download and install application updates from GitHub releases")]
struct Cli {
    /// JSON configuration file (defaults to SELFUPDATE_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    owner: Option<String>,

    #[arg(long, global = true)]
    repo: Option<String>,

    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Version of the running build
    #[arg(long, global = true)]
    current_version: Option<String>,

    /// Platform variant to download, e.g. arm64-v8a
    #[arg(long, global = true)]
    platform_tag: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a newer release exists
    Check,
    /// Download the update (Ctrl-C cancels)
    Download {
        /// Asset URL; defaults to the asset chosen by a fresh check
        #[arg(long)]
        url: Option<String>,
    },
    /// Download the update and hand it to an installer command
    Install {
        #[arg(long)]
        url: Option<String>,
        /// Installer command; the artifact path is appended
        #[arg(long, default_value = DEFAULT_INSTALL_COMMAND)]
        command: String,
    },
    /// Print the effective configuration
    Config,
}

impl Cli {
    fn load_config(&self) -> Result<UpdaterConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => UpdaterConfig::from_json(&std::fs::read_to_string(path)?)?,
            None => UpdaterConfig::from_env(),
        };
        if let Some(owner) = &self.owner {
            config.owner = owner.clone();
        }
        if let Some(repo) = &self.repo {
            config.repo = repo.clone();
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(version) = &self.current_version {
            config.current_version = version.clone();
        }
        if let Some(tag) = &self.platform_tag {
            config.platform_tag = Some(tag.clone());
        }
        Ok(config)
    }
}

fn print_check(result: &UpdateCheckResult) {
    match result {
        UpdateCheckResult::UpdateAvailable {
            current_version,
            latest_version,
            notes,
            download_url,
        } => {
            println!("Update available: {} -> {}", current_version, latest_version);
            match download_url {
                Some(url) => println!("Download: {}", url),
                None => println!("No installable asset for this platform"),
            }
            if !notes.is_empty() {
                println!("\n{}", notes);
            }
        }
        UpdateCheckResult::UpToDate {
            current_version,
            latest_version,
        } => println!("Up to date ({}, latest {})", current_version, latest_version),
        UpdateCheckResult::CheckFailed { reason } => println!("Check failed: {}", reason),
    }
}

/// URL given on the command line, or the one picked by a fresh check.
async fn resolve_url(
    controller: &UpdateController,
    url: Option<String>,
) -> Result<Option<String>, UpdateError> {
    if url.is_some() {
        return Ok(url);
    }
    let result = controller.check_for_updates().await?;
    match result.download_url() {
        Some(url) => Ok(Some(url.to_string())),
        None => {
            print_check(&result);
            Ok(None)
        }
    }
}

async fn download(
    controller: &UpdateController,
    url: &str,
) -> Result<Option<PathBuf>, UpdateError> {
    let canceller = controller.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel_download();
        }
    });

    let mut progress = controller.subscribe_download();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            if let DownloadState::Progress(fraction) = state {
                eprint!("\rDownloading {:5.1}%", fraction * 100.0);
            }
        }
    });

    let outcome = controller.download_update(url).await;
    printer.abort();
    ctrl_c.abort();
    eprintln!();

    match outcome {
        Ok(artifact) => {
            println!("Downloaded to {}", artifact.display());
            Ok(Some(artifact))
        }
        Err(UpdateError::Cancelled) => {
            println!("Download cancelled");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    let install_command = match &cli.command {
        Commands::Install { command, .. } => command.as_str(),
        _ => DEFAULT_INSTALL_COMMAND,
    };
    let installer = CommandInstallTrigger::from_command_line(install_command)
        .ok_or("installer command is empty")?;

    match cli.command {
        Commands::Config => {
            println!("{}", config.to_json()?);
        }
        Commands::Check => {
            let controller = UpdateController::from_config(&config, Arc::new(installer))?;
            print_check(&controller.check_for_updates().await?);
        }
        Commands::Download { url } => {
            let controller = UpdateController::from_config(&config, Arc::new(installer))?;
            if let Some(url) = resolve_url(&controller, url).await? {
                download(&controller, &url).await?;
            }
        }
        Commands::Install { url, .. } => {
            let controller = UpdateController::from_config(&config, Arc::new(installer))?;
            if let Some(url) = resolve_url(&controller, url).await? {
                if download(&controller, &url).await?.is_some() {
                    controller.install_update()?;
                    println!("Installer started");
                }
            }
        }
    }

    Ok(())
}
