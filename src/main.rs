use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use offline_installer_lib::core::progress::{InstallerEvent, Phase};
use offline_installer_lib::core::state::settings::default_settings_path;
use offline_installer_lib::{
    init_tracing, DistributionServer, InstallerContext, InstallerResult, InstallerSettings, Mode,
    Orchestrator,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to the per-user data directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the install root from the settings file
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download every program bundle and extract it
    Update {
        /// Use the production endpoints
        #[arg(long)]
        production: bool,
    },
    /// Serve the cached programs on the local network until Ctrl-C
    Serve,
    /// Print the installed version of every program
    Versions,
    /// Refresh versions and start the server when there is no internet
    Auto,
}

#[tokio::main]
async fn main() -> InstallerResult<()> {
    init_tracing();
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(default_settings_path);
    let mut settings = InstallerSettings::load_or_default(&config_path);
    if let Some(root) = args.root {
        settings.install_root = root;
    }
    info!("Install root: {}", settings.install_root.display());

    let bar = progress_bar();
    let sink_bar = bar.clone();
    let context = Arc::new(InstallerContext::new(
        settings,
        Arc::new(move |event: InstallerEvent| render(&sink_bar, event)),
    )?);

    match args.command {
        Command::Update { production } => {
            context.refresh_versions().await;
            let orchestrator = Orchestrator::new(Arc::clone(&context));
            let report = orchestrator
                .run_batch(Mode::from_production_flag(production))
                .await;
            bar.finish_and_clear();
            let report = report?;
            for failure in &report.failed {
                println!("failed: {} ({})", failure.artifact, failure.error);
            }
            println!(
                "{} of {} programs updated",
                report.succeeded.len(),
                report.succeeded.len() + report.failed.len()
            );
        }
        Command::Serve => {
            context.refresh_versions().await;
            bar.finish_and_clear();
            serve_until_ctrl_c(&context).await?;
        }
        Command::Versions => {
            context.refresh_versions().await;
            bar.finish_and_clear();
            for (name, version) in context.versions.snapshot() {
                println!("{name:<10} {version}");
            }
        }
        Command::Auto => {
            context.refresh_versions().await;
            bar.finish_and_clear();
            if context.has_internet_access().await {
                warn!("Internet is available; the server will not start automatically.");
            } else {
                serve_until_ctrl_c(&context).await?;
            }
        }
    }
    Ok(())
}

async fn serve_until_ctrl_c(context: &InstallerContext) -> InstallerResult<()> {
    let server = DistributionServer::from_context(context);
    let addr = server.start().await?;
    println!("Serving {} on {}", context.programs_dir().display(), addr);
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
    }
    server.stop().await;
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{prefix:>12} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar
}

fn render(bar: &ProgressBar, event: InstallerEvent) {
    match event {
        InstallerEvent::Progress(progress) => {
            let prefix = match progress.phase {
                Phase::Downloading => "downloading",
                Phase::Extracting => "extracting",
            };
            bar.set_prefix(prefix);
            bar.set_message(progress.label);
            bar.set_position(progress.percent.clamp(0.0, 100.0) as u64);
        }
        InstallerEvent::Log(line) => {
            bar.println(format!("[{}] {}", line.at.format("%H:%M:%S"), line.text));
        }
        InstallerEvent::Status { text } => bar.set_message(text),
        InstallerEvent::ProgressReset => bar.set_position(0),
        InstallerEvent::BatchComplete(_) => {}
    }
}
