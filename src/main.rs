use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use usbwipe::config::{CliOverrides, Settings};
use usbwipe::drives::DeviceEnumerator;
use usbwipe::erase::{EraseEngine, PolicyKind};
use usbwipe::exec::{SharedRunner, SystemRunner};
use usbwipe::platform::Platform;
use usbwipe::ui::PromptGate;
use usbwipe::{Device, RunOrchestrator, WipeError, EXIT_OK, EXIT_SETUP_FAILURE};

#[derive(Parser)]
#[command(name = "usbwipe")]
#[command(about = "Securely erase removable/external drives, never internal or system disks")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (defaults to the per-user config.toml when present)
    #[arg(long, global = true, env = "USBWIPE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Confirm and erase each removable/external drive in turn (default)
    Wipe(WipeArgs),

    /// List removable/external drives without touching them
    List {
        /// Also show drives that would be refused, with the reason
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Default)]
struct WipeArgs {
    /// Erase policy (defaults to the platform's policy)
    #[arg(short, long, value_enum)]
    policy: Option<PolicyKind>,

    /// Random overwrite passes before the final zero pass
    #[arg(short = 'n', long)]
    passes: Option<u32>,

    /// Stop the whole run when an overwrite fails
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    halt_on_overwrite_failure: Option<bool>,

    /// Write a JSON run report to this path
    #[arg(short, long)]
    report: Option<PathBuf>,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            let wipe_error = e.downcast_ref::<WipeError>();
            if let Some(WipeError::ToolMissing(tool)) = wipe_error {
                eprintln!("Install `{}` and make sure it is on PATH, then re-run.", tool);
            }
            ExitCode::from(
                wipe_error
                    .map(WipeError::exit_code)
                    .unwrap_or(EXIT_SETUP_FAILURE),
            )
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let platform = Platform::current()?;
    let runner: SharedRunner = Arc::new(SystemRunner);

    match cli.command.unwrap_or(Commands::Wipe(WipeArgs::default())) {
        Commands::Wipe(args) => wipe(platform, runner, cli.config, args),
        Commands::List { all, json } => list(platform, runner, all, json),
    }
}

fn wipe(
    platform: Platform,
    runner: SharedRunner,
    config: Option<PathBuf>,
    args: WipeArgs,
) -> Result<u8> {
    // Checked before the config so a non-root run always exits with EXIT_PRIVILEGE
    platform.ensure_elevated(runner.as_ref())?;

    let settings = Settings::load(config.as_deref())
        .context("Failed to load configuration")?
        .apply(CliOverrides {
            policy: args.policy,
            random_passes: args.passes,
            halt_on_overwrite_failure: args.halt_on_overwrite_failure,
            report_path: args.report,
        })?;
    let policy = settings.erase_policy(platform);
    tracing::debug!(%platform, %policy, "Resolved settings");

    platform.check_tools(&policy)?;

    let devices = DeviceEnumerator::new(platform.classifier(runner.clone()))
        .enumerate()
        .context("Failed to enumerate drives")?;

    println!("Policy: {}", policy);
    let mut orchestrator = RunOrchestrator::new(
        platform,
        Box::new(PromptGate::stdio()),
        platform.mount_manager(runner.clone()),
        EraseEngine::new(platform.erase_backend(runner), policy),
    );
    let summary = orchestrator.run(&devices);

    if let Some(path) = &settings.report_path {
        // The erase already happened; a report failure does not change the outcome
        if let Err(e) = summary.write_json(path) {
            eprintln!(
                "{} could not write report to {}: {}",
                "Warning:".yellow().bold(),
                path.display(),
                e
            );
        }
    }

    Ok(summary.exit_code())
}

fn list(platform: Platform, runner: SharedRunner, all: bool, json: bool) -> Result<u8> {
    let enumerator = DeviceEnumerator::new(platform.classifier(runner));
    let devices = if all {
        enumerator.discover_all()
    } else {
        enumerator.enumerate()
    }
    .context("Failed to enumerate drives")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(EXIT_OK);
    }

    if devices.is_empty() {
        println!("{}", usbwipe::wipe_orchestrator::NO_DEVICES_MESSAGE);
        return Ok(EXIT_OK);
    }

    println!(
        "{:<22} {:<10} {:<8} {:<24} {}",
        "Device", "Size", "Bus", "Model", "Status"
    );
    println!("{}", "-".repeat(80));
    for device in &devices {
        print_device_row(device);
    }

    Ok(EXIT_OK)
}

fn print_device_row(device: &Device) {
    let status = match device.ineligibility() {
        None => "eligible".green().to_string(),
        Some(reason) => reason.dimmed().to_string(),
    };
    println!(
        "{:<22} {:<10} {:<8} {:<24} {}",
        device.id.to_string(),
        device.size_display(),
        device.bus.to_string(),
        truncate_string(device.model.as_deref().unwrap_or("-"), 24),
        status
    );
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
