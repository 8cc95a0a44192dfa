//! notegen
//!
//! Resolves note class configuration (inheritance, merge operators and
//! templates) and prints the options the note-creation flow would use.

use anyhow::{Result, bail};
use clap::Parser;
use notegen::cli::{Cli, Command};
use notegen::config::{
    ClassRegistry, ConfigPaths, WatchPaths, WatcherConfig, start_config_watcher,
    watcher::RegistrySnapshot,
};
use notegen::format::{
    ClassSummary, OutputFormat, format_classes_markdown, format_diagnostics_markdown,
    format_prompt_options_markdown, format_resolved_markdown, format_view_options_markdown,
};
use notegen::logging::DiagnosticLog;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let Some(format) = OutputFormat::from_str(&cli.format) else {
        bail!("unknown output format '{}'", cli.format);
    };

    let mut paths = ConfigPaths::discover();
    if let Some(ref classes) = cli.classes {
        paths = paths.with_classes_path(classes);
    }

    let diagnostics = DiagnosticLog::new();
    let registry = ClassRegistry::load(paths, diagnostics.clone())?;

    match cli.command {
        Command::List => run_list(&registry.snapshot(), format)?,
        Command::Resolve { class } => run_resolve(&registry.snapshot(), &class, format)?,
        Command::Options { class } => {
            run_options(&registry.snapshot(), &class, cli.vault, &diagnostics, format).await?
        }
        Command::View { class, title } => {
            run_view(&registry.snapshot(), &class, &title, format)?
        }
        Command::Check => {
            if !run_check(&registry.snapshot(), &diagnostics, format)? {
                std::process::exit(1);
            }
        }
        Command::Watch => run_watch(registry, &diagnostics, format).await?,
    }

    Ok(())
}

fn run_list(snapshot: &RegistrySnapshot, format: OutputFormat) -> Result<()> {
    let classes: Vec<ClassSummary> = snapshot
        .resolver
        .resolve_all()?
        .iter()
        .map(|resolved| ClassSummary::from(resolved.as_ref()))
        .collect();

    match format {
        OutputFormat::Markdown => print!("{}", format_classes_markdown(&classes)),
        other => println!("{}", other.render(&classes)?),
    }
    Ok(())
}

fn run_resolve(snapshot: &RegistrySnapshot, class: &str, format: OutputFormat) -> Result<()> {
    let resolved = snapshot.resolver.resolve(class)?;

    match format {
        OutputFormat::Markdown => print!("{}", format_resolved_markdown(&resolved)),
        other => println!("{}", other.render(&resolved.to_value())?),
    }
    Ok(())
}

async fn run_options(
    snapshot: &RegistrySnapshot,
    class: &str,
    vault: Option<String>,
    diagnostics: &DiagnosticLog,
    format: OutputFormat,
) -> Result<()> {
    let resolved = snapshot.resolver.resolve(class)?;

    let mut loader = snapshot.loader.clone();
    if let Some(vault) = vault {
        loader.config_mut().paths.vault_root = PathBuf::from(vault);
    }
    let factory = loader.options_factory(diagnostics.clone());
    let options = factory.create_prompt_options(&resolved).await?;

    match format {
        OutputFormat::Markdown => print!("{}", format_prompt_options_markdown(&options)),
        other => println!("{}", other.render(&options)?),
    }
    Ok(())
}

fn run_view(
    snapshot: &RegistrySnapshot,
    class: &str,
    title: &str,
    format: OutputFormat,
) -> Result<()> {
    let resolved = snapshot.resolver.resolve(class)?;
    let factory = snapshot.loader.options_factory(DiagnosticLog::new());
    let options = factory.create_view_options(&resolved, title)?;

    match format {
        OutputFormat::Markdown => print!("{}", format_view_options_markdown(&options)),
        other => println!("{}", other.render(&options)?),
    }
    Ok(())
}

/// Resolve every class; returns false when any class fails.
fn run_check(
    snapshot: &RegistrySnapshot,
    diagnostics: &DiagnosticLog,
    format: OutputFormat,
) -> Result<bool> {
    let mut failed = 0;
    for class in snapshot.resolver.type_names() {
        if let Err(e) = snapshot.resolver.resolve(&class) {
            eprintln!("error: {}", e);
            failed += 1;
        }
    }

    let records = diagnostics.take();
    match format {
        OutputFormat::Markdown => print!("{}", format_diagnostics_markdown(&records)),
        other => println!("{}", other.render(&records)?),
    }

    info!(
        classes = snapshot.resolver.type_names().len(),
        failed,
        warnings = records.len(),
        "Checked class configuration"
    );
    Ok(failed == 0)
}

async fn run_watch(
    registry: ClassRegistry,
    diagnostics: &DiagnosticLog,
    format: OutputFormat,
) -> Result<()> {
    run_check(&registry.snapshot(), diagnostics, format)?;

    let watch_paths = WatchPaths::from_config_paths(registry.paths());
    if watch_paths.dirs.is_empty() && watch_paths.classes_path.is_none() {
        bail!("no configuration directory found to watch");
    }

    let mut handle = start_config_watcher(watch_paths, WatcherConfig::default())?;
    info!("Config file watcher started");

    while let Some(event) = handle.wait_for_change().await {
        if !event.requires_reload() {
            warn!("Watcher error: {:?}", event);
            continue;
        }
        info!("Config change detected: {:?}", event);
        // A failed reload keeps the previous snapshot and is logged by the registry
        if registry.reload().is_ok() {
            run_check(&registry.snapshot(), diagnostics, format)?;
        }
    }

    info!("Config file watcher stopped");
    Ok(())
}
