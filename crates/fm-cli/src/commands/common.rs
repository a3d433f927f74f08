//! Shared utilities for CLI commands

use anyhow::{bail, Context, Result};
use fm_core::{load_migration_set, Config, Direction, MigrationSet};
use fm_db::DriverRegistry;
use fm_engine::{BatchReport, InterruptHandle, Migrator, MigratorConfig};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) u8);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already printed its failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Loaded project configuration with the resolved migrations directory
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) config: Config,
    pub(crate) migrations_dir: PathBuf,
}

impl Project {
    /// Load `fm.yml` (from `--config` or the working directory) and apply
    /// the `--path` override.
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let (config, root) = match &global.config {
            Some(path) => {
                let path = Path::new(path);
                let config = Config::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?;
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (config, root)
            }
            None => {
                let root = PathBuf::from(".");
                let config = Config::load_from_dir(&root).context("Failed to load fm.yml")?;
                (config, root)
            }
        };

        let migrations_dir = match &global.path {
            Some(path) => PathBuf::from(path),
            None => config.migrations_path_absolute(&root),
        };
        Ok(Self {
            config,
            migrations_dir,
        })
    }

    /// Connection descriptor: `--url` / `FM_DATABASE_URL`, then the selected
    /// target, then `database_url` from fm.yml.
    pub(crate) fn database_url(&self, global: &GlobalArgs) -> Result<String> {
        if let Some(url) = &global.url {
            return Ok(url.clone());
        }
        match self.config.database_url(global.target.as_deref())? {
            Some(url) => Ok(url),
            None => bail!(
                "No database URL configured. Pass --url, set FM_DATABASE_URL, or add database_url to fm.yml"
            ),
        }
    }

    pub(crate) fn step_timeout(&self, global: &GlobalArgs) -> Option<Duration> {
        global
            .timeout
            .map(Duration::from_secs)
            .or_else(|| self.config.step_timeout(global.target.as_deref()))
    }

    pub(crate) fn migration_set(&self) -> Result<MigrationSet> {
        load_migration_set(&self.migrations_dir, &self.config.extension).with_context(|| {
            format!(
                "Failed to load migrations from {}",
                self.migrations_dir.display()
            )
        })
    }
}

/// Load the project and connect a migrator to the configured database
pub(crate) async fn open_migrator(global: &GlobalArgs) -> Result<Migrator> {
    let project = Project::load(global)?;
    let url = project.database_url(global)?;
    let migrations = project.migration_set()?;
    let config = MigratorConfig {
        step_timeout: project.step_timeout(global),
        ..MigratorConfig::default()
    };

    if global.verbose {
        eprintln!(
            "[verbose] {} migration(s) in {}",
            migrations.len(),
            project.migrations_dir.display()
        );
    }

    let registry = DriverRegistry::with_defaults();
    Migrator::connect(&registry, &url, migrations, config)
        .await
        .with_context(|| format!("Failed to connect to {url}"))
}

/// Request a graceful stop of `handle`'s batch on Ctrl-C
pub(crate) fn interrupt_on_ctrl_c(handle: InterruptHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        eprintln!("Interrupt received, stopping after the current migration");
        handle.interrupt();
    })
}

fn arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "↑",
        Direction::Down => "↓",
    }
}

/// Print one line per applied step, then the failure if any.
pub(crate) fn print_report(report: &BatchReport) {
    if report.applied.is_empty() && report.aborted.is_none() {
        println!("No change");
        return;
    }

    for step in &report.applied {
        println!(
            "  ✓ {} {} ({}ms)",
            arrow(step.direction),
            step.file_name,
            step.duration.as_millis()
        );
    }

    if let Some(abort) = &report.aborted {
        println!(
            "  ✗ {} {} ({})",
            arrow(abort.direction),
            abort.file_name,
            abort.reason
        );
        for error in &abort.errors {
            eprintln!("    {}", error);
        }
    }

    println!();
    let total = report.total_duration();
    match &report.aborted {
        Some(_) => println!(
            "Aborted after {} migration(s) in {}ms",
            report.applied.len(),
            total.as_millis()
        ),
        None => println!(
            "Applied {} migration(s) in {}ms",
            report.applied.len(),
            total.as_millis()
        ),
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
