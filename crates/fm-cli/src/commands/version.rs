//! Version and versions command implementations

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{GlobalArgs, VersionsArgs, VersionsOutput};
use crate::commands::common;

/// One row of `fm versions` output
#[derive(Debug, Serialize)]
struct VersionRow {
    version: u64,
    name: Option<String>,
    applied: bool,
}

/// Execute the version command
pub(crate) async fn execute_version(global: &GlobalArgs) -> Result<()> {
    let migrator = common::open_migrator(global).await?;
    let current = migrator.version().await;
    migrator.close().await?;

    match current? {
        Some(version) => println!("{}", version),
        None => println!("No migrations applied"),
    }
    Ok(())
}

/// Execute the versions command
pub(crate) async fn execute_versions(args: &VersionsArgs, global: &GlobalArgs) -> Result<()> {
    let migrator = common::open_migrator(global).await?;
    let status = migrator.status().await;
    migrator.close().await?;

    let rows: Vec<VersionRow> = status?
        .into_iter()
        .map(|s| VersionRow {
            version: s.version.get(),
            name: s.name,
            applied: s.applied,
        })
        .collect();

    match args.output {
        VersionsOutput::Json => {
            let json = serde_json::to_string_pretty(&rows).context("Failed to serialize versions")?;
            println!("{}", json);
        }
        VersionsOutput::Table => print_table(&rows),
    }
    Ok(())
}

fn print_table(rows: &[VersionRow]) {
    if rows.is_empty() {
        println!("No migrations found");
        return;
    }

    let name_width = rows
        .iter()
        .filter_map(|r| r.name.as_deref())
        .map(str::len)
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    println!("{:<16} {:<name_width$} STATUS", "VERSION", "NAME");
    for row in rows {
        let status = if row.applied { "applied" } else { "pending" };
        println!(
            "{:<16} {:<name_width$} {}",
            row.version,
            row.name.as_deref().unwrap_or("(missing)"),
            status
        );
    }
}
