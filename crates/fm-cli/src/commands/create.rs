//! Create command implementation

use anyhow::{Context, Result};
use chrono::Utc;
use fm_core::{create_migration, Version};

use crate::cli::{CreateArgs, GlobalArgs};
use crate::commands::common::Project;

/// Execute the create command
pub(crate) async fn execute(args: &CreateArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let extension = args
        .ext
        .as_deref()
        .unwrap_or(&project.config.extension)
        .trim_start_matches('.');
    let version = args
        .version
        .map(Version::new)
        .unwrap_or_else(|| Version::from_timestamp(Utc::now()));

    let (up, down) = create_migration(&project.migrations_dir, &args.name, extension, version)
        .with_context(|| format!("Failed to create migration '{}'", args.name))?;

    println!("Created {}", up.display());
    println!("Created {}", down.display());
    Ok(())
}
