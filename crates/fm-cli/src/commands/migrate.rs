//! Up, down, redo, reset, migrate and goto command implementations

use anyhow::Result;
use fm_core::Version;

use crate::cli::GlobalArgs;
use crate::commands::common::{self, ExitCode};

/// Batch operation selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Up,
    Down,
    Redo,
    Reset,
    Relative(i64),
    Goto(u64),
}

/// Run one batch operation and print its report
pub(crate) async fn execute(operation: Operation, global: &GlobalArgs) -> Result<()> {
    let mut migrator = common::open_migrator(global).await?;
    let watcher = common::interrupt_on_ctrl_c(migrator.interrupt_handle());

    let outcome = match operation {
        Operation::Up => migrator.up().await,
        Operation::Down => migrator.down().await,
        Operation::Redo => migrator.redo().await,
        Operation::Reset => migrator.reset().await,
        Operation::Relative(n) => migrator.migrate(n).await,
        Operation::Goto(target) => migrator.goto(Version::new(target)).await,
    };
    watcher.abort();

    let close = migrator.close().await;
    let report = outcome?;
    if let Err(e) = close {
        log::warn!("{}", e);
    }

    common::print_report(&report);
    if report.is_aborted() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}
