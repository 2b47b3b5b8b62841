//! Sort order command - show the catalogue's custom plant order.

use console::style;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the sort-order command.
pub fn run() -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("sort-order");

    let repository = runner.create_repository(None)?;
    let order = runner.block_on(repository.custom_sort_order());

    if !repository.sort_order_cache().is_ready() {
        eprintln!(
            "{}",
            style("Could not fetch the custom sort order; lists are sorted by name.").yellow()
        );
        return Ok(());
    }

    println!("Custom sort order ({} plants)", order.len());
    println!();
    for (position, plant_id) in order.iter().enumerate() {
        println!("  {:>3}. {}", position + 1, plant_id);
    }
    if order.is_empty() {
        println!("  (empty; lists are sorted by name)");
    }

    Ok(())
}
