//! List command - refresh and print the sorted plant list.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use plantwatch::observable::Subscription;
use plantwatch::{FilterKey, LoadState, Plant, PlantListController};

use crate::error::CliError;
use crate::runner::CliRunner;

/// How long the list must stay unchanged before it is printed.
const SETTLE_WINDOW: Duration = Duration::from_millis(250);

/// Arguments for the list command.
pub struct ListArgs {
    pub key: FilterKey,
    pub no_refresh: bool,
}

/// Run the list command.
pub fn run(args: ListArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("list");

    let refresh = if args.no_refresh { Some(false) } else { None };
    let repository = runner.create_repository(refresh)?;
    let wait_limit = Duration::from_secs(runner.config().service.timeout_secs) * 2;
    let controller = runner.create_controller(repository);

    let (state, plants) = runner.block_on(async {
        let mut states = controller.observe_load_state();
        let spinner = spinner(args.key);

        // The controller already refreshes the unfiltered list on creation.
        let state = if args.key.is_filtered() {
            controller
                .set_filter_key(args.key)
                .wait()
                .await
                .terminal_state()
        } else {
            wait_until_settled(&mut states).await
        };
        spinner.finish_and_clear();

        let mut plants = controller.observe_sorted_plants();
        let list = latest_settled(&mut plants, wait_limit).await;
        (state, list)
    });

    if let LoadState::Error(message) = &state {
        eprintln!(
            "{} {}",
            style("Refresh failed:").red().bold(),
            style(message).red()
        );
        eprintln!();
    }

    print_plants(&controller, plants.as_deref().unwrap_or_default());
    Ok(())
}

fn spinner(key: FilterKey) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(match key {
        FilterKey::Zone(zone) => format!("Refreshing plants for zone {}...", zone),
        FilterKey::Unfiltered => "Refreshing plants...".to_string(),
    });
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Wait for the first state that is not `Loading`.
async fn wait_until_settled(states: &mut Subscription<LoadState>) -> LoadState {
    while let Some(state) = states.recv().await {
        if !state.is_loading() {
            return state;
        }
    }
    LoadState::Idle
}

/// Most recent list once no new list has arrived for [`SETTLE_WINDOW`].
async fn latest_settled(
    plants: &mut Subscription<Vec<Plant>>,
    limit: Duration,
) -> Option<Vec<Plant>> {
    let mut latest = match tokio::time::timeout(limit, plants.recv()).await {
        Ok(Some(list)) => list,
        _ => return None,
    };
    while let Ok(Some(list)) = tokio::time::timeout(SETTLE_WINDOW, plants.recv()).await {
        latest = list;
    }
    Some(latest)
}

fn print_plants(controller: &PlantListController, plants: &[Plant]) {
    let title = match controller.filter_key() {
        FilterKey::Unfiltered => "All plants".to_string(),
        FilterKey::Zone(zone) => format!("Plants in grow zone {}", zone),
    };
    println!("{} ({})", style(title).bold(), plants.len());
    println!();

    if plants.is_empty() {
        println!("  (none)");
        return;
    }

    for plant in plants {
        println!("{}", format_row(plant));
    }
}

fn format_row(plant: &Plant) -> String {
    format!(
        "  {:<24} zone {:>3}  water every {:>2} days  {}",
        plant.name,
        plant.grow_zone_number,
        plant.watering_interval,
        style(&plant.plant_id).dim()
    )
}
