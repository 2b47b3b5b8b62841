//! PlantWatch CLI - sorted, filterable plant catalogue.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use console::style;

use plantwatch::FilterKey;

use commands::config::ConfigCommands;
use commands::list::ListArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "plantwatch", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Refresh from the catalogue and print the sorted plant list
    List {
        /// Only show plants in this grow zone
        #[arg(long, short, conflicts_with = "filter")]
        zone: Option<i32>,

        /// Filter as `all`, `zone N`, `zone:N` or a bare zone number
        #[arg(long, short)]
        filter: Option<FilterKey>,

        /// Show stored plants without fetching from the catalogue
        #[arg(long)]
        no_refresh: bool,
    },

    /// Show the custom sort order used for plant lists
    SortOrder,

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::List {
            zone,
            filter,
            no_refresh,
        } => commands::list::run(ListArgs {
            key: filter_key(zone, filter),
            no_refresh,
        }),
        Commands::SortOrder => commands::sort_order::run(),
        Commands::Config { command } => commands::config::run(command),
    }
}

/// `--filter` wins; otherwise `--zone` narrows and no flag means all plants.
fn filter_key(zone: Option<i32>, filter: Option<FilterKey>) -> FilterKey {
    filter.unwrap_or_else(|| FilterKey::from(zone))
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_with_zone() {
        let cli = Cli::try_parse_from(["plantwatch", "list", "--zone", "9"]).unwrap();
        match cli.command {
            Commands::List {
                zone,
                filter,
                no_refresh,
            } => {
                assert_eq!(filter_key(zone, filter), FilterKey::Zone(9));
                assert!(!no_refresh);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_with_filter_forms() {
        for (arg, expected) in [
            ("all", FilterKey::Unfiltered),
            ("zone 4", FilterKey::Zone(4)),
            ("zone:7", FilterKey::Zone(7)),
            ("12", FilterKey::Zone(12)),
        ] {
            let cli = Cli::try_parse_from(["plantwatch", "list", "--filter", arg]).unwrap();
            match cli.command {
                Commands::List { zone, filter, .. } => {
                    assert_eq!(filter_key(zone, filter), expected, "arg {arg:?}");
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }
    }

    #[test]
    fn test_list_without_filter_is_unfiltered() {
        let cli = Cli::try_parse_from(["plantwatch", "list"]).unwrap();
        match cli.command {
            Commands::List { zone, filter, .. } => {
                assert_eq!(filter_key(zone, filter), FilterKey::Unfiltered);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_list_rejects_bad_filter_and_conflicting_flags() {
        assert!(Cli::try_parse_from(["plantwatch", "list", "--filter", "shade"]).is_err());
        assert!(Cli::try_parse_from([
            "plantwatch", "list", "--zone", "3", "--filter", "all"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_config_set() {
        let cli =
            Cli::try_parse_from(["plantwatch", "config", "set", "refresh.enabled", "false"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Set { .. }
            }
        ));
    }
}
