mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    AddArgs, EditArgs, cmd_add, cmd_browse, cmd_category_add, cmd_category_delete,
    cmd_category_list, cmd_config_get, cmd_config_list, cmd_config_set, cmd_config_unset,
    cmd_delete, cmd_done, cmd_edit, cmd_list, cmd_pin, cmd_stats,
};
use crate::config::Config;
use tally_core::TrackerService;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "A small habit tracker for the terminal",
    long_about = "A small habit tracker for the terminal.\n\n\
        Trackers are habits on a weekly schedule or irregular events. Mark them done per day, \
        then browse them by category with pinning, search, and status filters.\n\n\
        A <TRACKER> argument accepts a full id, an id prefix, or the tracker's name."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a habit or irregular event
    Add {
        /// Tracker name
        name: String,
        /// Days it recurs on: every-day, weekdays, weekends, or e.g. "mon,wed,fri"
        #[arg(short, long)]
        days: Option<String>,
        /// Irregular event (may happen on any day)
        #[arg(long)]
        event: bool,
        /// Category title; created if it does not exist
        #[arg(short, long)]
        category: Option<String>,
        /// Emoji shown next to the name
        #[arg(long)]
        emoji: Option<String>,
        /// Color token
        #[arg(long)]
        color: Option<String>,
        /// Pin to the top section
        #[arg(long)]
        pin: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a tracker's name, schedule, category, emoji, or color
    Edit {
        /// Tracker id, id prefix, or name
        tracker: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New schedule (habits only)
        #[arg(short, long)]
        days: Option<String>,
        /// Move to this category
        #[arg(short, long)]
        category: Option<String>,
        /// Remove from its category
        #[arg(long)]
        no_category: bool,
        /// New emoji
        #[arg(long)]
        emoji: Option<String>,
        /// New color token
        #[arg(long)]
        color: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a tracker and all its completion records
    Delete {
        /// Tracker id, id prefix, or name
        tracker: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pin a tracker to the top section
    Pin {
        /// Tracker id, id prefix, or name
        tracker: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Unpin a tracker
    Unpin {
        /// Tracker id, id prefix, or name
        tracker: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a tracker done for a day, or undo it if already done
    Done {
        /// Tracker id, id prefix, or name
        tracker: String,
        /// Day (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the trackers visible for a day, grouped into sections
    List {
        /// Day (YYYY-MM-DD, today, yesterday, tomorrow; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Status filter: all, due-today, completed, not-completed
        #[arg(short, long)]
        filter: Option<String>,
        /// Only trackers whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive view: type to search, results refresh as you pause
    Browse {
        /// Day to start on (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Status filter to start with
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Streaks, perfect days, and averages
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// View or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Create an empty category
    Add {
        /// Category title
        title: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List categories with their trackers
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a category; its trackers become uncategorized
    Delete {
        /// Category title
        title: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print a setting
    Get {
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a setting
    Set {
        key: String,
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset a setting to its default
    Unset {
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every setting
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    debug!(db = %config.db_path.display(), "resolved data location");
    let mut svc = TrackerService::open(&config.db_path)?;

    match cli.command {
        Commands::Add {
            name,
            days,
            event,
            category,
            emoji,
            color,
            pin,
            json,
        } => cmd_add(
            &svc,
            AddArgs {
                name,
                days,
                event,
                category,
                emoji,
                color,
                pin,
            },
            json,
        ),
        Commands::Edit {
            tracker,
            name,
            days,
            category,
            no_category,
            emoji,
            color,
            json,
        } => cmd_edit(
            &svc,
            &tracker,
            EditArgs {
                name,
                days,
                category,
                no_category,
                emoji,
                color,
            },
            json,
        ),
        Commands::Delete { tracker, json } => cmd_delete(&svc, &tracker, json),
        Commands::Pin { tracker, json } => cmd_pin(&svc, &tracker, true, json),
        Commands::Unpin { tracker, json } => cmd_pin(&svc, &tracker, false, json),
        Commands::Done {
            tracker,
            date,
            json,
        } => cmd_done(&svc, &tracker, date, json),
        Commands::List {
            date,
            filter,
            search,
            json,
        } => cmd_list(&mut svc, date, filter.as_deref(), search, json),
        Commands::Browse { date, filter } => cmd_browse(&mut svc, date, filter.as_deref()).await,
        Commands::Stats { json } => cmd_stats(&svc, json),
        Commands::Category { command } => match command {
            CategoryCommands::Add { title, json } => cmd_category_add(&svc, &title, json),
            CategoryCommands::List { json } => cmd_category_list(&svc, json),
            CategoryCommands::Delete { title, json } => cmd_category_delete(&svc, &title, json),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Get { key, json } => cmd_config_get(&svc, &key, json),
            ConfigCommands::Set { key, value, json } => cmd_config_set(&mut svc, &key, &value, json),
            ConfigCommands::Unset { key, json } => cmd_config_unset(&mut svc, &key, json),
            ConfigCommands::List { json } => cmd_config_list(&svc, json),
        },
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
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "tally", "add", "Water", "--days", "mon,wed,fri", "-c", "Health", "--pin",
        ])
        .unwrap();
        match cli.command {
            Commands::Add {
                name,
                days,
                category,
                pin,
                event,
                ..
            } => {
                assert_eq!(name, "Water");
                assert_eq!(days.as_deref(), Some("mon,wed,fri"));
                assert_eq!(category.as_deref(), Some("Health"));
                assert!(pin);
                assert!(!event);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_on_disk_database_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::at(tmp.path().join("data").join("tally.db")).unwrap();

        let svc = TrackerService::open(&config.db_path).unwrap();
        svc.create_category("Health").unwrap();
        drop(svc);

        let svc = TrackerService::open(&config.db_path).unwrap();
        let titles: Vec<String> = svc
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Health"]);
    }
}
