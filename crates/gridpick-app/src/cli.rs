//! Command-line interface for gridpick.

use clap::{Parser, Subcommand};

/// Weekly snake draft of race drivers.
#[derive(Parser, Debug)]
#[command(name = "gridpick")]
#[command(about = "Run a weekly snake draft of race drivers", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create (or reset) the draft for a race week
    Start {
        /// Race week; defaults to the current week
        #[arg(long)]
        period: Option<u32>,

        /// Odd-round draft order, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        order: Vec<String>,

        /// Number of rounds; defaults to the league setting
        #[arg(long)]
        rounds: Option<u32>,
    },

    /// Submit a pick for the participant on the clock
    Pick {
        #[arg(long)]
        period: Option<u32>,

        /// Participant making the pick
        #[arg(long = "as", value_name = "PARTICIPANT")]
        participant: String,

        /// Driver to draft
        #[arg(long)]
        item: String,

        /// Add the driver to the catalog first if it is not already there
        #[arg(long)]
        custom: bool,
    },

    /// Show the draft state for a week
    State {
        #[arg(long)]
        period: Option<u32>,
    },

    /// List the final rosters for a week
    Rosters {
        #[arg(long)]
        period: Option<u32>,
    },

    /// List the picks made in a week
    Picks {
        #[arg(long)]
        period: Option<u32>,

        /// Only show this participant's picks
        #[arg(long)]
        participant: Option<String>,
    },

    /// Re-run consolidation for a completed week
    Consolidate {
        #[arg(long)]
        period: Option<u32>,
    },

    /// Add a custom driver to the catalog
    RegisterItem {
        /// Driver name
        name: String,
    },

    /// Show or change the current race week
    Week {
        #[command(subcommand)]
        action: WeekAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum WeekAction {
    /// Print the current week
    Show,
    /// Set the current week
    Set { period: u32 },
    /// Move to the next week
    Advance,
}
