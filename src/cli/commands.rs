//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// SpaceOdT - Webex configuration export and telephony provisioning.
#[derive(Parser, Debug)]
#[command(name = "spaceodt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the settings file.
    #[arg(short, long, global = true, env = "SPACEODT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long = "format", id = "format", global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export organizations, locations, people, groups and group members.
    ExportAll {
        /// Artifacts directory (overrides the settings file).
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Do not write `report.json` and `report/index.html`.
        #[arg(long)]
        no_report: bool,

        /// Skip the `group_members` module.
        #[arg(long)]
        skip_group_members: bool,

        /// Do not write `cache.json`.
        #[arg(long)]
        no_cache: bool,
    },

    /// Build the v2.1 provisioning plan and write `plan.csv`.
    Plan {
        /// Artifacts directory (overrides the settings file).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Execute every planned action.
    Run {
        /// Mutate remote state; without it the run is a dry run.
        #[arg(long)]
        apply: bool,
    },

    /// Execute a single planned action.
    Action {
        /// Action id from `plan.csv`.
        id: usize,

        /// Mutate remote state; without it only the before state is read.
        #[arg(long)]
        apply: bool,
    },

    /// Run the v2 softphone stages.
    Softphones {
        /// JSON file with one decision per stage; prompts when absent.
        #[arg(long)]
        decisions: Option<PathBuf>,

        /// Mutate remote state.
        #[arg(long)]
        apply: bool,
    },

    /// Serve the local HTTP UI.
    Serve {
        /// Bind host (overrides the settings file).
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides the settings file).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a direct transformation.
    Transform {
        /// Transformation to run.
        #[command(subcommand)]
        command: TransformCommands,
    },

    /// Generate dummy lab users as CSV.
    GenerateUsers {
        /// Email domain.
        #[arg(long)]
        domain: String,

        /// Number of users.
        #[arg(long, default_value_t = 25)]
        count: usize,

        /// Output CSV.
        #[arg(long, default_value = "tmp/dummy_users.csv")]
        output: PathBuf,

        /// Location name written on every row.
        #[arg(long, default_value = "LAB-MAD")]
        location: String,

        /// Country prefix without `+`.
        #[arg(long, default_value = "34")]
        country_code: String,

        /// First extension minus one.
        #[arg(long, default_value_t = 4000)]
        base_extension: u32,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

/// Direct transformations.
#[derive(Subcommand, Debug)]
pub enum TransformCommands {
    /// Point a location's PSTN at a premises route.
    ConfigurePstn {
        /// Location id.
        #[arg(long)]
        location_id: String,

        /// `ROUTE_GROUP` or `TRUNK`.
        #[arg(long, default_value = "ROUTE_GROUP")]
        premise_route_type: String,

        /// Route group or trunk id.
        #[arg(long)]
        premise_route_id: String,

        /// Organization id.
        #[arg(long)]
        org_id: Option<String>,
    },

    /// Add inactive numbers to a location.
    AddNumbers {
        /// Location id.
        #[arg(long)]
        location_id: String,

        /// Numbers to add; repeat or separate with commas.
        #[arg(long = "number", required = true, value_delimiter = ',')]
        numbers: Vec<String>,

        /// `DID`, `TOLLFREE` or `MOBILE`.
        #[arg(long, default_value = "DID")]
        number_type: String,

        /// Organization id.
        #[arg(long)]
        org_id: Option<String>,
    },

    /// Set a location's main number.
    UpdateMainNumber {
        /// Location id.
        #[arg(long)]
        location_id: String,

        /// New main number.
        #[arg(long)]
        phone_number: String,

        /// Calling line name.
        #[arg(long)]
        calling_line_name: Option<String>,

        /// Organization id.
        #[arg(long)]
        org_id: Option<String>,
    },

    /// Forward a user to the legacy platform.
    UserForwardLegacy {
        /// Person id.
        #[arg(long)]
        person_id: String,

        /// Extension used for the default destination.
        #[arg(long)]
        extension: String,

        /// Destination; defaults to `53<extension>`.
        #[arg(long)]
        destination: Option<String>,

        /// Organization id.
        #[arg(long)]
        org_id: Option<String>,
    },
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}
