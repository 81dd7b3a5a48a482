//! Foodshare Command-Line Client
//!
//! Loads the donation dataset, runs reports and records claims against a
//! local store file.

mod commands;
mod formatter;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use foodshare_core::{
    DatabaseConfig, ListingFilter, QueryParams, SourceConfig, TableKind, DEFAULT_DATABASE_PATH,
};
use formatter::OutputFormat;
use tracing_subscriber::EnvFilter;

/// Foodshare Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "foodshare")]
#[command(version, about = "Food donation ingestion, reporting and claims")]
pub struct Args {
    /// Path to the store file
    #[arg(long, global = true, default_value = DEFAULT_DATABASE_PATH)]
    pub db: PathBuf,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Disable the report result cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Store configuration from command-line arguments.
    pub fn database_config(&self) -> DatabaseConfig {
        let config = DatabaseConfig::new(&self.db);
        if self.no_cache {
            config.without_cache()
        } else {
            config
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the four CSV sources, replacing the store contents
    Ingest(IngestArgs),

    /// List the available reports
    Queries,

    /// Run a named report
    Query {
        /// Report name (see `queries`)
        name: String,

        /// City for city-scoped reports
        #[arg(long)]
        city: Option<String>,

        /// Reference date for expiry windows (YYYY-MM-DD, default today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Run one read-only SQL statement
    Sql {
        /// Statement text
        text: String,
    },

    /// Submit or update a claim
    Claim {
        #[command(subcommand)]
        action: ClaimCommand,
    },

    /// Show claims with food and receiver details
    Claims,

    /// Browse food listings
    Listings {
        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        food_type: Option<String>,

        #[arg(long)]
        meal_type: Option<String>,
    },

    /// Browse providers
    Providers {
        /// Provider type
        #[arg(long = "type")]
        provider_type: Option<String>,
    },

    /// Browse receivers
    Receivers {
        /// Receiver type
        #[arg(long = "type")]
        receiver_type: Option<String>,
    },

    /// Headline counts
    Dashboard,
}

#[derive(Subcommand, Debug)]
pub enum ClaimCommand {
    /// Submit a new pending claim
    Submit {
        #[arg(long)]
        food_id: i64,

        #[arg(long)]
        receiver_id: i64,
    },

    /// Change a claim's status (Pending, Completed or Cancelled)
    Update {
        #[arg(long)]
        claim_id: i64,

        #[arg(long)]
        status: String,
    },
}

/// Source locations for `ingest`.
#[derive(ClapArgs, Debug)]
pub struct IngestArgs {
    /// Directory holding the CSV sources
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Providers file name
    #[arg(long)]
    pub providers: Option<String>,

    /// Receivers file name
    #[arg(long)]
    pub receivers: Option<String>,

    /// Food listings file name
    #[arg(long)]
    pub listings: Option<String>,

    /// Claims file name
    #[arg(long)]
    pub claims: Option<String>,
}

impl IngestArgs {
    /// Convert command-line arguments to source configuration.
    pub fn into_source_config(self) -> SourceConfig {
        let mut config = SourceConfig::new(self.data_dir);
        for (kind, name) in [
            (TableKind::Providers, self.providers),
            (TableKind::Receivers, self.receivers),
            (TableKind::FoodListings, self.listings),
            (TableKind::Claims, self.claims),
        ] {
            if let Some(name) = name {
                config = config.with_file(kind, name);
            }
        }
        config
    }
}

/// Report parameters from `query` arguments.
pub fn query_params(city: Option<String>, today: Option<NaiveDate>) -> QueryParams {
    let mut params = QueryParams::new();
    if let Some(city) = city {
        params = params.with_city(city);
    }
    if let Some(today) = today {
        params = params.with_today(today);
    }
    params
}

/// Listing filter from `listings` arguments.
pub fn listing_filter(
    city: Option<String>,
    food_type: Option<String>,
    meal_type: Option<String>,
) -> ListingFilter {
    ListingFilter {
        city,
        food_type,
        meal_type,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("foodshare=info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.database_config();
    let formatter = formatter::create_formatter(args.format);

    let mut db = foodshare_core::Database::open(config)?;
    let output = commands::execute(&mut db, args.command, &*formatter)?;
    db.close()?;

    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
