//! Driverforge - AWS Neuron driver container builder for OpenShift.
//!
//! Builds one kernel-module image per unique kernel across the targeted
//! OCP releases:
//! - expands the driver -> OCP-range matrix against the DTK catalog
//! - resolves each DTK image to its kernel and dedups by kernel
//! - builds/pushes only kernels not already published (idempotent)
//! - keeps the per-driver release notes in sync with published tags
#![allow(dead_code, unused_imports)]

mod builder;
mod catalog;
mod commands;
mod config;
mod errors;
mod gate;
mod grouping;
mod matrix;
mod notes;
mod orchestrator;
mod preflight;
mod process;
mod registry;
mod resolve;
mod timing;
mod version;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::Settings;

#[derive(Parser)]
#[command(name = "driverforge")]
#[command(about = "Builds AWS Neuron kernel-driver container images for OpenShift")]
#[command(
    after_help = "QUICK START:\n  driverforge preflight          Check tools and configs\n  driverforge plan 2.19.64.0     Show what a run would build\n  driverforge run 2.19.64.0      Build and publish driver images"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish driver images for one driver version
    Run {
        /// Driver version to build (must have a matrix rule)
        driver: String,

        /// Optional platform filter: MAJOR.MINOR or MAJOR.MINOR.PATCH
        filter: Option<String>,
    },

    /// Show what a run would build without building anything
    Plan {
        /// Driver version to plan for
        driver: String,

        /// Optional platform filter: MAJOR.MINOR or MAJOR.MINOR.PATCH
        filter: Option<String>,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Run preflight checks (verify tools and configs before a run)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Show matrix rules (driver -> OCP ranges)
    Matrix,
    /// Show the DTK catalog (OCP release -> DTK image)
    Catalog,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    // Load .env if present
    dotenvy::dotenv().ok();
    let settings = Settings::load(&base_dir);

    match cli.command {
        Commands::Run { driver, filter } => {
            commands::cmd_run(&settings, &driver, filter.as_deref())?;
        }

        Commands::Plan { driver, filter } => {
            commands::cmd_plan(&settings, &driver, filter.as_deref())?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Matrix => commands::show::ShowTarget::Matrix,
                ShowTarget::Catalog => commands::show::ShowTarget::Catalog,
            };
            commands::cmd_show(&settings, show_target)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&settings, strict)?;
        }
    }

    Ok(())
}
