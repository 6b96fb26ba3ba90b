//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `run` - Build and publish driver images for one driver version
//! - `plan` - Dry run: show what a run would build
//! - `show` - Display information
//! - `preflight` - Run preflight checks

mod plan;
mod preflight;
mod run;
pub mod show;

pub use plan::cmd_plan;
pub use preflight::cmd_preflight;
pub use run::cmd_run;
pub use show::cmd_show;
