//! Idempotent publish gating.
//!
//! One kernel, one tag: before building a group the gate asks the registry
//! whether the kernel tag is already there. Re-runs against an up-to-date
//! registry skip every build. The gate only advises; the orchestrator acts.

use crate::registry::{PublishTarget, RegistryClient};

/// What the gate recommends for one kernel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Build,
    Skip,
}

/// The recommendation and the reason it was made, for the run summary.
#[derive(Debug, Clone)]
pub struct PublishDecision {
    pub action: PublishAction,
    pub reason: String,
}

impl PublishDecision {
    fn build(reason: impl Into<String>) -> Self {
        Self { action: PublishAction::Build, reason: reason.into() }
    }

    fn skip(reason: impl Into<String>) -> Self {
        Self { action: PublishAction::Skip, reason: reason.into() }
    }
}

/// Decide whether the group behind `tag` needs building.
///
/// A lookup failure is reported but never blocks the run: building an image
/// that already exists wastes minutes, skipping one that doesn't exist
/// loses the artifact. The gate errs toward building.
pub fn decide(
    registry: &dyn RegistryClient,
    target: &PublishTarget,
    tag: &str,
    force: bool,
) -> PublishDecision {
    if force {
        return PublishDecision::build("forced rebuild requested");
    }
    match registry.tag_exists(target, tag) {
        Ok(true) => PublishDecision::skip(format!("already published as {}", tag)),
        Ok(false) => PublishDecision::build("not yet published"),
        Err(e) => {
            eprintln!("  [WARN] could not check {} on {}: {:#}", tag, target.name(), e);
            PublishDecision::build("registry lookup inconclusive")
        }
    }
}
