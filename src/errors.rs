//! Error taxonomy for a build run.
//!
//! Severity is part of the type, not the call site:
//! - [`ConfigError`] is fatal. It aborts the run before the first job starts.
//! - [`ResolveError`] drops one platform version from the run with a warning.
//! - [`JobError`] fails one kernel group; the run continues to the next group.

use thiserror::Error;

/// Fatal configuration problems. No job may start once one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The user-supplied filter is neither `MAJOR.MINOR` nor `MAJOR.MINOR.PATCH`.
    #[error("invalid platform version filter '{filter}': expected MAJOR.MINOR or MAJOR.MINOR.PATCH")]
    InvalidFilterFormat { filter: String },

    /// The requested driver version has no rule in the build matrix.
    #[error("driver version '{driver}' is not declared in the build matrix")]
    DriverNotInMatrix { driver: String },

    /// The declared version ranges selected nothing from the catalog.
    #[error("no catalog versions match driver '{driver}' (ranges: {})", .ranges.join(", "))]
    NoMatchingVersions { driver: String, ranges: Vec<String> },

    /// A matrix rule declares a range that is not a `MAJOR.MINOR` line.
    #[error("matrix rule for driver '{driver}' has invalid version range '{range}': expected MAJOR.MINOR")]
    InvalidMatrixRange { driver: String, range: String },

    /// The catalog file violates its own invariants.
    #[error("invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    /// The selected publish target needs a credential that is not set.
    #[error("credential {variable} must be set for the {target} publish target")]
    MissingCredential { variable: String, target: String },
}

/// Kernel resolution failed for a single platform version. The entry is
/// dropped with a warning; the run is never aborted for one of these.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The build environment could not be pulled or its descriptor read.
    #[error("failed to inspect build environment '{reference}': {cause:#}")]
    Inspect {
        reference: String,
        cause: anyhow::Error,
    },

    /// The descriptor was readable but its kernel version does not look like one.
    #[error("build environment '{reference}' reports implausible kernel version '{value}'")]
    ImplausibleKernel { reference: String, value: String },
}

/// Failure of one kernel group's build-and-publish. Recorded in the run
/// result; subsequent groups still execute.
#[derive(Debug, Error)]
pub enum JobError {
    /// The external build step failed.
    #[error("build failed for kernel {kernel}: {cause:#}")]
    Build {
        kernel: String,
        cause: anyhow::Error,
    },

    /// A tag push failed after a successful build. A built-but-unpublished
    /// artifact is not a success.
    #[error("publish of tag '{tag}' failed: {cause:#}")]
    Publish { tag: String, cause: anyhow::Error },
}
