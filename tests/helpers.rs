//! Shared test utilities for driverforge tests.
//!
//! Provides a temp-dir based `TestEnv` for config files and workspaces,
//! plus in-memory fakes for the four external collaborators. Suites use
//! the subset they need.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

use driverforge::builder::{BuildRequest, ImageBuilder};
use driverforge::catalog::{CatalogEntry, MatrixRule};
use driverforge::notes::NotesStore;
use driverforge::registry::{PublishTarget, RegistryClient};
use driverforge::resolve::DtkInspector;

/// Test environment with a temporary directory standing in for the
/// repository root (config files, build workspaces).
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Base directory (repository root simulation)
    pub base_dir: PathBuf,
}

impl TestEnv {
    /// Create a new test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_dir,
        }
    }

    /// Write a matrix config into the environment, returning its path.
    pub fn write_matrix(&self, json: &str) -> PathBuf {
        let path = self.base_dir.join("matrix.json");
        fs::write(&path, json).expect("Failed to write matrix");
        path
    }

    /// Write a DTK catalog into the environment, returning its path.
    pub fn write_catalog(&self, json: &str) -> PathBuf {
        let path = self.base_dir.join("dtk-catalog.json");
        fs::write(&path, json).expect("Failed to write catalog");
        path
    }
}

pub fn local_target() -> PublishTarget {
    PublishTarget::Local {
        registry: "localhost:5000".to_string(),
        repository: "neuron-driver".to_string(),
    }
}

pub fn ci_target() -> PublishTarget {
    PublishTarget::Ci {
        registry: "ghcr.io".to_string(),
        repository: "aws-neuron/driver-containers".to_string(),
    }
}

pub fn rule(driver: &str, ranges: &[&str]) -> MatrixRule {
    MatrixRule {
        driver: driver.to_string(),
        ocp_versions: ranges.iter().map(|r| r.to_string()).collect(),
    }
}

pub fn entry(version: &str, dtk: &str) -> CatalogEntry {
    CatalogEntry {
        version: version.to_string(),
        arch: "x86_64".to_string(),
        dtk: dtk.to_string(),
    }
}

/// Standard three-platform catalog: 4.16.1 and 4.16.2 share a DTK (and so
/// a kernel), 4.17.0 has its own.
pub fn abc_catalog() -> Vec<CatalogEntry> {
    vec![
        entry("4.16.1", "quay.io/dtk:a"),
        entry("4.16.2", "quay.io/dtk:a"),
        entry("4.17.0", "quay.io/dtk:b"),
    ]
}

/// Inspector matching [`abc_catalog`]: dtk:a -> 5.14.0-1, dtk:b -> 5.14.0-2.
pub fn abc_inspector() -> FakeInspector {
    FakeInspector::new(&[
        ("quay.io/dtk:a", "5.14.0-1"),
        ("quay.io/dtk:b", "5.14.0-2"),
    ])
}

// ---------------------------------------------------------------------------
// FakeInspector
// ---------------------------------------------------------------------------

/// In-memory DTK inspector backed by a reference -> kernel map. References
/// absent from the map fail, simulating an unpullable image.
#[derive(Debug, Default)]
pub struct FakeInspector {
    kernels: BTreeMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeInspector {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            kernels: pairs
                .iter()
                .map(|(dtk, kernel)| (dtk.to_string(), kernel.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DtkInspector for FakeInspector {
    fn kernel_version(&self, reference: &str) -> Result<String> {
        self.calls.lock().unwrap().push(reference.to_string());
        self.kernels
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow!("pull failed for {}", reference))
    }
}

// ---------------------------------------------------------------------------
// FakeRegistry
// ---------------------------------------------------------------------------

/// In-memory registry. Pushed tags become visible to later lookups, so a
/// test can run the pipeline twice and see the second run skip.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    pub tags: Mutex<BTreeSet<String>>,
    /// (image, tag) pairs in push order.
    pub pushed: Mutex<Vec<(String, String)>>,
    pub fail_tag_exists: bool,
    pub fail_list_tags: bool,
    pub fail_push_tags: BTreeSet<String>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(tags: &[&str]) -> Self {
        Self {
            tags: Mutex::new(tags.iter().map(|t| t.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn failing_lookups() -> Self {
        Self {
            fail_tag_exists: true,
            ..Self::default()
        }
    }

    pub fn fail_push_of(mut self, tag: &str) -> Self {
        self.fail_push_tags.insert(tag.to_string());
        self
    }

    /// Tags pushed during the test, in order.
    pub fn pushed_tags(&self) -> Vec<String> {
        self.pushed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, tag)| tag.clone())
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.lock().unwrap().contains(tag)
    }
}

impl RegistryClient for FakeRegistry {
    fn tag_exists(&self, _target: &PublishTarget, tag: &str) -> Result<bool> {
        if self.fail_tag_exists {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.tags.lock().unwrap().contains(tag))
    }

    fn list_tags(&self, _target: &PublishTarget) -> Result<Vec<String>> {
        if self.fail_list_tags {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.tags.lock().unwrap().iter().cloned().collect())
    }

    fn push(&self, _target: &PublishTarget, image: &str, tag: &str) -> Result<()> {
        if self.fail_push_tags.contains(tag) {
            return Err(anyhow!("denied: requested access to {} is denied", tag));
        }
        self.tags.lock().unwrap().insert(tag.to_string());
        self.pushed
            .lock()
            .unwrap()
            .push((image.to_string(), tag.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeBuilder
// ---------------------------------------------------------------------------

/// Records build requests; fails for configured kernels.
#[derive(Debug, Default)]
pub struct FakeBuilder {
    pub requests: Mutex<Vec<BuildRequest>>,
    pub fail_kernels: BTreeSet<String>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(kernel: &str) -> Self {
        let mut fail_kernels = BTreeSet::new();
        fail_kernels.insert(kernel.to_string());
        Self {
            requests: Mutex::new(Vec::new()),
            fail_kernels,
        }
    }

    pub fn build_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn built_kernels(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.kernel_version.clone())
            .collect()
    }

    pub fn dtk_for(&self, kernel: &str) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.kernel_version == kernel)
            .map(|r| r.dtk_image.clone())
    }
}

impl ImageBuilder for FakeBuilder {
    fn build(&self, request: &BuildRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_kernels.contains(&request.kernel_version) {
            return Err(anyhow!(
                "make: *** [modules] Error 2 (kernel {})",
                request.kernel_version
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeNotes
// ---------------------------------------------------------------------------

/// In-memory release-document store.
#[derive(Debug, Default)]
pub struct FakeNotes {
    pub document: Mutex<Option<String>>,
    pub publish_calls: Mutex<u32>,
    pub fail_publish: bool,
}

impl FakeNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    pub fn body(&self) -> Option<String> {
        self.document.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> u32 {
        *self.publish_calls.lock().unwrap()
    }
}

impl NotesStore for FakeNotes {
    fn fetch(&self, _driver_version: &str) -> Result<Option<String>> {
        Ok(self.document.lock().unwrap().clone())
    }

    fn publish(&self, _driver_version: &str, body: &str) -> Result<()> {
        if self.fail_publish {
            return Err(anyhow!("HTTP 403: rate limited"));
        }
        *self.publish_calls.lock().unwrap() += 1;
        *self.document.lock().unwrap() = Some(body.to_string());
        Ok(())
    }
}
