//! Image build executor seam.
//!
//! One build per kernel group: the orchestrator hands the builder a DTK
//! reference, driver and kernel versions, and a local tag to produce. The
//! production implementation shells out to `podman build` against the
//! repository's Containerfile; driver source retrieval happens inside the
//! Containerfile, not here.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::process::Cmd;

/// Inputs for one kernel group's image build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Driver Toolkit image providing the kernel headers and toolchain.
    pub dtk_image: String,
    pub driver_version: String,
    pub kernel_version: String,
    /// Tag the built image is stored under in local container storage,
    /// pushed from there by the orchestrator.
    pub local_tag: String,
    /// Scratch directory for build byproducts (image-id file). Owned by the
    /// caller's [`BuildWorkspace`].
    pub scratch_dir: PathBuf,
}

impl BuildRequest {
    /// File the build writes the produced image ID into.
    pub fn iidfile(&self) -> PathBuf {
        self.scratch_dir.join("image-id")
    }
}

/// Build executor. Production shells out to podman; tests record requests.
pub trait ImageBuilder {
    fn build(&self, request: &BuildRequest) -> Result<()>;
}

/// Production builder: `podman build` with the Containerfile at the
/// repository root as recipe and the repository as context.
pub struct PodmanBuilder {
    containerfile: PathBuf,
    context_dir: PathBuf,
}

impl PodmanBuilder {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            containerfile: base_dir.join("Containerfile"),
            context_dir: base_dir.to_path_buf(),
        }
    }
}

impl ImageBuilder for PodmanBuilder {
    fn build(&self, request: &BuildRequest) -> Result<()> {
        let iidfile = request.iidfile();
        Cmd::new("podman")
            .arg("build")
            .arg("--build-arg")
            .arg(format!("DTK_IMAGE={}", request.dtk_image))
            .arg("--build-arg")
            .arg(format!("DRIVER_VERSION={}", request.driver_version))
            .arg("--build-arg")
            .arg(format!("KERNEL_VERSION={}", request.kernel_version))
            .arg("--iidfile")
            .arg_path(&iidfile)
            .arg("-f")
            .arg_path(&self.containerfile)
            .arg("-t")
            .arg(&request.local_tag)
            .arg_path(&self.context_dir)
            .error_msg(format!(
                "podman build failed for kernel {}",
                request.kernel_version
            ))
            .run_streaming()?;

        // podman exits zero without an iidfile in some cache-only corner
        // cases; an image we cannot identify is not a usable artifact.
        let image_id = fs::read_to_string(&iidfile)
            .with_context(|| format!("Build left no image id at {}", iidfile.display()))?;
        if image_id.trim().is_empty() {
            bail!("Build for kernel {} produced an empty image id", request.kernel_version);
        }
        Ok(())
    }
}

/// Scoped resources for one kernel group's build: the scratch directory and
/// the images that accumulate in local container storage. Released on every
/// exit path so a long matrix does not fill the disk.
pub struct BuildWorkspace {
    dir: PathBuf,
    local_tag: String,
    dtk_image: String,
}

/// Directory-name form of a kernel version. The value originates in a
/// pulled image's descriptor; mapping anything outside the kernel release
/// charset to `-` keeps the workspace a single path component under the
/// base directory, so the stale-wipe and the drop cleanup cannot reach
/// outside it.
fn dir_component(kernel_version: &str) -> String {
    kernel_version
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '-',
        })
        .collect()
}

impl BuildWorkspace {
    /// Create a fresh scratch directory for `kernel_version`, wiping any
    /// leftover from an interrupted earlier run.
    pub fn create(
        base_dir: &Path,
        kernel_version: &str,
        local_tag: &str,
        dtk_image: &str,
    ) -> Result<Self> {
        let dir = base_dir.join(format!(".build-{}", dir_component(kernel_version)));
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to clear stale workspace {}", dir.display()))?;
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create workspace {}", dir.display()))?;
        Ok(Self {
            dir,
            local_tag: local_tag.to_string(),
            dtk_image: dtk_image.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for BuildWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
        // Untag the built image and the pulled DTK; --ignore makes this a
        // no-op for whatever never materialized.
        let _ = Cmd::new("podman")
            .args(["rmi", "--ignore"])
            .arg(&self.local_tag)
            .arg(&self.dtk_image)
            .allow_fail()
            .run();
    }
}
