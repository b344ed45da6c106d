// ============================================================
// Layer 6 — Run Metadata
// ============================================================
// Written once per run as {output_dir}/train_info.yml:
//
//   git_sha: 3f2a...      (null outside a git checkout)
//   device: cpu
//   use_accelerator: false

use std::{fs, path::Path, process::Command};

use serde::{Deserialize, Serialize};

use crate::application::DeviceKind;
use crate::domain::error::{Result, TranslitError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub git_sha:         Option<String>,
    pub device:          DeviceKind,
    pub use_accelerator: bool,
}

impl RunInfo {
    pub fn capture(device: DeviceKind) -> Self {
        Self {
            git_sha: current_git_sha(),
            device,
            use_accelerator: device == DeviceKind::Gpu,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_yaml::to_string(self)
            .map_err(|e| TranslitError::Config(format!("cannot serialize run info: {e}")))?;
        fs::write(path, text).map_err(|e| TranslitError::io(path, e))
    }
}

fn current_git_sha() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    if !output.status.success() {
        tracing::warn!("Not inside a git checkout; git_sha will be empty");
        return None;
    }
    let sha = String::from_utf8(output.stdout).ok()?;
    Some(sha.trim().to_string())
}
