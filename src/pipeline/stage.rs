//! Pipeline stages and invocation entry points.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Total number of numbered progress lines
pub const STAGE_COUNT: usize = 4;

/// The four sequential pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Create the isolated build environment
    Provision,
    /// Install the manifest and the packager into it
    Install,
    /// Run the packager against the build descriptor
    Package,
    /// Stage the run artifact and publish the release (CI only)
    Publish,
}

impl Stage {
    /// Stages in execution order
    pub const ALL: [Stage; STAGE_COUNT] =
        [Stage::Provision, Stage::Install, Stage::Package, Stage::Publish];

    /// 1-based position in the pipeline
    pub fn number(self) -> usize {
        match self {
            Stage::Provision => 1,
            Stage::Install => 2,
            Stage::Package => 3,
            Stage::Publish => 4,
        }
    }

    /// Process exit code when this stage fails
    pub fn exit_code(self) -> i32 {
        self.number() as i32 * 10
    }

    /// Stable identifier used in reports and CI annotations
    pub fn id(self) -> &'static str {
        match self {
            Stage::Provision => "provision",
            Stage::Install => "install",
            Stage::Package => "package",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Where the pipeline was invoked from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// Interactive PowerShell wrapper
    PowerShell,
    /// Interactive command shell wrapper
    Cmd,
    /// Headless CI runner
    Ci,
}

impl EntryPoint {
    /// Interactive entry points pause before exiting
    pub fn is_interactive(self) -> bool {
        !matches!(self, EntryPoint::Ci)
    }
}
