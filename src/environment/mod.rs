//! Environment Provisioner.
//!
//! Finds a Python 3 toolchain, creates the isolated build environment and
//! decides, by fingerprint, whether an existing environment may be reused.

mod fingerprint;
mod provisioner;
mod toolchain;

pub use fingerprint::{EnvironmentFingerprint, FINGERPRINT_FILE, FINGERPRINT_FORMAT_VERSION};
pub use provisioner::{BuildEnvironment, EnvironmentState, Provisioned, inspect, provision};
pub use toolchain::{Toolchain, env_interpreter, parse_version};
