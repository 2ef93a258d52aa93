//! Packager.
//!
//! Treats the build descriptor as a black box: `(environment, descriptor) ->
//! artifact | failure`. The only knowledge taken from the descriptor is where
//! the artifact will appear.

mod checksum;
mod descriptor;
mod packager;

pub use checksum::{ArtifactDigest, calculate_sha256};
pub use descriptor::{ArtifactLayout, BuildDescriptor, BundleMode};
pub use packager::{BuildArtifact, package, packager_args, remove_artifact};
