//! Tag lookup in the local repository.

use crate::error::PublishError;
use std::path::Path;

fn tag_error(reason: impl std::fmt::Display) -> PublishError {
    PublishError::TagDetection {
        reason: reason.to_string(),
    }
}

/// Short names of all tags that point at `HEAD`.
///
/// Annotated tags are peeled to their commit. A directory outside any
/// repository, or a repository without commits, has no tags.
#[allow(deprecated)]
pub fn tags_at_head(repo_root: &Path) -> Result<Vec<String>, PublishError> {
    let repo = match gix::discover(repo_root) {
        Ok(repo) => repo,
        Err(e) => {
            log::debug!("No git repository at {}: {}", repo_root.display(), e);
            return Ok(Vec::new());
        }
    };

    let head = match repo.head_id() {
        Ok(id) => id.detach(),
        Err(e) => {
            log::debug!("HEAD does not point at a commit: {}", e);
            return Ok(Vec::new());
        }
    };

    let references = repo.references().map_err(tag_error)?;
    let mut names = Vec::new();
    for reference in references.tags().map_err(tag_error)? {
        let mut reference = reference.map_err(tag_error)?;
        let name = reference.name().shorten().to_string();
        match reference.peel_to_id_in_place() {
            Ok(id) if id.detach() == head => names.push(name),
            Ok(_) => {}
            Err(e) => log::debug!("Skipping tag {}: {}", name, e),
        }
    }

    names.sort();
    log::debug!("Tags at HEAD: {:?}", names);
    Ok(names)
}
