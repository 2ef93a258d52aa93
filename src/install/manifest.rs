//! Dependency manifest (`requirements.txt`) parsing.
//!
//! Only enough structure is recovered to validate the file before anything is
//! installed and to tell whether the packager is already listed; pip itself
//! consumes the original file.

use crate::error::InstallError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<rest>.*)$",
    )
    .expect("requirement regex is valid")
});

static CONSTRAINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:===|==|>=|<=|~=|!=|<|>)\s*[A-Za-z0-9.*+!_-]+(?:\s*,\s*(?:===|==|>=|<=|~=|!=|<|>)\s*[A-Za-z0-9.*+!_-]+)*$")
        .expect("constraint regex is valid")
});

/// One package specifier from the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Distribution name as written
    pub name: String,
    /// Requested extras
    pub extras: Vec<String>,
    /// Version constraint, e.g. `>=2.31,<3`
    pub constraint: Option<String>,
    /// Environment marker after `;`
    pub marker: Option<String>,
}

impl Requirement {
    /// Parse a single requirement line (comments already stripped)
    pub fn parse(line: &str) -> Result<Self, String> {
        let (spec, marker) = match line.split_once(';') {
            Some((spec, marker)) => (spec.trim(), Some(marker.trim().to_string())),
            None => (line.trim(), None),
        };

        let caps = REQUIREMENT_RE
            .captures(spec)
            .ok_or_else(|| format!("'{}' is not a package specifier", spec))?;

        let extras = caps
            .name("extras")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rest = caps.name("rest").map(|m| m.as_str().trim()).unwrap_or("");
        let constraint = if rest.is_empty() {
            None
        } else if rest.starts_with('@') || CONSTRAINT_RE.is_match(rest) {
            Some(rest.to_string())
        } else {
            return Err(format!("unrecognized version constraint '{}'", rest));
        };

        Ok(Self {
            name: caps["name"].to_string(),
            extras,
            constraint,
            marker: marker.filter(|m| !m.is_empty()),
        })
    }

    /// Normalized project name (PEP 503)
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Normalize a distribution name for comparison
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut last_was_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_was_separator {
                normalized.push('-');
            }
            last_was_separator = true;
        } else {
            normalized.push(c.to_ascii_lowercase());
            last_was_separator = false;
        }
    }
    normalized
}

/// The ordered package list the application needs
#[derive(Debug, Clone)]
pub struct DependencyManifest {
    /// Manifest path
    pub path: PathBuf,
    /// Raw file contents, used for the environment fingerprint
    pub raw: Vec<u8>,
    /// Package specifiers in file order
    pub requirements: Vec<Requirement>,
    /// pip option lines (`--index-url ...`, `-r other.txt`) passed through untouched
    pub options: Vec<String>,
}

impl DependencyManifest {
    /// Validate manifest bytes, read once per run by the caller
    pub fn parse(path: &Path, raw: Vec<u8>) -> Result<Self, InstallError> {
        let text = String::from_utf8_lossy(&raw).into_owned();
        let text = text.trim_start_matches('\u{feff}');

        let mut requirements = Vec::new();
        let mut options = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('-') {
                options.push(line.to_string());
                continue;
            }
            let requirement =
                Requirement::parse(line).map_err(|reason| InstallError::InvalidManifest {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason,
                })?;
            requirements.push(requirement);
        }

        Ok(Self {
            path: path.to_path_buf(),
            raw,
            requirements,
            options,
        })
    }

    /// True when the manifest already lists `name`
    pub fn contains(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.requirements
            .iter()
            .any(|r| r.normalized_name() == wanted)
    }
}

/// Drop a trailing `# comment`; pip treats `#` as a comment only at line start
/// or after whitespace.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<DependencyManifest, InstallError> {
        DependencyManifest::parse(Path::new("requirements.txt"), text.as_bytes().to_vec())
    }

    #[test]
    fn parses_analyzer_requirements_in_order() {
        let manifest = parse(
            "# scraping\nrequests>=2.31\nbeautifulsoup4\n\npandas==2.2.2  # data\nopenpyxl\n",
        )
        .expect("manifest parses");

        let names: Vec<&str> = manifest
            .requirements
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["requests", "beautifulsoup4", "pandas", "openpyxl"]);
        assert_eq!(manifest.requirements[0].constraint.as_deref(), Some(">=2.31"));
        assert_eq!(manifest.requirements[2].constraint.as_deref(), Some("==2.2.2"));
        assert_eq!(manifest.requirements[1].constraint, None);
    }

    #[test]
    fn parses_extras_markers_and_options() {
        let manifest = parse(
            "--index-url https://pypi.org/simple\nrequests[socks, security]>=2,<3 ; python_version >= \"3.9\"\n",
        )
        .expect("manifest parses");

        assert_eq!(manifest.options, vec!["--index-url https://pypi.org/simple"]);
        let requests = &manifest.requirements[0];
        assert_eq!(requests.extras, vec!["socks", "security"]);
        assert_eq!(requests.constraint.as_deref(), Some(">=2,<3"));
        assert_eq!(requests.marker.as_deref(), Some("python_version >= \"3.9\""));
    }

    #[test]
    fn invalid_line_reports_its_number() {
        let err = parse("requests\npandas ?? 2\n").unwrap_err();
        match err {
            InstallError::InvalidManifest { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn contains_uses_normalized_names() {
        let manifest = parse("PyInstaller==6.6.0\nbeautifulsoup4\n").expect("manifest parses");
        assert!(manifest.contains("pyinstaller"));
        assert!(manifest.contains("BeautifulSoup4"));
        assert!(!manifest.contains("lxml"));
        assert_eq!(normalize_name("Foo__Bar.baz"), "foo-bar-baz");
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let manifest = parse("\u{feff}requests\n").expect("manifest parses");
        assert_eq!(manifest.requirements[0].name, "requests");
    }
}
