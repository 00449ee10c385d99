use std::path::Path;

const URL_PREFIXES: [&str; 3] = ["http://", "https://", "file://"];

/// How a referenced requirements source must be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequirementsFormat {
    /// A PEP 751 lock file, expanded into pinned requirements.
    LockFile,
    /// Anything else, read line by line.
    PlainRequirementsFile,
}

/// Classify a reference from an include directive.
///
/// URLs are never treated as lock files.
#[must_use]
pub fn detect_format(reference: &str) -> RequirementsFormat {
    if is_url(reference) {
        return RequirementsFormat::PlainRequirementsFile;
    }
    let is_lock = Path::new(reference)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(is_pylock_file_name);
    if is_lock {
        RequirementsFormat::LockFile
    } else {
        RequirementsFormat::PlainRequirementsFile
    }
}

/// `pylock.toml` or `pylock.<name>.toml`, ignoring case.
#[must_use]
pub fn is_pylock_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "pylock.toml" || (lower.starts_with("pylock.") && lower.ends_with(".toml"))
}

pub(crate) fn is_url(reference: &str) -> bool {
    URL_PREFIXES
        .iter()
        .any(|prefix| reference.starts_with(prefix))
}
