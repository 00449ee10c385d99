use std::path::PathBuf;

/// Failures while loading or evaluating a `pylock.toml`.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PylockError {
    #[error("Lock file not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read lock file {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
    #[error("failed to parse lock file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("Lock file missing required 'lock-version' field")]
    MissingLockVersion,
    #[error("Unsupported lock file version: {version}, expected 1.x")]
    UnsupportedLockVersion { version: String },
    #[error("Lock file requires Python {requires}, but current is {current}")]
    IncompatiblePython { requires: String, current: String },
    #[error("invalid requires-python specifier '{specifier}': {message}")]
    InvalidSpecifier { specifier: String, message: String },
    #[error("invalid locked requirement '{requirement}': {message}")]
    InvalidRequirement {
        requirement: String,
        message: String,
    },
    #[error("unable to determine the target interpreter: {message}")]
    Interpreter { message: String },
}

impl PylockError {
    /// True for the document-level checks that reject a lock outright.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::MissingLockVersion | Self::UnsupportedLockVersion { .. }
        )
    }
}

/// Failures while reading a requirements list.
#[derive(Debug, thiserror::Error)]
pub enum ReqFileError {
    #[error("requirements file not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read requirements file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: unknown option '{option}'", .file.display())]
    UnknownOption {
        file: PathBuf,
        line: usize,
        option: String,
    },
    #[error("{}:{line}: option '{option}' requires a value", .file.display())]
    MissingValue {
        file: PathBuf,
        line: usize,
        option: String,
    },
    #[error("{}:{line}: unexpected argument '{token}'", .file.display())]
    UnexpectedArgument {
        file: PathBuf,
        line: usize,
        token: String,
    },
    #[error("Cannot use --{option} in deps list, it must be in requirements file. ({requirement})")]
    IllegalOption { option: String, requirement: String },
    #[error("only constraints files or URLs can be provided")]
    ConstraintOption,
    #[error(
        "Cannot provide options in constraints list, only paths or URL can be provided. ({requirement})"
    )]
    ConstraintRequirementOptions { requirement: String },
    #[error("no dependencies")]
    NoDependencies,
    #[error(transparent)]
    Lock(#[from] PylockError),
}
