#![deny(clippy::all)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Requirement sources for an installer: PEP 751 lock files, pip-style
//! requirements files and inline deps lists.

pub mod deps;
pub mod error;
pub mod format;
pub mod options;
pub mod pylock;
pub mod req_file;

pub use deps::{PythonConstraints, PythonDeps, DEPS_ORIGIN};
pub use error::{PylockError, ReqFileError};
pub use format::{detect_format, is_pylock_file_name, RequirementsFormat};
pub use options::{InstallOptions, ONE_ARG, ONE_ARG_ESCAPE};
pub use pylock::{
    LockDocument, LockExpansion, LockedPackage, LockedRequirement, MarkerOutcome, PylockDeps,
    PylockFile, RequirementSelection,
};
pub use req_file::{LockPolicy, ParsedRequirement, RequirementsFile};
