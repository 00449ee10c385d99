//! PEP 751 `pylock.toml` support.
//!
//! [`PylockFile`] reads a lock file once and turns its package entries into
//! pinned requirements for a target interpreter. [`PylockDeps`] exposes the
//! same accessors as a deps list so a lock file can stand in for one.

use std::{
    borrow::Cow,
    cell::RefCell,
    collections::BTreeSet,
    fmt, fs,
    path::{Path, PathBuf},
    rc::Rc,
    str::FromStr,
};

use once_cell::unsync::OnceCell;
use pep440_rs::VersionSpecifiers;
use pep508_rs::{ExtraName, MarkerEnvironment, MarkerTree, Requirement as PepRequirement};
use serde::Deserialize;
use tracing::{debug, trace};
use tx_python::{PythonVersion, TargetPython};

use crate::{
    error::{PylockError, ReqFileError},
    options::InstallOptions,
};

const UNKNOWN_CREATOR: &str = "unknown";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDocument {
    lock_version: Option<String>,
    requires_python: Option<String>,
    created_by: Option<String>,
    #[serde(default)]
    default_groups: Vec<String>,
    #[serde(default)]
    packages: Vec<LockedPackage>,
}

/// One `[[packages]]` entry. Keys other than these are ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct LockedPackage {
    pub name: Option<String>,
    pub version: Option<String>,
    pub marker: Option<String>,
    pub requires_python: Option<String>,
}

/// A validated lock document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockDocument {
    pub lock_version: String,
    pub requires_python: Option<String>,
    pub created_by: Option<String>,
    pub default_groups: Vec<String>,
    pub packages: Vec<LockedPackage>,
}

impl LockDocument {
    fn validate(raw: RawDocument) -> Result<Self, PylockError> {
        let Some(lock_version) = raw.lock_version else {
            return Err(PylockError::MissingLockVersion);
        };
        if !lock_version.starts_with("1.") {
            return Err(PylockError::UnsupportedLockVersion {
                version: lock_version,
            });
        }
        Ok(Self {
            lock_version,
            requires_python: raw.requires_python,
            created_by: raw.created_by,
            default_groups: raw.default_groups,
            packages: raw.packages,
        })
    }
}

/// A package name plus an exact version when the entry has one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LockedRequirement {
    name: String,
    version: Option<String>,
}

impl LockedRequirement {
    /// Build and validate the requirement for a package entry; `None` for
    /// entries without a name.
    pub fn from_package(package: &LockedPackage) -> Result<Option<Self>, PylockError> {
        let Some(name) = package.name.as_deref().filter(|name| !name.is_empty()) else {
            return Ok(None);
        };
        let requirement = Self {
            name: name.to_string(),
            version: package
                .version
                .clone()
                .filter(|version| !version.is_empty()),
        };
        let rendered = requirement.to_string();
        rendered
            .parse::<PepRequirement>()
            .map_err(|err| PylockError::InvalidRequirement {
                requirement: rendered.clone(),
                message: err.to_string(),
            })?;
        Ok(Some(requirement))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for LockedRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}=={version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Which subset of a lock file to install.
///
/// Unset fields fall back to: no extras, the document's `default-groups`,
/// and the reader's target interpreter.
#[derive(Clone, Debug, Default)]
pub struct RequirementSelection {
    pub extras: Option<BTreeSet<String>>,
    pub dependency_groups: Option<BTreeSet<String>>,
    pub python_version: Option<PythonVersion>,
}

impl RequirementSelection {
    #[must_use]
    pub fn for_python(version: PythonVersion) -> Self {
        Self {
            python_version: Some(version),
            ..Self::default()
        }
    }
}

/// Result of evaluating a package marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkerOutcome {
    Applies,
    Excluded,
    /// The marker could not be evaluated, e.g. it uses the `in extras` /
    /// `in dependency_groups` forms from PEP 751. Treated as [`Self::Applies`].
    Unevaluable(String),
}

impl MarkerOutcome {
    pub fn evaluate(marker: &str, env: &MarkerEnvironment, extras: &[ExtraName]) -> Self {
        match marker.parse::<MarkerTree>() {
            Ok(tree) if tree.evaluate(env, extras) => Self::Applies,
            Ok(_) => Self::Excluded,
            Err(err) => Self::Unevaluable(err.to_string()),
        }
    }

    pub fn includes(&self) -> bool {
        !matches!(self, Self::Excluded)
    }
}

#[derive(Debug)]
enum LoadState {
    Unloaded,
    Loaded(Rc<LockDocument>),
    Failed(PylockError),
}

/// A lazily loaded `pylock.toml`.
///
/// The document is read on first access and kept for the reader's lifetime;
/// a failed load is remembered and reported by every later accessor.
#[derive(Debug)]
pub struct PylockFile {
    path: PathBuf,
    state: RefCell<LoadState>,
    target: OnceCell<TargetPython>,
}

impl PylockFile {
    /// A reader evaluating against the running interpreter, inspected on demand.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RefCell::new(LoadState::Unloaded),
            target: OnceCell::new(),
        }
    }

    /// A reader evaluating against a fixed interpreter.
    pub fn with_target(path: impl Into<PathBuf>, target: TargetPython) -> Self {
        let reader = Self::new(path);
        let _ = reader.target.set(target);
        reader
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> Result<Rc<LockDocument>, PylockError> {
        let mut state = self.state.borrow_mut();
        let outcome = match &*state {
            LoadState::Loaded(doc) => return Ok(Rc::clone(doc)),
            LoadState::Failed(err) => return Err(err.clone()),
            LoadState::Unloaded => load_document(&self.path).map(Rc::new),
        };
        *state = match &outcome {
            Ok(doc) => LoadState::Loaded(Rc::clone(doc)),
            Err(err) => LoadState::Failed(err.clone()),
        };
        outcome
    }

    pub fn lock_version(&self) -> Result<String, PylockError> {
        Ok(self.document()?.lock_version.clone())
    }

    pub fn created_by(&self) -> Result<String, PylockError> {
        Ok(self
            .document()?
            .created_by
            .clone()
            .unwrap_or_else(|| UNKNOWN_CREATOR.to_string()))
    }

    /// Fails when the document's `requires-python` excludes `python`.
    pub fn check_compatibility(&self, python: PythonVersion) -> Result<(), PylockError> {
        let doc = self.document()?;
        let Some(requires) = doc.requires_python.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        if specifier_allows(requires, python)? {
            Ok(())
        } else {
            Err(PylockError::IncompatiblePython {
                requires: requires.to_string(),
                current: python.to_string(),
            })
        }
    }

    /// Installable requirements for `selection`, in document order.
    pub fn get_requirements(
        &self,
        selection: &RequirementSelection,
    ) -> Result<Vec<LockedRequirement>, PylockError> {
        let doc = self.document()?;
        let target = self.target_for(selection.python_version)?;
        let python = target.version();
        self.check_compatibility(python)?;

        let extras = selection.extras.clone().unwrap_or_default();
        let groups = selection
            .dependency_groups
            .clone()
            .unwrap_or_else(|| doc.default_groups.iter().cloned().collect());
        let extra_names = extras
            .iter()
            .filter_map(|extra| ExtraName::from_str(extra).ok())
            .collect::<Vec<_>>();
        debug!(
            path = %self.path.display(),
            %python,
            ?extras,
            ?groups,
            packages = doc.packages.len(),
            "selecting locked requirements"
        );

        let mut requirements = Vec::new();
        for package in &doc.packages {
            let label = package.name.as_deref().unwrap_or("<unnamed>");
            if let Some(marker) = package.marker.as_deref().filter(|m| !m.trim().is_empty()) {
                let outcome = MarkerOutcome::evaluate(marker, target.markers(), &extra_names);
                if let MarkerOutcome::Unevaluable(reason) = &outcome {
                    debug!(package = label, %marker, %reason, "marker not evaluable, keeping package");
                }
                if !outcome.includes() {
                    trace!(package = label, %marker, "marker excludes package");
                    continue;
                }
            }
            if let Some(requires) = package
                .requires_python
                .as_deref()
                .filter(|s| !s.is_empty())
            {
                if !specifier_allows(requires, python)? {
                    trace!(package = label, %requires, "requires-python excludes package");
                    continue;
                }
            }
            if let Some(requirement) = LockedRequirement::from_package(package)? {
                requirements.push(requirement);
            }
        }
        Ok(requirements)
    }

    /// Hash enforcement is not implemented; no extra installer flags.
    pub fn get_hash_options(&self) -> Vec<String> {
        Vec::new()
    }

    fn target_for(&self, python: Option<PythonVersion>) -> Result<Cow<'_, TargetPython>, PylockError> {
        match (self.target.get(), python) {
            (Some(target), Some(version)) if target.version() != version => target
                .with_version(version)
                .map(Cow::Owned)
                .map_err(interpreter_error),
            (Some(target), _) => Ok(Cow::Borrowed(target)),
            (None, Some(version)) => TargetPython::synthetic(version)
                .map(Cow::Owned)
                .map_err(interpreter_error),
            (None, None) => self
                .target
                .get_or_try_init(TargetPython::detect)
                .map(Cow::Borrowed)
                .map_err(interpreter_error),
        }
    }
}

fn interpreter_error(err: anyhow::Error) -> PylockError {
    PylockError::Interpreter {
        message: format!("{err:#}"),
    }
}

fn load_document(path: &Path) -> Result<LockDocument, PylockError> {
    if !path.exists() {
        return Err(PylockError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path).map_err(|err| PylockError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let raw: RawDocument = toml_edit::de::from_str(&contents).map_err(|err| PylockError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let doc = LockDocument::validate(raw)?;
    debug!(
        path = %path.display(),
        lock_version = %doc.lock_version,
        packages = doc.packages.len(),
        "loaded lock file"
    );
    Ok(doc)
}

fn specifier_allows(requires: &str, python: PythonVersion) -> Result<bool, PylockError> {
    let specifiers =
        VersionSpecifiers::from_str(requires).map_err(|err| PylockError::InvalidSpecifier {
            specifier: requires.to_string(),
            message: err.to_string(),
        })?;
    let version = python
        .to_pep440()
        .map_err(|err| PylockError::InvalidSpecifier {
            specifier: requires.to_string(),
            message: format!("{err:#}"),
        })?;
    Ok(specifiers.contains(&version))
}

/// Outcome of expanding a lock file referenced from a requirements list.
#[derive(Debug)]
pub enum LockExpansion {
    /// Newline-joined pinned requirements.
    Expanded(String),
    /// The lock could not be used; read the reference as a plain file.
    Fallback(PylockError),
}

impl LockExpansion {
    pub fn expand(path: &Path, target: Option<&TargetPython>) -> Self {
        let reader = match target {
            Some(target) => PylockFile::with_target(path, target.clone()),
            None => PylockFile::new(path),
        };
        match reader.get_requirements(&RequirementSelection::default()) {
            Ok(requirements) => Self::Expanded(
                requirements
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Err(err) => Self::Fallback(err),
        }
    }
}

/// A lock file used where a deps list is expected.
#[derive(Debug)]
pub struct PylockDeps {
    lock: PylockFile,
    requirements: OnceCell<Vec<LockedRequirement>>,
    unrolled: OnceCell<(Vec<String>, Vec<String>)>,
}

impl PylockDeps {
    /// `path` is resolved against `root` when relative.
    pub fn new(path: impl AsRef<Path>, root: &Path) -> Self {
        Self::from_reader(PylockFile::new(resolve_path(path.as_ref(), root)))
    }

    pub fn with_target(path: impl AsRef<Path>, root: &Path, target: TargetPython) -> Self {
        Self::from_reader(PylockFile::with_target(
            resolve_path(path.as_ref(), root),
            target,
        ))
    }

    fn from_reader(lock: PylockFile) -> Self {
        Self {
            lock,
            requirements: OnceCell::new(),
            unrolled: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.lock.path()
    }

    pub fn lock(&self) -> &PylockFile {
        &self.lock
    }

    /// The default selection, computed once.
    pub fn requirements(&self) -> Result<&[LockedRequirement], ReqFileError> {
        self.requirements
            .get_or_try_init(|| self.lock.get_requirements(&RequirementSelection::default()))
            .map(Vec::as_slice)
            .map_err(ReqFileError::from)
    }

    /// One installer argument per requirement.
    pub fn as_root_args(&self) -> Result<Vec<String>, ReqFileError> {
        Ok(self
            .requirements()?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    /// Lock files carry no installer flags.
    pub fn options(&self) -> InstallOptions {
        InstallOptions::default()
    }

    pub fn unroll(&self) -> Result<(Vec<String>, Vec<String>), ReqFileError> {
        self.unrolled
            .get_or_try_init(|| Ok::<_, ReqFileError>((Vec::new(), self.as_root_args()?)))
            .cloned()
    }
}

fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pep508_rs::StringVersion;
    use std::fs;
    use tempfile::tempdir;

    const SIMPLE_LOCK: &str = r#"lock-version = "1.0"
requires-python = ">=3.8"
created-by = "test"

[[packages]]
name = "requests"
version = "2.31.0"

[[packages]]
name = "urllib3"
version = "2.0.7"

[[packages]]
name = "certifi"
version = "2023.7.22"
"#;

    fn linux_target(version: PythonVersion) -> TargetPython {
        let full = version.to_string();
        TargetPython::new(
            version,
            MarkerEnvironment {
                implementation_name: "cpython".into(),
                implementation_version: StringVersion::from_str(&full).expect("impl version"),
                os_name: "posix".into(),
                platform_machine: "x86_64".into(),
                platform_python_implementation: "CPython".into(),
                platform_release: "6.0".into(),
                platform_system: "Linux".into(),
                platform_version: "6.0".into(),
                python_full_version: StringVersion::from_str(&full).expect("full version"),
                python_version: StringVersion::from_str(&version.channel())
                    .expect("python version"),
                sys_platform: "linux".into(),
            },
        )
    }

    fn py312() -> TargetPython {
        linux_target(PythonVersion::new(3, 12, 0))
    }

    fn write_lock(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write lock");
        path
    }

    fn names(requirements: &[LockedRequirement]) -> Vec<String> {
        requirements.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn loads_metadata() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::new(write_lock(dir.path(), "pylock.toml", SIMPLE_LOCK));

        assert_eq!(lock.lock_version().expect("version"), "1.0");
        assert_eq!(lock.created_by().expect("creator"), "test");
    }

    #[test]
    fn created_by_defaults_to_unknown() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::new(write_lock(
            dir.path(),
            "pylock.toml",
            "lock-version = \"1.3\"\n",
        ));

        assert_eq!(lock.created_by().expect("creator"), "unknown");
    }

    #[test]
    fn missing_file_is_reported() {
        let lock = PylockFile::new("/nonexistent/pylock.toml");
        let err = lock.lock_version().unwrap_err();
        assert!(matches!(err, PylockError::NotFound { .. }));
        assert!(err.to_string().starts_with("Lock file not found"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::new(write_lock(
            dir.path(),
            "pylock.toml",
            "lock-version = \"2.0\"\ncreated-by = \"test\"\n",
        ));

        let err = lock.lock_version().unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("Unsupported lock file version"));
    }

    #[test]
    fn rejects_missing_version() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::new(write_lock(
            dir.path(),
            "pylock.toml",
            "created-by = \"test\"\n",
        ));

        let err = lock.created_by().unwrap_err();
        assert_eq!(err, PylockError::MissingLockVersion);
        assert!(err
            .to_string()
            .contains("missing required 'lock-version' field"));
    }

    #[test]
    fn failed_load_is_sticky() {
        let dir = tempdir().expect("tempdir");
        let path = write_lock(dir.path(), "pylock.toml", "lock-version = \"0.9\"\n");
        let lock = PylockFile::new(&path);
        assert!(lock.lock_version().is_err());

        fs::write(&path, SIMPLE_LOCK).expect("rewrite lock");
        assert!(lock.lock_version().is_err());
    }

    #[test]
    fn accepts_any_minor_version() {
        let dir = tempdir().expect("tempdir");
        for version in ["1.0", "1.1", "1.42"] {
            let path = write_lock(
                dir.path(),
                "pylock.toml",
                &format!("lock-version = \"{version}\"\n"),
            );
            let lock = PylockFile::with_target(path, py312());
            assert_eq!(lock.lock_version().expect("version"), version);
        }
    }

    #[test]
    fn pins_every_package_in_document_order() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::with_target(
            write_lock(dir.path(), "pylock.toml", SIMPLE_LOCK),
            py312(),
        );

        let requirements = lock
            .get_requirements(&RequirementSelection::default())
            .expect("requirements");
        assert_eq!(
            names(&requirements),
            ["requests==2.31.0", "urllib3==2.0.7", "certifi==2023.7.22"]
        );
    }

    #[test]
    fn single_package_round_trip() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::with_target(
            write_lock(
                dir.path(),
                "pylock.toml",
                "lock-version = \"1.0\"\n[[packages]]\nname = \"pytest\"\nversion = \"7.4.0\"\n",
            ),
            py312(),
        );

        let requirements = lock
            .get_requirements(&RequirementSelection::default())
            .expect("requirements");
        assert_eq!(names(&requirements), ["pytest==7.4.0"]);
        assert_eq!(requirements[0].name(), "pytest");
        assert_eq!(requirements[0].version(), Some("7.4.0"));
    }

    #[test]
    fn filters_packages_by_requires_python() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::with_target(
            write_lock(
                dir.path(),
                "pylock.toml",
                r#"lock-version = "1.0"
requires-python = ">=3.8"

[[packages]]
name = "old-package"
version = "1.0.0"
requires-python = ">=2.7,<3.0"

[[packages]]
name = "new-package"
version = "2.0.0"
requires-python = ">=3.8"
"#,
            ),
            py312(),
        );

        let requirements = lock
            .get_requirements(&RequirementSelection::for_python(PythonVersion::new(3, 9, 0)))
            .expect("requirements");
        assert_eq!(names(&requirements), ["new-package==2.0.0"]);
    }

    #[test]
    fn document_requires_python_is_enforced() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::new(write_lock(
            dir.path(),
            "pylock.toml",
            r#"lock-version = "1.0"
environments = ["sys_platform == 'win32'", "sys_platform == 'linux'"]
requires-python = "==3.12"
created-by = "mousebender"

[[packages]]
name = "attrs"
version = "25.1.0"
requires-python = ">=3.8"

[[packages]]
name = "numpy"
version = "2.2.3"
requires-python = ">=3.10"
"#,
        ));

        let at_312 = lock
            .get_requirements(&RequirementSelection::for_python(PythonVersion::new(3, 12, 0)))
            .expect("requirements");
        assert_eq!(names(&at_312), ["attrs==25.1.0", "numpy==2.2.3"]);

        let err = lock
            .get_requirements(&RequirementSelection::for_python(PythonVersion::new(3, 9, 0)))
            .unwrap_err();
        assert_eq!(
            err,
            PylockError::IncompatiblePython {
                requires: "==3.12".into(),
                current: "3.9.0".into(),
            }
        );
        assert!(lock.check_compatibility(PythonVersion::new(3, 12, 0)).is_ok());
        assert!(lock.check_compatibility(PythonVersion::new(3, 12, 1)).is_err());
    }

    #[test]
    fn evaluates_standard_markers() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::with_target(
            write_lock(
                dir.path(),
                "pylock.toml",
                r#"lock-version = "1.0"

[[packages]]
name = "colorama"
version = "0.4.6"
marker = "sys_platform == 'win32'"

[[packages]]
name = "uvloop"
version = "0.19.0"
marker = "sys_platform == 'linux'"

[[packages]]
name = "pytest"
version = "7.4.0"
"#,
            ),
            py312(),
        );

        let requirements = lock
            .get_requirements(&RequirementSelection::default())
            .expect("requirements");
        assert_eq!(names(&requirements), ["uvloop==0.19.0", "pytest==7.4.0"]);
    }

    #[test]
    fn keeps_packages_with_extended_markers() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::with_target(
            write_lock(
                dir.path(),
                "pylock.toml",
                r#"lock-version = "1.0"
default-groups = ["test"]

[[packages]]
name = "coverage"
version = "7.3.0"
marker = "'test' in dependency_groups"

[[packages]]
name = "sphinx"
version = "7.2.0"
marker = "'docs' in extras"
"#,
            ),
            py312(),
        );

        let requirements = lock
            .get_requirements(&RequirementSelection::default())
            .expect("requirements");
        assert_eq!(names(&requirements), ["coverage==7.3.0", "sphinx==7.2.0"]);
    }

    #[test]
    fn marker_outcome_reports_unevaluable_markers() {
        let env = py312();
        assert_eq!(
            MarkerOutcome::evaluate("python_version >= '3.8'", env.markers(), &[]),
            MarkerOutcome::Applies
        );
        assert_eq!(
            MarkerOutcome::evaluate("python_version < '3.0'", env.markers(), &[]),
            MarkerOutcome::Excluded
        );
        let outcome = MarkerOutcome::evaluate("'dev' in extras", env.markers(), &[]);
        assert!(matches!(outcome, MarkerOutcome::Unevaluable(_)));
        assert!(outcome.includes());
    }

    #[test]
    fn python_override_applies_to_markers() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::with_target(
            write_lock(
                dir.path(),
                "pylock.toml",
                r#"lock-version = "1.0"

[[packages]]
name = "tomli"
version = "2.0.1"
marker = "python_version < '3.11'"
"#,
            ),
            py312(),
        );

        let default = lock
            .get_requirements(&RequirementSelection::default())
            .expect("requirements");
        assert!(default.is_empty());

        let older = lock
            .get_requirements(&RequirementSelection::for_python(PythonVersion::new(3, 10, 4)))
            .expect("requirements");
        assert_eq!(names(&older), ["tomli==2.0.1"]);
    }

    #[test]
    fn unversioned_and_nameless_entries() {
        let dir = tempdir().expect("tempdir");
        let lock = PylockFile::with_target(
            write_lock(
                dir.path(),
                "pylock.toml",
                r#"lock-version = "1.0"

[[packages]]
name = "my-vcs-package"

[packages.vcs]
type = "git"
url = "https://example.com/repo.git"
commit-id = "abc123"

[[packages]]
version = "1.0.0"

[[packages]]
name = "attrs"
version = "25.1.0"
"#,
            ),
            py312(),
        );

        let requirements = lock
            .get_requirements(&RequirementSelection::default())
            .expect("requirements");
        assert_eq!(names(&requirements), ["my-vcs-package", "attrs==25.1.0"]);
        assert_eq!(requirements[0].version(), None);
    }

    #[test]
    fn hash_options_are_empty() {
        let lock = PylockFile::new("pylock.toml");
        assert!(lock.get_hash_options().is_empty());
    }

    #[test]
    fn deps_adapter_exposes_requirements() {
        let dir = tempdir().expect("tempdir");
        let path = write_lock(dir.path(), "pylock.toml", SIMPLE_LOCK);
        let deps = PylockDeps::with_target(&path, dir.path(), py312());

        assert_eq!(deps.requirements().expect("requirements").len(), 3);
        let args = deps.as_root_args().expect("args");
        assert!(args.iter().any(|arg| arg == "requests==2.31.0"));
        assert!(deps.options().is_empty());

        let (options, requirements) = deps.unroll().expect("unroll");
        assert!(options.is_empty());
        assert_eq!(requirements, args);
    }

    #[test]
    fn deps_adapter_resolves_relative_paths() {
        let dir = tempdir().expect("tempdir");
        let subdir = dir.path().join("subdir");
        fs::create_dir(&subdir).expect("subdir");
        let lock_path = write_lock(
            &subdir,
            "pylock.toml",
            "lock-version = \"1.0\"\n[[packages]]\nname = \"pytest\"\nversion = \"7.4.0\"\n",
        );

        let deps = PylockDeps::with_target(Path::new("subdir/pylock.toml"), dir.path(), py312());
        assert_eq!(deps.path(), lock_path);
        assert_eq!(deps.requirements().expect("requirements").len(), 1);
    }

    #[test]
    fn deps_adapter_reports_missing_lock() {
        let dir = tempdir().expect("tempdir");
        let deps = PylockDeps::with_target("missing/pylock.toml", dir.path(), py312());

        let err = deps.unroll().unwrap_err();
        match err {
            ReqFileError::Lock(PylockError::NotFound { path }) => {
                assert_eq!(path, dir.path().join("missing/pylock.toml"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            deps.as_root_args(),
            Err(ReqFileError::Lock(PylockError::NotFound { .. }))
        ));
    }

    #[test]
    fn expansion_falls_back_on_broken_locks() {
        let dir = tempdir().expect("tempdir");
        let good = write_lock(dir.path(), "pylock.toml", SIMPLE_LOCK);
        let bad = write_lock(dir.path(), "pylock.bad.toml", "lock-version = \"9.0\"\n");
        let target = py312();

        match LockExpansion::expand(&good, Some(&target)) {
            LockExpansion::Expanded(text) => assert_eq!(
                text,
                "requests==2.31.0\nurllib3==2.0.7\ncertifi==2023.7.22"
            ),
            LockExpansion::Fallback(err) => panic!("unexpected fallback: {err}"),
        }
        assert!(matches!(
            LockExpansion::expand(&bad, Some(&target)),
            LockExpansion::Fallback(PylockError::UnsupportedLockVersion { .. })
        ));
    }
}
