//! Dependency and constraint lists written inline in a project file.

use std::{
    ops::AddAssign,
    path::{Path, PathBuf},
};

use once_cell::unsync::OnceCell;
use tx_python::TargetPython;

use crate::{
    error::ReqFileError,
    options::{InstallOptions, ONE_ARG, ONE_ARG_ESCAPE},
    req_file::{LockPolicy, ParsedRequirement, RequirementsFile},
};

/// File name the inline lists are attributed to.
pub const DEPS_ORIGIN: &str = "tx.toml";

const ILLEGAL_OPTIONS: [&str; 1] = ["hash"];

type Parsed = (Vec<ParsedRequirement>, InstallOptions);

/// A deps list: requirements and installer options, one per line.
///
/// Includes naming a `pylock.toml` are expanded into the lock's pins.
#[derive(Debug)]
pub struct PythonDeps {
    root: PathBuf,
    raw: String,
    target: Option<TargetPython>,
    parsed: OnceCell<Parsed>,
    unrolled: OnceCell<(Vec<String>, Vec<String>)>,
}

impl PythonDeps {
    pub fn new(raw: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            raw: normalize_raw(raw),
            target: None,
            parsed: OnceCell::new(),
            unrolled: OnceCell::new(),
        }
    }

    pub fn from_lines<I, S>(lines: I, root: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(&raw, root)
    }

    /// Evaluate included lock files for `target` instead of the running
    /// interpreter.
    #[must_use]
    pub fn with_target(mut self, target: TargetPython) -> Self {
        self.target = Some(target);
        self.reset();
        self
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(DEPS_ORIGIN)
    }

    pub fn lines(&self) -> Vec<&str> {
        self.raw.lines().collect()
    }

    /// Requirements written in the list, includes left unexpanded.
    pub fn requirements(&self) -> Result<Vec<&ParsedRequirement>, ReqFileError> {
        Ok(self
            .parsed()?
            .0
            .iter()
            .filter(|req| !req.is_constraint())
            .collect())
    }

    pub fn options(&self) -> Result<&InstallOptions, ReqFileError> {
        Ok(&self.parsed()?.1)
    }

    /// Installer arguments with every include followed and lock files
    /// replaced by their pins.
    pub fn as_root_args(&self) -> Result<Vec<String>, ReqFileError> {
        let mut options = InstallOptions::default();
        let requirements = self.parse(&mut options, true)?;
        let mut args = requirements
            .iter()
            .filter(|req| !req.is_constraint())
            .flat_map(ParsedRequirement::as_args)
            .collect::<Vec<_>>();
        args.extend(options.to_root_args());
        Ok(args)
    }

    /// `(options, requirements)` as display strings.
    pub fn unroll(&self) -> Result<(Vec<String>, Vec<String>), ReqFileError> {
        self.unrolled
            .get_or_try_init(|| {
                let requirements = self.requirements()?;
                let options = self.options()?;
                if requirements.is_empty() && !options.is_empty() {
                    return Err(ReqFileError::NoDependencies);
                }
                Ok((
                    options.entries(),
                    requirements.iter().map(ToString::to_string).collect(),
                ))
            })
            .cloned()
    }

    /// Append `other`'s lines to this list.
    pub fn extend(&mut self, other: &PythonDeps) {
        if self.raw.is_empty() {
            self.raw.clone_from(&other.raw);
        } else if !other.raw.is_empty() {
            self.raw.push('\n');
            self.raw.push_str(&other.raw);
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.parsed = OnceCell::new();
        self.unrolled = OnceCell::new();
    }

    fn parsed(&self) -> Result<&Parsed, ReqFileError> {
        self.parsed.get_or_try_init(|| {
            let mut options = InstallOptions::default();
            let requirements = self.parse(&mut options, false)?;
            Ok((requirements, options))
        })
    }

    fn parse(
        &self,
        options: &mut InstallOptions,
        recurse: bool,
    ) -> Result<Vec<ParsedRequirement>, ReqFileError> {
        let origin = self.path();
        let requirements = RequirementsFile::new(&origin, false)
            .with_contents(self.raw.clone())
            .with_lock_policy(LockPolicy::Expand(self.target.clone()))
            .allow_no_deps()
            .parse(options, recurse)?;
        reject_illegal_options(&requirements, &origin)?;
        Ok(requirements)
    }
}

impl AddAssign<&PythonDeps> for PythonDeps {
    fn add_assign(&mut self, other: &PythonDeps) {
        self.extend(other);
    }
}

fn reject_illegal_options(
    requirements: &[ParsedRequirement],
    origin: &Path,
) -> Result<(), ReqFileError> {
    for requirement in requirements
        .iter()
        .filter(|req| req.from_file() == origin)
    {
        for option in ILLEGAL_OPTIONS {
            if option == "hash" && !requirement.hashes().is_empty() {
                return Err(ReqFileError::IllegalOption {
                    option: option.to_string(),
                    requirement: requirement.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// A constraints list: only paths or URLs of constraint files.
#[derive(Debug)]
pub struct PythonConstraints {
    root: PathBuf,
    raw: String,
    unrolled: OnceCell<(Vec<String>, Vec<String>)>,
}

impl PythonConstraints {
    pub fn new(raw: &str, root: impl Into<PathBuf>) -> Result<Self, ReqFileError> {
        let joined = join_continuations(raw);
        let lines = joined
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(normalize_line)
            .collect::<Vec<_>>();
        if lines.iter().any(|line| line.starts_with('-')) {
            return Err(ReqFileError::ConstraintOption);
        }
        let raw = lines
            .iter()
            .map(|line| format!("-c {}", escape_whitespace(line)))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Self {
            root: root.into(),
            raw,
            unrolled: OnceCell::new(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(DEPS_ORIGIN)
    }

    pub fn lines(&self) -> Vec<&str> {
        self.raw.lines().collect()
    }

    /// Installer arguments: one `-c` per constraint file.
    pub fn as_root_args(&self) -> Result<Vec<String>, ReqFileError> {
        let mut options = InstallOptions::default();
        self.parse(&mut options, false)?;
        Ok(options.to_args())
    }

    /// Entries read from the referenced constraint files.
    pub fn constraints(&self) -> Result<Vec<ParsedRequirement>, ReqFileError> {
        let mut options = InstallOptions::default();
        let constraints = self.parse(&mut options, true)?;
        if let Some(bad) = constraints.iter().find(|req| req.has_options()) {
            return Err(ReqFileError::ConstraintRequirementOptions {
                requirement: bad.to_string(),
            });
        }
        Ok(constraints)
    }

    /// `(options, constraint files)` as display strings.
    pub fn unroll(&self) -> Result<(Vec<String>, Vec<String>), ReqFileError> {
        self.unrolled
            .get_or_try_init(|| {
                let mut options = InstallOptions::default();
                self.parse(&mut options, false)?;
                let files = std::mem::take(&mut options.constraints);
                Ok((options.entries(), files))
            })
            .cloned()
    }

    fn parse(
        &self,
        options: &mut InstallOptions,
        recurse: bool,
    ) -> Result<Vec<ParsedRequirement>, ReqFileError> {
        RequirementsFile::new(self.path(), true)
            .with_contents(self.raw.clone())
            .parse(options, recurse)
    }
}

fn join_continuations(raw: &str) -> String {
    raw.replace('\r', "").split("\\\n").collect()
}

/// Undo line continuations and split flags glued to their values.
pub(crate) fn normalize_raw(raw: &str) -> String {
    join_continuations(raw)
        .lines()
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn normalize_line(line: &str) -> String {
    let mut flags = ONE_ARG;
    flags.sort_by_key(|flag| std::cmp::Reverse(flag.len()));
    let glued = flags.into_iter().find(|flag| {
        line.strip_prefix(flag)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|next| !next.is_whitespace() && next != '=')
    });
    let line = match glued {
        Some(flag) => format!("{flag} {}", &line[flag.len()..]),
        None => line.to_string(),
    };
    let escaped = ONE_ARG_ESCAPE.into_iter().find(|flag| {
        line.strip_prefix(flag)
            .and_then(|rest| rest.chars().next())
            .is_some_and(char::is_whitespace)
    });
    match escaped {
        Some(flag) => format!("{flag} {}", escape_whitespace(&line[flag.len() + 1..])),
        None => line,
    }
}

/// Backslash-escape whitespace not already escaped.
fn escape_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev = None;
    for ch in value.chars() {
        if ch.is_whitespace() && prev != Some('\\') {
            out.push('\\');
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::tempdir;
    use tx_python::PythonVersion;

    fn target() -> TargetPython {
        TargetPython::synthetic(PythonVersion::new(3, 12, 0)).expect("target")
    }

    fn write_lock(dir: &Path, name: &str) {
        fs::write(
            dir.join(name),
            r#"lock-version = "1.0"
created-by = "uv"

[[packages]]
name = "pytest"
version = "7.4.0"

[[packages]]
name = "colorama"
version = "0.4.6"
marker = "sys_platform == 'nonexistent'"
"#,
        )
        .expect("write lock");
    }

    #[test]
    fn normalizes_glued_flags() {
        assert_eq!(normalize_line("-rreq.txt"), "-r req.txt");
        assert_eq!(
            normalize_line("--index-urlhttps://a.test"),
            "--index-url https://a.test"
        );
        assert_eq!(normalize_line("-r my reqs.txt"), r"-r my\ reqs.txt");
        assert_eq!(normalize_line(r"-r my\ reqs.txt"), r"-r my\ reqs.txt");
        assert_eq!(normalize_line("--pre"), "--pre");
        assert_eq!(normalize_line("--index-url=https://a.test"), "--index-url=https://a.test");
        assert_eq!(normalize_raw("requests \\\r\n>=2\n-cc.txt"), "requests >=2\n-c c.txt");
    }

    #[test]
    fn lock_includes_become_pins() {
        let dir = tempdir().expect("tempdir");
        write_lock(dir.path(), "pylock.toml");
        let deps = PythonDeps::new("-r pylock.toml\nflask", dir.path()).with_target(target());

        let args = deps.as_root_args().expect("args");
        assert_eq!(args, ["pytest==7.4.0", "flask"]);
        assert!(args.iter().all(|arg| !arg.contains("pylock.toml")));
    }

    #[test]
    fn named_lock_files_expand() {
        let dir = tempdir().expect("tempdir");
        write_lock(dir.path(), "pylock.dev.toml");
        let deps = PythonDeps::new("-rpylock.dev.toml", dir.path()).with_target(target());

        assert_eq!(deps.as_root_args().expect("args"), ["pytest==7.4.0"]);
    }

    #[test]
    fn broken_lock_falls_back_to_plain_file() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("pylock.toml"), "pytest==8.0.0\n").expect("write");
        let deps = PythonDeps::new("-r pylock.toml", dir.path()).with_target(target());

        assert_eq!(deps.as_root_args().expect("args"), ["pytest==8.0.0"]);
    }

    #[test]
    fn plain_includes_and_options_flatten() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("req.txt"), "attrs\n").expect("write");
        fs::write(dir.path().join("c.txt"), "attrs<26\n").expect("write");
        let deps = PythonDeps::from_lines(
            ["--pre", "-r req.txt", "-c c.txt", "six", "--no-deps"],
            dir.path(),
        );

        let constraint = dir.path().join("c.txt").to_string_lossy().into_owned();
        assert_eq!(
            deps.as_root_args().expect("args"),
            ["attrs", "six", "-c", constraint.as_str(), "--pre", "--no-deps"]
        );
    }

    #[test]
    fn hashes_are_rejected_in_deps_list() {
        let dir = tempdir().expect("tempdir");
        let deps = PythonDeps::new("six --hash=sha256:abc", dir.path());
        let err = deps.unroll().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot use --hash in deps list, it must be in requirements file. (six --hash=sha256:abc)"
        );
    }

    #[test]
    fn hashes_are_allowed_in_included_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("req.txt"), "six --hash=sha256:abc\n").expect("write");
        let deps = PythonDeps::new("-r req.txt", dir.path());
        assert_eq!(deps.as_root_args().expect("args"), ["six"]);
    }

    #[test]
    fn unroll_reports_options_and_requirements() {
        let dir = tempdir().expect("tempdir");
        let deps = PythonDeps::new("-i https://a.test/simple\nsix\n-e ./pkg", dir.path());
        let (options, requirements) = deps.unroll().expect("unroll");
        assert_eq!(options, ["index_url=https://a.test/simple"]);
        assert_eq!(requirements, ["six", "-e ./pkg"]);
    }

    #[test]
    fn unroll_without_requirements_fails() {
        let dir = tempdir().expect("tempdir");
        let deps = PythonDeps::new("--pre", dir.path());
        assert!(matches!(deps.unroll(), Err(ReqFileError::NoDependencies)));

        let empty = PythonDeps::new("", dir.path());
        assert_eq!(empty.unroll().expect("unroll"), (vec![], vec![]));
    }

    #[test]
    fn extend_appends_and_resets() {
        let dir = tempdir().expect("tempdir");
        let mut deps = PythonDeps::new("six", dir.path());
        assert_eq!(deps.unroll().expect("unroll").1, ["six"]);

        deps += &PythonDeps::new("idna", dir.path());
        assert_eq!(deps.lines(), ["six", "idna"]);
        assert_eq!(deps.unroll().expect("unroll").1, ["six", "idna"]);
    }

    #[test]
    fn constraints_are_files_only() {
        let dir = tempdir().expect("tempdir");
        let err = PythonConstraints::new("--pre", dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "only constraints files or URLs can be provided");

        fs::write(dir.path().join("c.txt"), "attrs<26\n").expect("write");
        let constraints =
            PythonConstraints::new("c.txt\nhttps://example.com/c.txt", dir.path()).expect("new");
        let local = dir.path().join("c.txt").to_string_lossy().into_owned();
        assert_eq!(
            constraints.as_root_args().expect("args"),
            ["-c", local.as_str(), "-c", "https://example.com/c.txt"]
        );
        let read = constraints.constraints().expect("constraints");
        assert_eq!(read.len(), 1);
        assert!(read[0].is_constraint());
        assert_eq!(read[0].name(), Some("attrs"));
    }

    #[test]
    fn constraint_files_may_not_carry_options() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("c.txt"), "attrs<26 --hash=sha256:abc\n").expect("write");
        let constraints = PythonConstraints::new("c.txt", dir.path()).expect("new");
        assert!(matches!(
            constraints.constraints(),
            Err(ReqFileError::ConstraintRequirementOptions { .. })
        ));
    }
}
