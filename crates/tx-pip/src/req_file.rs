//! A pip-style requirements file reader.
//!
//! Include directives are followed relative to the including file; a
//! directive that names a lock file is replaced by the lock's pinned
//! requirements when the reader is configured to expand locks.

use std::{
    collections::HashSet,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use pep508_rs::Requirement as PepRequirement;
use tracing::debug;
use tx_python::TargetPython;

use crate::{
    error::ReqFileError,
    format::{detect_format, is_url, RequirementsFormat},
    options::{InstallOptions, OptionKind},
    pylock::LockExpansion,
};

/// What to do with an include directive that names a lock file.
#[derive(Clone, Debug, Default)]
pub enum LockPolicy {
    /// Read it like any other requirements file.
    #[default]
    Passthrough,
    /// Replace it with the lock's pinned requirements, evaluated for the
    /// given interpreter or the running one.
    Expand(Option<TargetPython>),
}

/// One requirement line, after option splitting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedRequirement {
    text: String,
    name: Option<String>,
    editable: bool,
    hashes: Vec<String>,
    from_file: PathBuf,
    constraint: bool,
}

impl ParsedRequirement {
    fn new(text: String, editable: bool, hashes: Vec<String>, from_file: &Path, constraint: bool) -> Self {
        let name = if editable {
            None
        } else {
            text.parse::<PepRequirement>()
                .ok()
                .map(|req| req.name.to_string())
        };
        Self {
            text,
            name,
            editable,
            hashes,
            from_file: from_file.to_path_buf(),
            constraint,
        }
    }

    /// The requirement as written: a PEP 508 string, a path or a URL.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Package name, when the text is a PEP 508 requirement.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_constraint(&self) -> bool {
        self.constraint
    }

    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }

    pub fn has_options(&self) -> bool {
        !self.hashes.is_empty()
    }

    pub fn from_file(&self) -> &Path {
        &self.from_file
    }

    /// Installer arguments for this requirement.
    pub fn as_args(&self) -> Vec<String> {
        if self.editable {
            vec!["-e".to_string(), self.text.clone()]
        } else {
            vec![self.text.clone()]
        }
    }
}

impl fmt::Display for ParsedRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.editable {
            f.write_str("-e ")?;
        }
        f.write_str(&self.text)?;
        for hash in &self.hashes {
            write!(f, " --hash={hash}")?;
        }
        Ok(())
    }
}

/// A requirements file, optionally with in-memory contents for its own path.
#[derive(Clone, Debug)]
pub struct RequirementsFile {
    path: PathBuf,
    constraint: bool,
    inline: Option<String>,
    lock_policy: LockPolicy,
    allow_no_deps: bool,
}

impl RequirementsFile {
    pub fn new(path: impl Into<PathBuf>, constraint: bool) -> Self {
        Self {
            path: path.into(),
            constraint,
            inline: None,
            lock_policy: LockPolicy::Passthrough,
            allow_no_deps: false,
        }
    }

    /// Serve `contents` instead of reading [`Self::path`] from disk.
    #[must_use]
    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.inline = Some(contents.into());
        self
    }

    #[must_use]
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// Accept `--no-deps`, which is only meaningful in a deps list.
    #[must_use]
    pub fn allow_no_deps(mut self) -> Self {
        self.allow_no_deps = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the file, merging installer flags into `options`.
    ///
    /// With `recurse`, `-r` includes are read and their requirements
    /// returned inline, and `-c` includes contribute constraint entries;
    /// otherwise includes are only recorded in `options`. URLs are always
    /// recorded, never fetched.
    pub fn parse(
        &self,
        options: &mut InstallOptions,
        recurse: bool,
    ) -> Result<Vec<ParsedRequirement>, ReqFileError> {
        let mut visited = HashSet::new();
        let mut requirements = Vec::new();
        self.parse_file(
            &self.path,
            self.constraint,
            options,
            recurse,
            &mut visited,
            &mut requirements,
        )?;
        Ok(requirements)
    }

    /// Requirements followed through every include.
    pub fn requirements(&self) -> Result<Vec<ParsedRequirement>, ReqFileError> {
        let mut options = InstallOptions::default();
        self.parse(&mut options, true)
    }

    /// Requirement arguments followed by the recorded installer flags.
    pub fn as_root_args(&self) -> Result<Vec<String>, ReqFileError> {
        let mut options = InstallOptions::default();
        let mut args = Vec::new();
        for requirement in self.parse(&mut options, false)? {
            args.extend(requirement.as_args());
        }
        args.extend(options.to_args());
        Ok(args)
    }

    fn parse_file(
        &self,
        path: &Path,
        constraint: bool,
        options: &mut InstallOptions,
        recurse: bool,
        visited: &mut HashSet<PathBuf>,
        out: &mut Vec<ParsedRequirement>,
    ) -> Result<(), ReqFileError> {
        if !visited.insert(path.to_path_buf()) {
            debug!(path = %path.display(), "skipping already included requirements file");
            return Ok(());
        }
        let content = self.file_content(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        for (line_no, line) in pre_process(&content) {
            for directive in parse_line(&line, path, line_no, self.allow_no_deps)? {
                match directive {
                    Directive::Requirement {
                        text,
                        editable,
                        hashes,
                    } => out.push(ParsedRequirement::new(
                        text, editable, hashes, path, constraint,
                    )),
                    Directive::Include { constraint: nested, target } => {
                        let resolved = resolve_include(base_dir, &target);
                        let follow = recurse && !is_url(&resolved);
                        if nested {
                            options.apply(OptionKind::Constraint, Some(resolved.clone()));
                        } else if !follow {
                            options.apply(OptionKind::Requirement, Some(resolved.clone()));
                        }
                        if follow {
                            self.parse_file(
                                Path::new(&resolved),
                                constraint || nested,
                                options,
                                recurse,
                                visited,
                                out,
                            )?;
                        }
                    }
                    Directive::Option { kind, value } => options.apply(kind, value),
                }
            }
        }
        Ok(())
    }

    fn file_content(&self, path: &Path) -> Result<String, ReqFileError> {
        if path == self.path {
            if let Some(inline) = &self.inline {
                return Ok(inline.clone());
            }
        }
        if let LockPolicy::Expand(target) = &self.lock_policy {
            let reference = path.to_string_lossy();
            if detect_format(&reference) == RequirementsFormat::LockFile {
                match LockExpansion::expand(path, target.as_ref()) {
                    LockExpansion::Expanded(text) => {
                        debug!(path = %path.display(), "expanded lock file reference");
                        return Ok(text);
                    }
                    LockExpansion::Fallback(err) => {
                        debug!(
                            path = %path.display(),
                            error = %err,
                            malformed = err.is_malformed(),
                            "lock file expansion failed, reading it as a requirements file"
                        );
                    }
                }
            }
        }
        fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ReqFileError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ReqFileError::Read {
                path: path.to_path_buf(),
                source,
            },
        })
    }
}

fn resolve_include(base_dir: &Path, target: &str) -> String {
    if is_url(target) || Path::new(target).is_absolute() {
        target.to_string()
    } else {
        base_dir.join(target).to_string_lossy().into_owned()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Directive {
    Requirement {
        text: String,
        editable: bool,
        hashes: Vec<String>,
    },
    Include {
        constraint: bool,
        target: String,
    },
    Option {
        kind: OptionKind,
        value: Option<String>,
    },
}

/// Logical lines with their 1-based starting line numbers: continuations
/// joined, comments stripped, blanks dropped, glued `-r`/`-c` split.
pub(crate) fn pre_process(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (idx, physical) in content.lines().enumerate() {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        let (start, mut buffer) = pending.take().unwrap_or((idx + 1, String::new()));
        if let Some(head) = physical.strip_suffix('\\') {
            buffer.push_str(head);
            pending = Some((start, buffer));
            continue;
        }
        buffer.push_str(physical);
        push_logical(&mut lines, start, &buffer);
    }
    if let Some((start, buffer)) = pending {
        push_logical(&mut lines, start, &buffer);
    }
    lines
}

fn push_logical(lines: &mut Vec<(usize, String)>, line_no: usize, raw: &str) {
    let stripped = strip_comment(raw).trim();
    if stripped.is_empty() {
        return;
    }
    lines.push((line_no, split_glued_include(stripped)));
}

fn strip_comment(line: &str) -> &str {
    let mut prev_is_space = true;
    for (idx, ch) in line.char_indices() {
        if ch == '#' && prev_is_space {
            return &line[..idx];
        }
        prev_is_space = ch.is_whitespace();
    }
    line
}

fn split_glued_include(line: &str) -> String {
    let mut chars = line.chars();
    let glued = match (chars.next(), chars.next(), chars.next()) {
        (Some('-'), Some('r'), Some(next)) => !next.is_whitespace() && next != '=',
        (Some('-'), Some('c'), Some(next)) => next.is_alphabetic(),
        _ => false,
    };
    if glued {
        format!("{} {}", &line[..2], &line[2..])
    } else {
        line.to_string()
    }
}

/// Split on whitespace not preceded by a backslash, dropping the escapes.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek().is_some_and(|next| next.is_whitespace()) {
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn split_flag(token: &str) -> (&str, Option<&str>) {
    if token.starts_with("--") {
        if let Some((flag, value)) = token.split_once('=') {
            return (flag, Some(value));
        }
    }
    (token, None)
}

fn parse_line(
    line: &str,
    file: &Path,
    line_no: usize,
    allow_no_deps: bool,
) -> Result<Vec<Directive>, ReqFileError> {
    if line.starts_with('-') {
        parse_option_line(line, file, line_no, allow_no_deps)
    } else {
        parse_requirement_line(line, file, line_no).map(|directive| vec![directive])
    }
}

fn parse_option_line(
    line: &str,
    file: &Path,
    line_no: usize,
    allow_no_deps: bool,
) -> Result<Vec<Directive>, ReqFileError> {
    let tokens = tokenize(line);
    let mut tokens = tokens.iter().map(String::as_str);
    let mut directives = Vec::new();
    while let Some(token) = tokens.next() {
        if !token.starts_with('-') {
            return Err(ReqFileError::UnexpectedArgument {
                file: file.to_path_buf(),
                line: line_no,
                token: token.to_string(),
            });
        }
        let (flag, inline_value) = split_flag(token);
        let kind =
            OptionKind::lookup(flag, allow_no_deps).ok_or_else(|| ReqFileError::UnknownOption {
                file: file.to_path_buf(),
                line: line_no,
                option: flag.to_string(),
            })?;
        let value = if kind.takes_value() {
            let value = inline_value
                .or_else(|| tokens.next())
                .ok_or_else(|| ReqFileError::MissingValue {
                    file: file.to_path_buf(),
                    line: line_no,
                    option: flag.to_string(),
                })?;
            Some(value.to_string())
        } else {
            None
        };
        directives.push(match (kind, value) {
            (OptionKind::Editable, Some(target)) => Directive::Requirement {
                text: target,
                editable: true,
                hashes: Vec::new(),
            },
            (OptionKind::Requirement, Some(target)) => Directive::Include {
                constraint: false,
                target,
            },
            (OptionKind::Constraint, Some(target)) => Directive::Include {
                constraint: true,
                target,
            },
            (kind, value) => Directive::Option { kind, value },
        });
    }
    Ok(directives)
}

fn parse_requirement_line(
    line: &str,
    file: &Path,
    line_no: usize,
) -> Result<Directive, ReqFileError> {
    let (text, rest) = match find_option_start(line) {
        Some(idx) => (line[..idx].trim(), &line[idx..]),
        None => (line.trim(), ""),
    };
    let mut hashes = Vec::new();
    let tokens = tokenize(rest);
    let mut tokens = tokens.iter().map(String::as_str);
    while let Some(token) = tokens.next() {
        let (flag, inline_value) = split_flag(token);
        if flag != "--hash" {
            return Err(ReqFileError::UnknownOption {
                file: file.to_path_buf(),
                line: line_no,
                option: flag.to_string(),
            });
        }
        let value = inline_value
            .or_else(|| tokens.next())
            .ok_or_else(|| ReqFileError::MissingValue {
                file: file.to_path_buf(),
                line: line_no,
                option: flag.to_string(),
            })?;
        hashes.push(value.to_string());
    }
    Ok(Directive::Requirement {
        text: text.to_string(),
        editable: false,
        hashes,
    })
}

/// Byte offset of the first ` --option` following a requirement.
fn find_option_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    (1..bytes.len().saturating_sub(1)).find(|&idx| {
        bytes[idx - 1].is_ascii_whitespace() && bytes[idx] == b'-' && bytes[idx + 1] == b'-'
    })
}
