use std::collections::BTreeSet;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use tx_pip::{PylockFile, PythonConstraints, PythonDeps, RequirementSelection};
use tx_python::{PythonVersion, TargetPython};
use tx_util::{ensure_cachedir_tag, ensure_empty_dir};

use crate::{
    cli::{CleanArgs, DepsArgs, LockArgs},
    config::Config,
};

/// What a command prints on success.
#[derive(Debug)]
pub enum Output {
    Lines(Vec<String>),
    Json(serde_json::Value),
}

#[derive(Serialize)]
struct LockReport<'a> {
    lock_version: String,
    created_by: String,
    requirements: &'a [String],
}

pub fn lock(config: &Config, args: &LockArgs) -> Result<Output> {
    let reader = match resolve_target(config, args.python.python)? {
        Some(target) => PylockFile::with_target(&args.path, target),
        None => PylockFile::new(&args.path),
    };
    let selection = RequirementSelection {
        extras: non_empty_set(&args.extras),
        dependency_groups: non_empty_set(&args.groups),
        python_version: None,
    };
    let requirements = reader
        .get_requirements(&selection)?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    info!(
        path = %args.path.display(),
        count = requirements.len(),
        "selected locked requirements"
    );
    if args.json {
        let report = LockReport {
            lock_version: reader.lock_version()?,
            created_by: reader.created_by()?,
            requirements: &requirements,
        };
        return Ok(Output::Json(serde_json::to_value(report)?));
    }
    Ok(Output::Lines(requirements))
}

pub fn deps(config: &Config, args: &DepsArgs) -> Result<Output> {
    let mut deps = PythonDeps::from_lines(&args.lines, &args.root);
    if let Some(target) = resolve_target(config, args.python.python)? {
        deps = deps.with_target(target);
    }
    if args.unroll {
        let (options, requirements) = deps.unroll()?;
        return Ok(Output::Json(json!({
            "options": options,
            "requirements": requirements,
        })));
    }
    let mut flattened = deps.as_root_args()?;
    if !args.constraints.is_empty() {
        let constraints = PythonConstraints::new(&args.constraints.join("\n"), &args.root)?;
        flattened.extend(constraints.as_root_args()?);
    }
    debug!(count = flattened.len(), "flattened deps list");
    Ok(Output::Lines(flattened))
}

pub fn clean(args: &CleanArgs) -> Result<Output> {
    ensure_empty_dir(&args.dir, args.keep.as_deref())?;
    if args.tag {
        ensure_cachedir_tag(&args.dir)?;
    }
    info!(dir = %args.dir.display(), keep = ?args.keep, "cleaned directory");
    Ok(Output::Lines(vec![format!("cleaned {}", args.dir.display())]))
}

/// A configured interpreter is inspected for its platform; a requested version
/// alone yields a host-platform target without running Python. `None`
/// leaves inspection to the lock reader.
fn resolve_target(config: &Config, flag: Option<PythonVersion>) -> Result<Option<TargetPython>> {
    let version = config.target_version(flag);
    let target = match (&config.python, version) {
        (Some(python), Some(version)) => Some(TargetPython::inspect(python)?.with_version(version)?),
        (Some(python), None) => Some(TargetPython::inspect(python)?),
        (None, Some(version)) => Some(TargetPython::synthetic(version)?),
        (None, None) => None,
    };
    Ok(target)
}

fn non_empty_set(values: &[String]) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().cloned().collect())
    }
}
