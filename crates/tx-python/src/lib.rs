#![deny(clippy::all)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! The Python interpreter requirements are selected for: its version triple
//! and the PEP 508 marker environment used to evaluate package markers.

use std::{env, fmt, process::Command, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use pep440_rs::Version;
use pep508_rs::{MarkerEnvironment, StringVersion};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;
use which::which;

/// Environment variable naming the interpreter to inspect.
pub const PYTHON_ENV: &str = "TX_PYTHON";

const MARKER_SCRIPT: &str = r#"import json, os, platform, sys
impl_name = getattr(sys.implementation, "name", "cpython")
impl_version = platform.python_version()
python_full = "{}.{}.{}".format(*sys.version_info[:3])
python_short = f"{sys.version_info[0]}.{sys.version_info[1]}"
data = {
    "implementation_name": impl_name,
    "implementation_version": impl_version,
    "os_name": os.name,
    "platform_machine": platform.machine(),
    "platform_python_implementation": platform.python_implementation(),
    "platform_release": platform.release(),
    "platform_system": platform.system(),
    "platform_version": platform.version(),
    "python_full_version": python_full,
    "python_version": python_short,
    "sys_platform": sys.platform,
}
print(json.dumps(data))
"#;

/// Detects the Python interpreter path used for inspection.
///
/// # Errors
///
/// Returns an error when no interpreter can be found or the detected path is
/// not valid UTF-8.
pub fn detect_interpreter() -> Result<String> {
    if let Ok(explicit) = env::var(PYTHON_ENV) {
        return Ok(explicit);
    }

    for candidate in ["python3", "python"] {
        if let Ok(path) = which(candidate) {
            return path
                .into_os_string()
                .into_string()
                .map_err(|_| anyhow!("non-utf8 path"));
        }
    }

    bail!("no python interpreter found; set {PYTHON_ENV}")
}

/// A `major.minor.micro` interpreter version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
}

impl PythonVersion {
    pub const fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    /// The `major.minor` form used by the `python_version` marker.
    pub fn channel(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    pub fn to_pep440(&self) -> Result<Version> {
        Version::from_str(&self.to_string())
            .map_err(|err| anyhow!("`{self}` is not a valid PEP 440 version: {err}"))
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

impl From<(u64, u64, u64)> for PythonVersion {
    fn from((major, minor, micro): (u64, u64, u64)) -> Self {
        Self::new(major, minor, micro)
    }
}

impl FromStr for PythonVersion {
    type Err = anyhow::Error;

    /// Accepts `3`, `3.12` or `3.12.1`; missing components are zero.
    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let mut parts = trimmed.split('.');
        let mut next = |label: &str| -> Result<Option<u64>> {
            parts
                .next()
                .map(|part| {
                    part.parse::<u64>().with_context(|| {
                        format!("invalid python {label} component in `{trimmed}`")
                    })
                })
                .transpose()
        };
        let major = next("major")?.ok_or_else(|| anyhow!("python version missing major"))?;
        let minor = next("minor")?.unwrap_or(0);
        let micro = next("micro")?.unwrap_or(0);
        if parts.next().is_some() {
            bail!("python version `{trimmed}` has too many components");
        }
        Ok(Self::new(major, minor, micro))
    }
}

/// The interpreter a lock file is evaluated against.
#[derive(Clone, Debug)]
pub struct TargetPython {
    version: PythonVersion,
    markers: MarkerEnvironment,
}

impl TargetPython {
    pub fn new(version: PythonVersion, markers: MarkerEnvironment) -> Self {
        Self { version, markers }
    }

    /// Inspects the interpreter returned by [`detect_interpreter`].
    pub fn detect() -> Result<Self> {
        let python = detect_interpreter()?;
        Self::inspect(&python)
    }

    /// Inspects the marker environment of the given interpreter.
    pub fn inspect(python: &str) -> Result<Self> {
        let payload: MarkerEnvPayload = query_python(python, MARKER_SCRIPT, "marker environment")?;
        let version = payload.python_full_version.parse::<PythonVersion>()?;
        debug!(%python, %version, "inspected interpreter");
        let markers = MarkerEnvironment {
            implementation_name: payload.implementation_name,
            implementation_version: string_version(
                &payload.implementation_version,
                "implementation_version",
            )?,
            os_name: payload.os_name,
            platform_machine: payload.platform_machine,
            platform_python_implementation: payload.platform_python_implementation,
            platform_release: payload.platform_release,
            platform_system: payload.platform_system,
            platform_version: payload.platform_version,
            python_full_version: string_version(
                &payload.python_full_version,
                "python_full_version",
            )?,
            python_version: string_version(&payload.python_version, "python_version")?,
            sys_platform: payload.sys_platform,
        };
        Ok(Self { version, markers })
    }

    /// A CPython of `version` on the host platform, without running Python.
    pub fn synthetic(version: PythonVersion) -> Result<Self> {
        let full = version.to_string();
        let markers = MarkerEnvironment {
            implementation_name: "cpython".into(),
            implementation_version: string_version(&full, "implementation_version")?,
            os_name: host_os_name().into(),
            platform_machine: host_machine().into(),
            platform_python_implementation: "CPython".into(),
            platform_release: String::new(),
            platform_system: host_system().into(),
            platform_version: String::new(),
            python_full_version: string_version(&full, "python_full_version")?,
            python_version: string_version(&version.channel(), "python_version")?,
            sys_platform: host_sys_platform().into(),
        };
        Ok(Self { version, markers })
    }

    /// The same platform with the interpreter version replaced.
    pub fn with_version(&self, version: PythonVersion) -> Result<Self> {
        let mut markers = self.markers.clone();
        markers.python_full_version = string_version(&version.to_string(), "python_full_version")?;
        markers.python_version = string_version(&version.channel(), "python_version")?;
        Ok(Self { version, markers })
    }

    pub fn version(&self) -> PythonVersion {
        self.version
    }

    pub fn markers(&self) -> &MarkerEnvironment {
        &self.markers
    }
}

fn string_version(value: &str, field: &str) -> Result<StringVersion> {
    StringVersion::from_str(value)
        .map_err(|err| anyhow!("`{value}` is not a valid PEP 440 version for `{field}`: {err}"))
}

fn query_python<T>(python: &str, script: &str, guide: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let cmd = Command::new(python)
        .arg("-c")
        .arg(script)
        .output()
        .with_context(|| format!("failed to query {guide} via {python}"))?;
    if !cmd.status.success() {
        let stderr = String::from_utf8_lossy(&cmd.stderr);
        bail!("python {guide} query failed: {stderr}");
    }
    serde_json::from_slice(&cmd.stdout).with_context(|| format!("invalid {guide} payload"))
}

#[derive(Deserialize)]
struct MarkerEnvPayload {
    implementation_name: String,
    implementation_version: String,
    os_name: String,
    platform_machine: String,
    platform_python_implementation: String,
    platform_release: String,
    platform_system: String,
    platform_version: String,
    python_full_version: String,
    python_version: String,
    sys_platform: String,
}

fn host_os_name() -> &'static str {
    if cfg!(windows) {
        "nt"
    } else {
        "posix"
    }
}

fn host_sys_platform() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn host_system() -> &'static str {
    match env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

fn host_machine() -> &'static str {
    match (env::consts::OS, env::consts::ARCH) {
        ("windows", "x86_64") => "AMD64",
        ("windows", "aarch64") => "ARM64",
        ("macos", "aarch64") => "arm64",
        (_, arch) => arch,
    }
}
