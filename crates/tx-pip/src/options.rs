use serde::Serialize;

use crate::format::{detect_format, RequirementsFormat};

/// Options that take exactly one argument; a value glued to the flag
/// (`-rreq.txt`) is split off before parsing.
pub const ONE_ARG: [&str; 15] = [
    "-i",
    "--index-url",
    "--extra-index-url",
    "-e",
    "--editable",
    "-c",
    "--constraint",
    "-r",
    "--requirement",
    "-f",
    "--find-links",
    "--trusted-host",
    "--use-feature",
    "--no-binary",
    "--only-binary",
];

/// Path-like options whose value has its whitespace escaped.
pub const ONE_ARG_ESCAPE: [&str; 8] = [
    "-c",
    "--constraint",
    "-r",
    "--requirement",
    "-f",
    "--find-links",
    "-e",
    "--editable",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OptionKind {
    IndexUrl,
    ExtraIndexUrl,
    NoIndex,
    FindLinks,
    TrustedHost,
    Pre,
    PreferBinary,
    UseFeature,
    NoBinary,
    OnlyBinary,
    Requirement,
    Constraint,
    Editable,
    NoDeps,
}

impl OptionKind {
    pub(crate) fn lookup(flag: &str, allow_no_deps: bool) -> Option<Self> {
        let kind = match flag {
            "-i" | "--index-url" => Self::IndexUrl,
            "--extra-index-url" => Self::ExtraIndexUrl,
            "--no-index" => Self::NoIndex,
            "-f" | "--find-links" => Self::FindLinks,
            "--trusted-host" => Self::TrustedHost,
            "--pre" => Self::Pre,
            "--prefer-binary" => Self::PreferBinary,
            "--use-feature" => Self::UseFeature,
            "--no-binary" => Self::NoBinary,
            "--only-binary" => Self::OnlyBinary,
            "-r" | "--requirement" => Self::Requirement,
            "-c" | "--constraint" => Self::Constraint,
            "-e" | "--editable" => Self::Editable,
            "--no-deps" if allow_no_deps => Self::NoDeps,
            _ => return None,
        };
        Some(kind)
    }

    pub(crate) fn takes_value(self) -> bool {
        !matches!(
            self,
            Self::NoIndex | Self::Pre | Self::PreferBinary | Self::NoDeps
        )
    }
}

/// Installer flags collected while parsing a requirements list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InstallOptions {
    pub index_url: Option<String>,
    pub extra_index_urls: Vec<String>,
    pub no_index: bool,
    pub find_links: Vec<String>,
    pub trusted_hosts: Vec<String>,
    pub pre: bool,
    pub prefer_binary: bool,
    pub features_enabled: Vec<String>,
    pub no_binary: Vec<String>,
    pub only_binary: Vec<String>,
    pub requirements: Vec<String>,
    pub constraints: Vec<String>,
    pub no_deps: bool,
}

impl InstallOptions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply(&mut self, kind: OptionKind, value: Option<String>) {
        let value = value.unwrap_or_default();
        match kind {
            OptionKind::IndexUrl => self.index_url = Some(value),
            OptionKind::ExtraIndexUrl => push_unique(&mut self.extra_index_urls, value),
            OptionKind::NoIndex => self.no_index = true,
            OptionKind::FindLinks => push_unique(&mut self.find_links, value),
            OptionKind::TrustedHost => push_unique(&mut self.trusted_hosts, value),
            OptionKind::Pre => self.pre = true,
            OptionKind::PreferBinary => self.prefer_binary = true,
            OptionKind::UseFeature => push_unique(&mut self.features_enabled, value),
            OptionKind::NoBinary => push_unique(&mut self.no_binary, value),
            OptionKind::OnlyBinary => push_unique(&mut self.only_binary, value),
            OptionKind::Requirement => push_unique(&mut self.requirements, value),
            OptionKind::Constraint => push_unique(&mut self.constraints, value),
            OptionKind::NoDeps => self.no_deps = true,
            OptionKind::Editable => {}
        }
    }

    /// Render the options as installer arguments.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        self.render(|_| true)
    }

    /// Like [`Self::to_args`], but drops `-r` references to lock files, which
    /// are expanded into pinned requirements instead.
    #[must_use]
    pub fn to_root_args(&self) -> Vec<String> {
        self.render(|reference| detect_format(reference) != RequirementsFormat::LockFile)
    }

    fn render(&self, keep_requirement: impl Fn(&str) -> bool) -> Vec<String> {
        let mut args = Vec::new();
        let mut pair = |flag: &str, value: &str| {
            args.push(flag.to_string());
            args.push(value.to_string());
        };
        if let Some(url) = &self.index_url {
            pair("-i", url);
        }
        for url in &self.extra_index_urls {
            pair("--extra-index-url", url);
        }
        for link in &self.find_links {
            pair("-f", link);
        }
        for host in &self.trusted_hosts {
            pair("--trusted-host", host);
        }
        for feature in &self.features_enabled {
            pair("--use-feature", feature);
        }
        for value in &self.no_binary {
            pair("--no-binary", value);
        }
        for value in &self.only_binary {
            pair("--only-binary", value);
        }
        for reference in self.requirements.iter().filter(|r| keep_requirement(r.as_str())) {
            pair("-r", reference);
        }
        for reference in &self.constraints {
            pair("-c", reference);
        }
        if self.no_index {
            args.push("--no-index".into());
        }
        if self.pre {
            args.push("--pre".into());
        }
        if self.prefer_binary {
            args.push("--prefer-binary".into());
        }
        if self.no_deps {
            args.push("--no-deps".into());
        }
        args
    }

    /// Set options as `key=value` strings.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        let mut entries = Vec::new();
        if let Some(url) = &self.index_url {
            entries.push(format!("index_url={url}"));
        }
        let lists = [
            ("extra_index_urls", &self.extra_index_urls),
            ("find_links", &self.find_links),
            ("trusted_hosts", &self.trusted_hosts),
            ("features_enabled", &self.features_enabled),
            ("no_binary", &self.no_binary),
            ("only_binary", &self.only_binary),
            ("requirements", &self.requirements),
            ("constraints", &self.constraints),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                entries.push(format!("{key}={}", values.join(",")));
            }
        }
        let flags = [
            ("no_index", self.no_index),
            ("pre", self.pre),
            ("prefer_binary", self.prefer_binary),
            ("no_deps", self.no_deps),
        ];
        for (key, set) in flags {
            if set {
                entries.push(format!("{key}=true"));
            }
        }
        entries
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}
