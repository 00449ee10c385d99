use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use tx_python::PythonVersion;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Expand PEP 751 lock files into installer arguments",
    disable_help_subcommand = true
)]
pub struct TxCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[command(subcommand)]
    pub command: CommandCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandCli {
    #[command(
        about = "Print the pinned requirements a pylock.toml selects.",
        override_usage = "tx lock <PATH> [--extra NAME]... [--group NAME]... [--python X.Y.Z] [--json]"
    )]
    Lock(LockArgs),
    #[command(
        about = "Flatten a deps list into installer arguments, expanding lock files.",
        override_usage = "tx deps [--root DIR] [--python X.Y.Z] [--unroll] [--constraint PATH]... [-- <LINE>...]"
    )]
    Deps(DepsArgs),
    #[command(
        about = "Empty a directory, optionally keeping one entry and tagging it as a cache.",
        override_usage = "tx clean <DIR> [--keep NAME] [--tag]"
    )]
    Clean(CleanArgs),
}

#[derive(Args, Debug)]
pub struct LockArgs {
    #[arg(value_name = "PATH", help = "Lock file to read")]
    pub path: PathBuf,
    #[arg(long = "extra", value_name = "NAME", help = "Extra to enable (repeatable)")]
    pub extras: Vec<String>,
    #[arg(long = "group", value_name = "NAME", help = "Dependency group to select (repeatable)")]
    pub groups: Vec<String>,
    #[command(flatten)]
    pub python: PythonArgs,
    #[arg(long, help = "Emit {lock_version,created_by,requirements} JSON")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    #[arg(long, value_name = "DIR", default_value = ".", help = "Directory relative includes resolve against")]
    pub root: PathBuf,
    #[command(flatten)]
    pub python: PythonArgs,
    #[arg(long, help = "Print option entries and requirements instead of arguments")]
    pub unroll: bool,
    #[arg(
        long = "constraint",
        value_name = "PATH",
        help = "Constraint file or URL appended as -c (repeatable)"
    )]
    pub constraints: Vec<String>,
    #[arg(
        value_name = "LINE",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Deps list lines, e.g. `-r pylock.toml` or `pytest>=7`"
    )]
    pub lines: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    #[arg(value_name = "DIR", help = "Directory to empty (created when missing)")]
    pub dir: PathBuf,
    #[arg(long, value_name = "NAME", help = "Entry to keep")]
    pub keep: Option<String>,
    #[arg(long, help = "Write a CACHEDIR.TAG after cleaning")]
    pub tag: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PythonArgs {
    #[arg(
        long,
        value_name = "X.Y.Z",
        help = "Evaluate markers for this Python version instead of inspecting an interpreter"
    )]
    pub python: Option<PythonVersion>,
}
