#![deny(clippy::all)]
#![allow(clippy::missing_errors_doc)]

pub mod path;

pub use path::{ensure_cachedir_tag, ensure_empty_dir, CACHEDIR_TAG};
