use std::path::PathBuf;

/// Fatal failures while reading xcconfig or xcspec input.
///
/// Problems found while *interpreting* settings (unknown setting names,
/// conditions that cannot be parsed, malformed option records) are not
/// errors: they contribute nothing and are reported through [`log`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no such file: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported property list encoding: {0}")]
    UnsupportedConversion(String),

    #[error("property list error: {0}")]
    Plist(#[from] plist::Error),

    #[error("malformed property list: {0}")]
    MalformedPlist(String),

    #[error("include cycle detected at {}", .0.display())]
    IncludeCycle(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
