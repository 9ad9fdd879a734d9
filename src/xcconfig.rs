//! Parse Xcode `.xcconfig` build configuration files.
//!
//! An xcconfig file is a list of `KEY = value` assignments, `// comments`
//! and `#include "other.xcconfig"` directives. Parsing keeps values raw:
//! `$(VAR)` references are expanded later by [`crate::vars`].

use std::path::{Path, PathBuf};

use log::trace;

use crate::BuildSettings;
use crate::error::{Error, Result};

/// The contents of a single xcconfig file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XcconfigDocument {
    /// Raw, unexpanded assignments. The last assignment to a key wins.
    pub config: BuildSettings,
    /// `#include` paths in file order, exactly as written.
    pub includes: Vec<String>,
}

/// Drop a `// comment` and any whitespace in front of it.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => line[..pos].trim_end(),
        None => line,
    }
}

/// Match `#include "path"`, returning the path between the quotes.
fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?;
    let rest = rest.trim_start().strip_prefix('"')?;
    rest.strip_suffix('"')
}

/// Parse the **contents** of an xcconfig file.
///
/// Comments and blank lines are dropped, `#include` directives are collected
/// into [`XcconfigDocument::includes`], and every other line containing `=`
/// becomes an assignment. Lines without `=` are silently skipped.
///
/// # Example
/// ```
/// let doc = xcspec_rs::xcconfig::parse_xcconfig("#include \"Base.xcconfig\"\nSDKROOT = iphoneos // device\n");
/// assert_eq!(doc.includes, vec!["Base.xcconfig"]);
/// assert_eq!(doc.config["SDKROOT"], "iphoneos");
/// ```
pub fn parse_xcconfig(content: &str) -> XcconfigDocument {
    let mut doc = XcconfigDocument::default();

    for line in content.lines() {
        let line = strip_comment(line);
        if line.trim().is_empty() {
            continue;
        }

        if let Some(path) = parse_include(line) {
            doc.includes.push(path.to_string());
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        doc.config.insert(key.trim().to_string(), value.trim().to_string());
    }

    doc
}

/// Parse an xcconfig file from disk.
pub fn parse_xcconfig_file(path: impl AsRef<Path>) -> Result<XcconfigDocument> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    trace!("reading xcconfig {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Ok(parse_xcconfig(&content))
}

/// Load an xcconfig file together with everything it includes.
///
/// Includes are loaded first, in order, so the file's own assignments
/// override included ones. Relative include paths are resolved against the
/// directory of the file containing the directive.
pub fn load_xcconfig(path: impl AsRef<Path>) -> Result<BuildSettings> {
    let mut settings = BuildSettings::new();
    let mut visiting = Vec::new();
    load_into(path.as_ref(), &mut settings, &mut visiting)?;
    Ok(settings)
}

fn load_into(path: &Path, settings: &mut BuildSettings, visiting: &mut Vec<PathBuf>) -> Result<()> {
    let doc = parse_xcconfig_file(path)?;

    let canonical = path.canonicalize()?;
    if visiting.contains(&canonical) {
        return Err(Error::IncludeCycle(path.to_path_buf()));
    }
    visiting.push(canonical);

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    for include in &doc.includes {
        load_into(&dir.join(include), settings, visiting)?;
    }

    for (key, value) in doc.config {
        settings.insert(key, value);
    }

    visiting.pop();
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
