//! `$(NAME)` macro expansion for build-setting values.
//!
//! Xcode writes references as `$(NAME)` or `${NAME}`. A name may itself
//! contain references (`$(CONFIG_$(PLATFORM_NAME))`), which are expanded
//! first. Expansion is recursive: the value substituted for a reference is
//! expanded again against the same table.
//!
//! A reference to a name that is already being expanded (a self or mutual
//! reference) is left verbatim in the output, and nesting is capped at
//! [`MAX_DEPTH`] levels, so expansion always terminates.

use log::warn;

use crate::BuildSettings;

/// Maximum number of nested references followed before giving up.
pub const MAX_DEPTH: usize = 32;

/// The tables a reference can be looked up in.
struct Scope<'a> {
    settings: &'a BuildSettings,
    /// Outer table consulted for `$(inherited)` and for names missing from
    /// `settings`.
    parent: Option<&'a BuildSettings>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.settings
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.get(name)))
            .map(String::as_str)
    }

    fn expand_reference(
        &self,
        name: &str,
        open: char,
        close: char,
        stack: &mut Vec<String>,
    ) -> String {
        if name == "inherited"
            && let Some(parent) = self.parent
        {
            return stack
                .last()
                .and_then(|key| parent.get(key))
                .cloned()
                .unwrap_or_default();
        }

        if stack.iter().any(|n| n == name) {
            warn!("self-referential build setting {name} left unexpanded (via {stack:?})");
            return format!("${open}{name}{close}");
        }
        if stack.len() >= MAX_DEPTH {
            warn!("build setting {name} nested deeper than {MAX_DEPTH} levels left unexpanded");
            return format!("${open}{name}{close}");
        }

        let Some(value) = self.lookup(name) else {
            return String::new();
        };

        stack.push(name.to_string());
        let expanded = expand_with(value, self, stack);
        stack.pop();
        expanded
    }
}

/// Byte offset of the `close` delimiter that balances an already-consumed
/// `open`, if any.
fn matching_close(s: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

fn expand_with(text: &str, scope: &Scope<'_>, stack: &mut Vec<String>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (open, close) = match after.chars().next() {
            Some('(') => ('(', ')'),
            Some('{') => ('{', '}'),
            _ => {
                result.push('$');
                rest = after;
                continue;
            }
        };

        // Unterminated reference: keep the remainder as-is.
        let Some(end) = matching_close(&after[1..], open, close) else {
            result.push_str(&rest[pos..]);
            rest = "";
            break;
        };

        let raw_name = &after[1..1 + end];
        rest = &after[end + 2..];

        let name = if raw_name.contains('$') {
            expand_with(raw_name, scope, stack)
        } else {
            raw_name.to_string()
        };
        result.push_str(&scope.expand_reference(&name, open, close, stack));
    }

    result.push_str(rest);
    result
}

/// Expand every `$(NAME)` / `${NAME}` reference in `text` using `settings`.
///
/// Unknown names expand to the empty string.
pub fn expand_vars(text: &str, settings: &BuildSettings) -> String {
    let scope = Scope {
        settings,
        parent: None,
    };
    expand_with(text, &scope, &mut Vec::new())
}

/// Resolve every value of a raw xcconfig table against the table itself.
///
/// `$(inherited)` expands to `parent`'s value for the same key, and names
/// not defined in `config` fall back to `parent`. Only the keys of `config`
/// are returned, in their original order.
pub fn resolve_settings(config: &BuildSettings, parent: &BuildSettings) -> BuildSettings {
    let scope = Scope {
        settings: config,
        parent: Some(parent),
    };
    config
        .iter()
        .map(|(key, value)| {
            let mut stack = vec![key.clone()];
            (key.clone(), expand_with(value, &scope, &mut stack))
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
