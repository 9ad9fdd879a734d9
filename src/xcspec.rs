//! Load `.xcspec` build-system specifications into option descriptors.
//!
//! An xcspec is a property list holding one tool specification or an array
//! of them. Each specification lists its build settings under `Options` (or
//! `Properties`), and every entry describes how one setting turns into
//! command-line flags:
//!
//! ```text
//! {
//!     Name = GCC_OPTIMIZATION_LEVEL;
//!     Type = Enumeration;
//!     DefaultValue = s;
//!     CommandLineArgs = ( "-O$(value)" );
//! }
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::BuildSettings;
use crate::error::{Error, Result};
use crate::mapping::{self, Mapping};
use crate::plist::{self, PlistValue};

/// Key in a [`ArgsSpec::Switch`] used when no entry matches the value.
pub const OTHERWISE: &str = "<<otherwise>>";

// ═══════════════════════════════════════════════════════════════════════════════
//  Option descriptors
// ═══════════════════════════════════════════════════════════════════════════════

/// Declared type of a build setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionType {
    #[default]
    String,
    StringList,
    PathList,
    Boolean,
    Enumeration,
}

impl OptionType {
    /// Interpret an xcspec `Type` value.
    ///
    /// Anything ending in `list` (case-insensitively) is a list type; unknown
    /// types are treated as plain strings.
    pub fn from_spec_type(s: &str) -> Self {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "boolean" | "bool" => OptionType::Boolean,
            "enumeration" => OptionType::Enumeration,
            _ if lower.ends_with("list") && lower.starts_with("path") => OptionType::PathList,
            _ if lower.ends_with("list") => OptionType::StringList,
            _ => OptionType::String,
        }
    }

    /// Whether values of this type are whitespace-separated lists.
    pub fn is_list(self) -> bool {
        matches!(self, OptionType::StringList | OptionType::PathList)
    }
}

/// `CommandLineArgs` / `AdditionalLinkerArgs`: templates, or a switch on the
/// setting value whose entries are themselves [`ArgsSpec`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsSpec {
    Template(String),
    List(Vec<String>),
    Switch(IndexMap<String, ArgsSpec>),
}

impl ArgsSpec {
    fn from_plist(value: &PlistValue) -> Option<Self> {
        match value {
            PlistValue::Array(items) => {
                let templates = items
                    .iter()
                    .filter_map(PlistValue::as_setting_string)
                    .collect();
                Some(ArgsSpec::List(templates))
            }
            PlistValue::Dict(cases) => {
                let cases = cases
                    .iter()
                    .filter_map(|(k, v)| ArgsSpec::from_plist(v).map(|spec| (k.clone(), spec)))
                    .collect();
                Some(ArgsSpec::Switch(cases))
            }
            scalar => scalar.as_setting_string().map(ArgsSpec::Template),
        }
    }

    /// Select the switch case for `value`, falling back to `<<otherwise>>`,
    /// until a template or template list is reached.
    pub fn select(&self, value: &str) -> Option<&ArgsSpec> {
        match self {
            ArgsSpec::Switch(cases) => cases
                .get(value)
                .or_else(|| cases.get(OTHERWISE))
                .and_then(|case| case.select(value)),
            templates => Some(templates),
        }
    }
}

/// One entry of an enumeration's `Values` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub value: String,
    pub command_line_flag: Option<String>,
}

/// The declaration of one build setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionDescriptor {
    pub name: String,
    pub option_type: OptionType,
    /// May itself reference another setting, e.g. `$(ENABLE_TESTABILITY)`.
    pub default_value: Option<String>,
    /// Unexpanded condition text.
    pub condition: Option<String>,
    pub category: Option<String>,
    pub command_line_flag: Option<String>,
    pub command_line_prefix_flag: Option<String>,
    pub command_line_args: Option<ArgsSpec>,
    pub additional_linker_args: Option<ArgsSpec>,
    pub values: Vec<EnumValue>,
}

/// How a descriptor maps a scalar value onto tool flags. At most one rule
/// applies, in the priority order of the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRule<'a> {
    /// `CommandLineArgs`
    Args(&'a ArgsSpec),
    /// `CommandLineFlag`
    Flag(&'a str),
    /// `CommandLinePrefixFlag`
    PrefixFlag(&'a str),
    /// `Category = CustomFlags`: the value is passed through.
    CustomFlags,
    /// Per-value flags from `Values`.
    Values(&'a [EnumValue]),
}

impl OptionDescriptor {
    /// The flag-mapping rule for this option.
    pub fn rule(&self) -> OptionRule<'_> {
        if let Some(args) = &self.command_line_args {
            OptionRule::Args(args)
        } else if let Some(flag) = &self.command_line_flag {
            OptionRule::Flag(flag)
        } else if let Some(prefix) = &self.command_line_prefix_flag {
            OptionRule::PrefixFlag(prefix)
        } else if self.category.as_deref() == Some("CustomFlags") {
            OptionRule::CustomFlags
        } else {
            OptionRule::Values(&self.values)
        }
    }

    /// Build a descriptor from a raw option dictionary. Returns `None` when
    /// the record has no `Name`.
    fn from_plist(dict: &IndexMap<String, PlistValue>) -> Option<Self> {
        let text = |key: &str| dict.get(key).and_then(PlistValue::as_setting_string);

        let name = text("Name")?;
        let values = dict
            .get("Values")
            .and_then(PlistValue::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(|v| match v {
                PlistValue::Dict(entry) => Some(EnumValue {
                    value: entry.get("Value").and_then(PlistValue::as_setting_string)?,
                    command_line_flag: entry
                        .get("CommandLineFlag")
                        .and_then(PlistValue::as_setting_string),
                }),
                // Plain enumeration values carry no flag of their own.
                scalar => scalar.as_setting_string().map(|value| EnumValue {
                    value,
                    command_line_flag: None,
                }),
            })
            .collect();

        Some(Self {
            option_type: text("Type")
                .map(|t| OptionType::from_spec_type(&t))
                .unwrap_or_default(),
            default_value: text("DefaultValue"),
            condition: text("Condition"),
            category: text("Category"),
            command_line_flag: text("CommandLineFlag"),
            command_line_prefix_flag: text("CommandLinePrefixFlag"),
            command_line_args: dict.get("CommandLineArgs").and_then(ArgsSpec::from_plist),
            additional_linker_args: dict.get("AdditionalLinkerArgs").and_then(ArgsSpec::from_plist),
            values,
            name,
        })
    }
}

/// The first option in `options` declared with `name`. Earlier
/// declarations shadow later ones.
pub fn find_option<'a>(
    options: &'a [OptionDescriptor],
    name: &str,
) -> Option<&'a OptionDescriptor> {
    options.iter().find(|o| o.name == name)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  XcSpec – loaded specification
// ═══════════════════════════════════════════════════════════════════════════════

/// A loaded xcspec: an ordered list of option descriptors.
///
/// When loaded on top of a core build-system spec, the core options are
/// appended after the spec's own, so [`find_option`](Self::find_option)
/// prefers the spec's declaration on duplicate names.
#[derive(Debug, Clone, Default)]
pub struct XcSpec {
    /// The file the spec was loaded from. `None` when created via
    /// [`XcSpec::parse`].
    pub path: Option<PathBuf>,
    pub options: Vec<OptionDescriptor>,
}

impl XcSpec {
    /// Parse an xcspec from its XML or OpenStep source.
    pub fn parse(source: &str, core: Option<&XcSpec>) -> Result<Self> {
        let plist = plist::parse_plist(source)?;
        Self::from_plist(&plist, core)
    }

    /// Load an xcspec file from disk.
    pub fn load(path: impl AsRef<Path>, core: Option<&XcSpec>) -> Result<Self> {
        let path = path.as_ref();
        let plist = plist::load_plist(path)?;
        let mut spec = Self::from_plist(&plist, core)?;
        spec.path = Some(path.to_path_buf());
        debug!("loaded {} options from {}", spec.options.len(), path.display());
        Ok(spec)
    }

    fn from_plist(plist: &PlistValue, core: Option<&XcSpec>) -> Result<Self> {
        let tools = match plist {
            PlistValue::Array(tools) => tools.as_slice(),
            PlistValue::Dict(_) => std::slice::from_ref(plist),
            _ => {
                return Err(Error::MalformedPlist(
                    "xcspec root must be a dictionary or an array".to_string(),
                ));
            }
        };

        let mut options = Vec::new();
        for tool in tools {
            let Some(tool) = tool.as_dict() else {
                warn!("skipping xcspec entry that is not a dictionary");
                continue;
            };
            let Some(raw_options) = tool
                .get("Options")
                .or_else(|| tool.get("Properties"))
                .and_then(PlistValue::as_array)
            else {
                continue;
            };

            for raw in raw_options {
                match raw.as_dict().and_then(OptionDescriptor::from_plist) {
                    Some(option) => options.push(option),
                    None => warn!("skipping xcspec option without a Name: {raw:?}"),
                }
            }
        }

        if let Some(core) = core {
            options.extend(core.options.iter().cloned());
        }

        Ok(Self {
            path: None,
            options,
        })
    }

    /// The first option declared with `name`.
    pub fn find_option(&self, name: &str) -> Option<&OptionDescriptor> {
        find_option(&self.options, name)
    }

    /// Map build settings to compiler and linker flags.
    ///
    /// See [`mapping::map_build_settings`].
    pub fn map_build_settings(&self, build_settings: &BuildSettings) -> Mapping {
        mapping::map_build_settings(build_settings, &self.options)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
