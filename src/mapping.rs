//! Translate build settings into compiler and linker flags.
//!
//! Every supplied setting is looked up among the option descriptors, its
//! `Condition` is checked against the complete settings table, and the
//! value (each item, for list types) is mapped with the descriptor's
//! [`OptionRule`]. `AdditionalLinkerArgs` are mapped independently into the
//! linker flags.
//!
//! Flags come out in the insertion order of the supplied settings, followed
//! by implicit settings in descriptor order.

use log::debug;

use crate::BuildSettings;
use crate::condition::check_condition;
use crate::vars::expand_vars;
use crate::xcspec::{ArgsSpec, OptionDescriptor, OptionRule, OptionType, find_option};

// ═══════════════════════════════════════════════════════════════════════════════
//  Mapping
// ═══════════════════════════════════════════════════════════════════════════════

/// Accumulated tool flags and additional linker flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    pub flags: String,
    pub linker_flags: String,
}

/// Join two flag strings with a single space, dropping empty parts.
fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (_, true) => a.to_string(),
        (true, false) => b.to_string(),
        (false, false) => format!("{a} {b}"),
    }
}

impl Mapping {
    pub fn new(flags: impl Into<String>, linker_flags: impl Into<String>) -> Self {
        Self {
            flags: flags.into(),
            linker_flags: linker_flags.into(),
        }
    }

    /// Append `other` after `self`. `Mapping::default()` is the identity.
    pub fn join(&self, other: &Mapping) -> Mapping {
        Mapping {
            flags: join_nonempty(&self.flags, &other.flags),
            linker_flags: join_nonempty(&self.linker_flags, &other.linker_flags),
        }
    }
}

impl FromIterator<Mapping> for Mapping {
    fn from_iter<T: IntoIterator<Item = Mapping>>(iter: T) -> Self {
        iter.into_iter().fold(Mapping::default(), |acc, m| acc.join(&m))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Settings tables
// ═══════════════════════════════════════════════════════════════════════════════

/// Settings whose default merely forwards another supplied setting.
///
/// An option with `DefaultValue = "$(X)"` that is not itself supplied takes
/// the value of `X` when `X` is supplied, e.g. a compiler's testability
/// switch following `ENABLE_TESTABILITY`.
pub fn implicit_settings(
    build_settings: &BuildSettings,
    options: &[OptionDescriptor],
) -> BuildSettings {
    let mut implicit = BuildSettings::new();

    for option in options {
        if build_settings.contains_key(&option.name) || implicit.contains_key(&option.name) {
            continue;
        }
        let Some(reference) = option
            .default_value
            .as_deref()
            .and_then(|d| d.strip_prefix("$("))
            .and_then(|d| d.strip_suffix(')'))
        else {
            continue;
        };
        if let Some(value) = build_settings.get(reference) {
            implicit.insert(option.name.clone(), value.clone());
        }
    }

    implicit
}

/// `settings` plus the default value of every option it does not define.
///
/// Options without a default map to the empty string. On duplicate names
/// the first declaration wins.
pub fn complete_settings(settings: &BuildSettings, options: &[OptionDescriptor]) -> BuildSettings {
    let mut complete = settings.clone();
    for option in options {
        if !complete.contains_key(&option.name) {
            complete.insert(option.name.clone(), option.default_value.clone().unwrap_or_default());
        }
    }
    complete
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Mapping rules
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve `CommandLineArgs` / `AdditionalLinkerArgs` for a scalar value.
///
/// `$(value)` in the selected templates is replaced by the value, then any
/// other references are expanded against `settings`.
pub fn map_args(args: &ArgsSpec, value: &str, settings: &BuildSettings) -> String {
    let templates: Vec<&str> = match args.select(value) {
        Some(ArgsSpec::Template(t)) => vec![t.as_str()],
        Some(ArgsSpec::List(list)) => list.iter().map(String::as_str).collect(),
        // `select` never stops on a switch.
        Some(ArgsSpec::Switch(_)) | None => return String::new(),
    };

    let joined = templates
        .iter()
        .map(|t| t.replace("$(value)", value))
        .collect::<Vec<_>>()
        .join(" ");
    expand_vars(&joined, settings)
}

/// Map one scalar value of an option.
pub fn map_scalar_value(
    option: &OptionDescriptor,
    value: &str,
    settings: &BuildSettings,
) -> Mapping {
    let flags = match option.rule() {
        OptionRule::Args(args) => map_args(args, value, settings),
        OptionRule::Flag(flag) => {
            if option.option_type == OptionType::Boolean {
                if value == "YES" {
                    flag.to_string()
                } else {
                    String::new()
                }
            } else {
                format!("{flag} {value}")
            }
        }
        // No space between prefix and value.
        OptionRule::PrefixFlag(prefix) => format!("{prefix}{value}"),
        OptionRule::CustomFlags => value.to_string(),
        OptionRule::Values(values) => values
            .iter()
            .find(|v| v.value == value)
            .and_then(|v| v.command_line_flag.clone())
            .unwrap_or_default(),
    };

    let linker_flags = option
        .additional_linker_args
        .as_ref()
        .map(|args| map_args(args, value, settings))
        .unwrap_or_default();

    Mapping {
        flags,
        linker_flags,
    }
}

/// Map an option's value, splitting list types on whitespace.
///
/// Returns no mappings when the option's condition does not hold.
pub fn map_option(
    option: &OptionDescriptor,
    value: &str,
    settings: &BuildSettings,
) -> Vec<Mapping> {
    if !check_condition(option.condition.as_deref(), settings) {
        debug!("condition for {} not satisfied, skipping", option.name);
        return Vec::new();
    }

    if option.option_type.is_list() {
        value
            .split_whitespace()
            .map(|v| map_scalar_value(option, v, settings))
            .collect()
    } else {
        vec![map_scalar_value(option, value, settings)]
    }
}

/// Map build settings to compiler and linker flags using `options`.
pub fn map_build_settings(build_settings: &BuildSettings, options: &[OptionDescriptor]) -> Mapping {
    let mut settings = build_settings.clone();
    settings.extend(implicit_settings(build_settings, options));
    let complete = complete_settings(&settings, options);

    settings
        .iter()
        .flat_map(|(name, value)| match find_option(options, name) {
            Some(option) => map_option(option, value, &complete),
            None => {
                debug!("no option declared for build setting {name}");
                Vec::new()
            }
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::xcconfig::load_xcconfig;
    use crate::xcspec::{EnumValue, XcSpec};

    fn make_settings(pairs: &[(&str, &str)]) -> BuildSettings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn option(name: &str, option_type: OptionType) -> OptionDescriptor {
        OptionDescriptor {
            name: name.to_string(),
            option_type,
            ..Default::default()
        }
    }

    fn flags(options: &[OptionDescriptor], pairs: &[(&str, &str)]) -> String {
        map_build_settings(&make_settings(pairs), options).flags
    }

    // ── Mapping ──────────────────────────────────────────────────────────

    #[test]
    fn join_skips_empty_parts() {
        let a = Mapping::new("-a", "");
        let b = Mapping::new("", "-la");
        let c = Mapping::new("-c", "-lc");
        assert_eq!(a.join(&b), Mapping::new("-a", "-la"));
        assert_eq!(a.join(&b).join(&c), Mapping::new("-a -c", "-la -lc"));
    }

    #[test]
    fn join_identity_and_associativity() {
        let samples = [
            Mapping::default(),
            Mapping::new("-a", ""),
            Mapping::new("", "-l1"),
            Mapping::new("-b -c", "-l2"),
        ];
        for a in &samples {
            assert_eq!(a.join(&Mapping::default()), *a);
            assert_eq!(Mapping::default().join(a), *a);
            for b in &samples {
                for c in &samples {
                    assert_eq!(a.join(b).join(c), a.join(&b.join(c)));
                }
            }
        }
    }

    #[test]
    fn collect_joins_in_order() {
        let m: Mapping = vec![Mapping::new("-1", ""), Mapping::default(), Mapping::new("-2", "-l")]
            .into_iter()
            .collect();
        assert_eq!(m, Mapping::new("-1 -2", "-l"));
    }

    // ── Rules ────────────────────────────────────────────────────────────

    #[test]
    fn boolean_flag() {
        let options = [OptionDescriptor {
            command_line_flag: Some("-f".to_string()),
            ..option("F", OptionType::Boolean)
        }];
        assert_eq!(flags(&options, &[("F", "YES")]), "-f");
        assert_eq!(flags(&options, &[("F", "NO")]), "");
    }

    #[test]
    fn string_flag_takes_value_after_space() {
        let options = [OptionDescriptor {
            command_line_flag: Some("-arch".to_string()),
            ..option("ARCH", OptionType::String)
        }];
        assert_eq!(flags(&options, &[("ARCH", "arm64")]), "-arch arm64");
    }

    #[test]
    fn prefix_flag_without_space() {
        let options = [OptionDescriptor {
            command_line_prefix_flag: Some("-I".to_string()),
            ..option("INC", OptionType::String)
        }];
        assert_eq!(flags(&options, &[("INC", "/usr/include")]), "-I/usr/include");
    }

    #[test]
    fn list_values_map_each_item() {
        let options = [OptionDescriptor {
            command_line_prefix_flag: Some("-F".to_string()),
            ..option("FRAMEWORK_SEARCH_PATHS", OptionType::PathList)
        }];
        assert_eq!(
            flags(&options, &[("FRAMEWORK_SEARCH_PATHS", "  a   b\tc ")]),
            "-Fa -Fb -Fc"
        );
        assert_eq!(flags(&options, &[("FRAMEWORK_SEARCH_PATHS", "")]), "");
    }

    #[test]
    fn scalar_value_is_not_split() {
        let options = [OptionDescriptor {
            command_line_flag: Some("-name".to_string()),
            ..option("NAME", OptionType::String)
        }];
        assert_eq!(flags(&options, &[("NAME", "a b")]), "-name a b");
    }

    #[test]
    fn custom_flags_pass_through() {
        let options = [OptionDescriptor {
            category: Some("CustomFlags".to_string()),
            ..option("OTHER_CFLAGS", OptionType::StringList)
        }];
        assert_eq!(
            flags(&options, &[("OTHER_CFLAGS", "-DA -fno-common")]),
            "-DA -fno-common"
        );
    }

    #[test]
    fn enumeration_values_lookup() {
        let options = [OptionDescriptor {
            values: vec![
                EnumValue {
                    value: "mh_dylib".to_string(),
                    command_line_flag: Some("-dynamiclib".to_string()),
                },
                EnumValue {
                    value: "mh_object".to_string(),
                    command_line_flag: None,
                },
            ],
            ..option("MACH_O_TYPE", OptionType::Enumeration)
        }];
        assert_eq!(flags(&options, &[("MACH_O_TYPE", "mh_dylib")]), "-dynamiclib");
        assert_eq!(flags(&options, &[("MACH_O_TYPE", "mh_object")]), "");
        assert_eq!(flags(&options, &[("MACH_O_TYPE", "unknown")]), "");
    }

    #[test]
    fn switch_table_with_fallback() {
        let mut cases = IndexMap::new();
        cases.insert(String::new(), ArgsSpec::List(vec![]));
        cases.insert("<<otherwise>>".to_string(), ArgsSpec::List(vec!["-x=$(value)".to_string()]));
        let options = [OptionDescriptor {
            command_line_args: Some(ArgsSpec::Switch(cases)),
            ..option("X", OptionType::String)
        }];

        assert_eq!(flags(&options, &[("X", "")]), "");
        assert_eq!(flags(&options, &[("X", "abc")]), "-x=abc");
    }

    #[test]
    fn switch_without_match_or_fallback_is_empty() {
        let mut cases = IndexMap::new();
        cases.insert("YES".to_string(), ArgsSpec::Template("-yes".to_string()));
        let options = [OptionDescriptor {
            command_line_args: Some(ArgsSpec::Switch(cases)),
            ..option("S", OptionType::Boolean)
        }];
        assert_eq!(flags(&options, &[("S", "YES")]), "-yes");
        assert_eq!(flags(&options, &[("S", "NO")]), "");
    }

    #[test]
    fn args_take_priority_over_flag() {
        let options = [OptionDescriptor {
            command_line_args: Some(ArgsSpec::Template("-args=$(value)".to_string())),
            command_line_flag: Some("-flag".to_string()),
            ..option("P", OptionType::String)
        }];
        assert_eq!(flags(&options, &[("P", "v")]), "-args=v");
    }

    #[test]
    fn templates_resolve_other_settings() {
        let options = [
            OptionDescriptor {
                command_line_args: Some(ArgsSpec::List(vec![
                    "-target".to_string(),
                    "$(CURRENT_ARCH)-apple-ios$(value)".to_string(),
                ])),
                ..option("IPHONEOS_DEPLOYMENT_TARGET", OptionType::String)
            },
            OptionDescriptor {
                default_value: Some("arm64".to_string()),
                ..option("CURRENT_ARCH", OptionType::String)
            },
        ];
        assert_eq!(
            flags(&options, &[("IPHONEOS_DEPLOYMENT_TARGET", "15.0")]),
            "-target arm64-apple-ios15.0"
        );
    }

    #[test]
    fn linker_args_are_independent() {
        let options = [OptionDescriptor {
            command_line_flag: Some("-fprofile-instr-generate".to_string()),
            additional_linker_args: Some(ArgsSpec::List(vec![
                "-fprofile-instr-generate".to_string(),
            ])),
            ..option("CLANG_ENABLE_CODE_COVERAGE", OptionType::Boolean)
        }];
        let settings = make_settings(&[("CLANG_ENABLE_CODE_COVERAGE", "YES")]);
        let m = map_build_settings(&settings, &options);
        assert_eq!(m, Mapping::new("-fprofile-instr-generate", "-fprofile-instr-generate"));
    }

    #[test]
    fn unknown_setting_contributes_nothing() {
        let options = [OptionDescriptor {
            command_line_flag: Some("-f".to_string()),
            ..option("F", OptionType::Boolean)
        }];
        let settings = make_settings(&[("PRODUCT_NAME", "App"), ("F", "YES")]);
        let m = map_build_settings(&settings, &options);
        assert_eq!(m, Mapping::new("-f", ""));
    }

    // ── Conditions, defaults and implicit settings ───────────────────────

    #[test]
    fn condition_end_to_end() {
        let options = [
            OptionDescriptor {
                command_line_flag: Some("-opt".to_string()),
                condition: Some("$(ENABLE) == YES".to_string()),
                ..option("OPT", OptionType::String)
            },
            OptionDescriptor {
                default_value: Some("NO".to_string()),
                ..option("ENABLE", OptionType::Boolean)
            },
        ];
        assert_eq!(flags(&options, &[("OPT", "val"), ("ENABLE", "YES")]), "-opt val");
        assert_eq!(flags(&options, &[("OPT", "val"), ("ENABLE", "NO")]), "");
        // ENABLE falls back to its default.
        assert_eq!(flags(&options, &[("OPT", "val")]), "");
    }

    #[test]
    fn unparsable_condition_is_false() {
        let options = [OptionDescriptor {
            command_line_flag: Some("-x".to_string()),
            condition: Some("$(NOT_DECLARED) == YES".to_string()),
            ..option("X", OptionType::String)
        }];
        assert_eq!(flags(&options, &[("X", "1")]), "");
    }

    #[test]
    fn implicit_setting_follows_referenced_value() {
        let options = [
            option("ENABLE_TESTABILITY", OptionType::Boolean),
            OptionDescriptor {
                default_value: Some("$(ENABLE_TESTABILITY)".to_string()),
                command_line_flag: Some("-enable-testing".to_string()),
                ..option("SWIFT_ENABLE_TESTABILITY", OptionType::Boolean)
            },
        ];

        let settings = make_settings(&[("ENABLE_TESTABILITY", "YES")]);
        let implicit = implicit_settings(&settings, &options);
        assert_eq!(implicit, make_settings(&[("SWIFT_ENABLE_TESTABILITY", "YES")]));
        assert_eq!(map_build_settings(&settings, &options).flags, "-enable-testing");

        // An explicit value is never replaced.
        assert_eq!(
            flags(&options, &[("ENABLE_TESTABILITY", "YES"), ("SWIFT_ENABLE_TESTABILITY", "NO")]),
            ""
        );
        // Nothing to forward.
        assert!(implicit_settings(&BuildSettings::new(), &options).is_empty());
    }

    #[test]
    fn complete_settings_fill_defaults_first_declaration_wins() {
        let options = [
            OptionDescriptor {
                default_value: Some("s".to_string()),
                ..option("GCC_OPTIMIZATION_LEVEL", OptionType::Enumeration)
            },
            option("NO_DEFAULT", OptionType::String),
            OptionDescriptor {
                default_value: Some("0".to_string()),
                ..option("GCC_OPTIMIZATION_LEVEL", OptionType::Enumeration)
            },
        ];
        let complete = complete_settings(&make_settings(&[("SUPPLIED", "1")]), &options);
        assert_eq!(
            complete,
            make_settings(&[("SUPPLIED", "1"), ("GCC_OPTIMIZATION_LEVEL", "s"), ("NO_DEFAULT", "")])
        );
    }

    #[test]
    fn output_follows_insertion_order() {
        let options = [
            OptionDescriptor {
                command_line_flag: Some("-a".to_string()),
                ..option("A", OptionType::Boolean)
            },
            OptionDescriptor {
                command_line_flag: Some("-b".to_string()),
                ..option("B", OptionType::Boolean)
            },
        ];
        assert_eq!(flags(&options, &[("A", "YES"), ("B", "YES")]), "-a -b");
        assert_eq!(flags(&options, &[("B", "YES"), ("A", "YES")]), "-b -a");
    }

    // ── Fixtures ─────────────────────────────────────────────────────────

    fn fixture_spec() -> XcSpec {
        let core = XcSpec::load("testdata/CoreBuildSystem.xcspec", None).unwrap();
        XcSpec::load("testdata/Clang.xcspec", Some(&core)).unwrap()
    }

    #[test]
    fn map_fixture_xcconfig() {
        let spec = fixture_spec();
        let settings = load_xcconfig("testdata/App.xcconfig").unwrap();

        let m = spec.map_build_settings(&settings);
        assert_eq!(
            m.flags,
            "-fobjc-arc -O0 -DNDEBUG=1 -Iinclude -Ithird_party/include -enable-testing"
        );
        assert_eq!(m.linker_flags, "-fobjc-arc");
    }

    #[test]
    fn fixture_index_store_condition_uses_defaults() {
        let spec = fixture_spec();

        let m = spec.map_build_settings(&make_settings(&[
            ("CLANG_INDEX_STORE_ENABLE", "YES"),
            ("GCC_OPTIMIZATION_LEVEL", "0"),
        ]));
        assert_eq!(m.flags, "-index-store-path build/obj/Index/DataStore -O0");

        // The clang default (s) wins over the core default (0).
        let m = spec.map_build_settings(&make_settings(&[("CLANG_INDEX_STORE_ENABLE", "YES")]));
        assert_eq!(m.flags, "");

        let m = spec.map_build_settings(&make_settings(&[
            ("CLANG_INDEX_STORE_ENABLE", "YES"),
            ("COMPILER_INDEX_STORE_ENABLE", "YES"),
        ]));
        assert_eq!(m.flags, "-index-store-path build/obj/Index/DataStore");
    }

    #[test]
    fn fixture_deployment_target_switch() {
        let spec = fixture_spec();
        let m = spec.map_build_settings(&make_settings(&[("MACOSX_DEPLOYMENT_TARGET", "10.15")]));
        assert_eq!(m.flags, "-mmacosx-version-min=10.15");
        let m = spec.map_build_settings(&make_settings(&[("MACOSX_DEPLOYMENT_TARGET", "")]));
        assert_eq!(m.flags, "");
    }

    #[test]
    fn fixture_linker_options() {
        let spec = fixture_spec();

        let m = spec.map_build_settings(&make_settings(&[
            ("MACH_O_TYPE", "mh_dylib"),
            ("DEAD_CODE_STRIPPING", "YES"),
            ("GCC_WARN_UNUSED_VARIABLE", "NO"),
        ]));
        assert_eq!(m.flags, "-dynamiclib -dead_strip -Wno-unused-variable");

        let m = spec.map_build_settings(&make_settings(&[
            ("MACH_O_TYPE", "mh_object"),
            ("DEAD_CODE_STRIPPING", "YES"),
        ]));
        assert_eq!(m.flags, "-r");
    }
}
