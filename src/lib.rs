//! Resolve Xcode build settings into compiler and linker flags.
//!
//! - [`xcconfig`] reads `.xcconfig` files into raw settings
//! - [`xcspec`] loads `.xcspec` specifications into option descriptors
//! - [`mapping`] turns settings into flags using those descriptors
//!
//! ```
//! use xcspec_rs::XcSpec;
//!
//! let spec = XcSpec::parse(
//!     r#"{ Options = (
//!         { Name = GCC_OPTIMIZATION_LEVEL; Type = Enumeration; CommandLineArgs = ( "-O$(value)" ); },
//!         { Name = HEADER_SEARCH_PATHS; Type = PathList; CommandLinePrefixFlag = "-I"; },
//!     ); }"#,
//!     None,
//! )
//! .unwrap();
//!
//! let settings = xcspec_rs::xcconfig::parse_xcconfig(
//!     "GCC_OPTIMIZATION_LEVEL = 2\nHEADER_SEARCH_PATHS = include vendor\n",
//! )
//! .config;
//!
//! let mapping = spec.map_build_settings(&settings);
//! assert_eq!(mapping.flags, "-O2 -Iinclude -Ivendor");
//! assert_eq!(mapping.linker_flags, "");
//! ```

pub mod condition;
pub mod error;
pub mod mapping;
pub mod plist;
pub mod vars;
pub mod xcconfig;
pub mod xcspec;

/// Build settings by name, in insertion order.
pub type BuildSettings = indexmap::IndexMap<String, String>;

pub use error::{Error, Result};
pub use mapping::Mapping;
pub use xcconfig::{XcconfigDocument, load_xcconfig, parse_xcconfig};
pub use xcspec::{OptionDescriptor, XcSpec};
