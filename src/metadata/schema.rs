//! Plugin metadata schema: accepted version, enumerations and the typed record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The single accepted `pluginmetadataversion`.
pub const CURRENT_METADATA_VERSION: i64 = 2;

/// Keys a `license` map must contain, and the only keys it may contain.
pub const LICENSE_KEYS: [&str; 2] = ["name", "text"];

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted value, in schema order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name of the value.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Wire names of every accepted value.
            pub fn names() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| format!("{s} not one of {:?}", Self::names()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Kind of functionality a plugin provides.
    PluginType {
        Core => "core",
        Ui => "ui",
        BinaryView => "binaryview",
        Architecture => "architecture",
        Helper => "helper",
    }
}

string_enum! {
    /// Scripting API a plugin targets.
    PluginApi {
        Python3 => "python3",
    }
}

string_enum! {
    /// Host operating system.
    Platform {
        Darwin => "Darwin",
        Windows => "Windows",
        Linux => "Linux",
    }
}

/// License declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct License {
    /// License name (e.g. "MIT")
    pub name: String,

    /// Full license text
    pub text: String,
}

/// A plugin.json record that passed validation.
///
/// Only built by [`super::RawMetadata::into_validated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Metadata schema version
    pub pluginmetadataversion: i64,

    /// Display name
    pub name: String,

    /// Author shown in the index
    pub author: String,

    /// Plugin kinds
    #[serde(rename = "type")]
    pub plugin_type: Vec<PluginType>,

    /// Supported scripting APIs
    pub api: Vec<PluginApi>,

    /// Short description
    pub description: String,

    /// Markdown description
    pub longdescription: String,

    /// License
    pub license: License,

    /// Supported platforms
    pub platforms: Vec<Platform>,

    /// Markdown install instructions per platform
    pub installinstructions: BTreeMap<Platform, String>,

    /// Version string
    pub version: String,

    /// Minimum supported host build
    #[serde(alias = "minimumBinaryNinjaVersion")]
    pub minimumbinaryninjaversion: i64,

    /// Optional dependency declaration: installer name to package list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, Vec<String>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(PluginType::BinaryView.as_str(), "binaryview");
        assert_eq!("ui".parse::<PluginType>(), Ok(PluginType::Ui));
        assert_eq!(Platform::names(), vec!["Darwin", "Windows", "Linux"]);
        assert!("python2".parse::<PluginApi>().is_err());
    }

    #[test]
    fn test_enum_serde_round_trip() {
        let json = serde_json::to_string(&vec![Platform::Darwin, Platform::Linux]).unwrap();
        assert_eq!(json, r#"["Darwin","Linux"]"#);
        let back: Vec<Platform> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Platform::Darwin, Platform::Linux]);
    }

    #[test]
    fn test_license_rejects_extra_keys() {
        let result: Result<License, _> =
            serde_json::from_str(r#"{"name": "MIT", "text": "...", "url": "x"}"#);
        assert!(result.is_err());
    }
}
