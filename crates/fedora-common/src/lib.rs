//! Fedora Common - Shared constants and helpers for the Fedora Commons client
//!
//! This crate provides:
//! - Wire-level constants (namespaces, control groups, default MIME type)
//! - Blank-value helpers used by change detection
//! - REST API URL construction helpers (`urls`)

pub mod urls;
pub mod utils;

pub use utils::{is_blank, is_blank_bytes};

/// Namespace of the `datastreamProfile` and `datastreamHistory` documents
pub const MANAGEMENT_NS: &str = "http://www.fedora.info/definitions/1/0/management/";

/// Root element of a datastream profile document
pub const DATASTREAM_PROFILE: &str = "datastreamProfile";

/// MIME type Fedora assigns when none is supplied
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Profile field names with special decoding rules
pub const DS_SIZE: &str = "dsSize";
pub const DS_CREATE_DATE: &str = "dsCreateDate";
pub const DS_CHECKSUM_VALID: &str = "dsChecksumValid";
pub const DS_VERSIONABLE: &str = "dsVersionable";

/// How a datastream's bytes are stored by the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlGroup {
    /// Inline XML
    Inline,
    #[default]
    Managed,
    /// Content lives outside the repository, referenced by location
    External,
    /// Repository redirects clients to the location
    Redirect,
}

impl ControlGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlGroup::Inline => "X",
            ControlGroup::Managed => "M",
            ControlGroup::External => "E",
            ControlGroup::Redirect => "R",
        }
    }

    /// External and redirect datastreams carry a location instead of content
    pub fn is_by_reference(&self) -> bool {
        matches!(self, ControlGroup::External | ControlGroup::Redirect)
    }
}

impl std::fmt::Display for ControlGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ControlGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(ControlGroup::Inline),
            "M" => Ok(ControlGroup::Managed),
            "E" => Ok(ControlGroup::External),
            "R" => Ok(ControlGroup::Redirect),
            _ => Err(format!("Invalid control group: {}", s)),
        }
    }
}
