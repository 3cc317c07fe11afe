//! Datastream attribute registry
//!
//! Static table of every datastream attribute: the client-side name (also
//! the REST API parameter name), the profile field it maps to on the wire,
//! its default and whether the server owns it.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ClientError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DsAttribute {
    ControlGroup,
    DsLocation,
    AltIds,
    DsLabel,
    Versionable,
    DsState,
    FormatUri,
    ChecksumType,
    Checksum,
    MimeType,
    LogMessage,
    IgnoreContent,
    LastModifiedDate,
    Content,
    AsOfDateTime,
    DsCreateDate,
    DsSize,
    DsVersionId,
}

struct AttributeSpec {
    attribute: DsAttribute,
    name: &'static str,
    wire_name: Option<&'static str>,
    read_only: bool,
}

const fn spec(
    attribute: DsAttribute,
    name: &'static str,
    wire_name: Option<&'static str>,
    read_only: bool,
) -> AttributeSpec {
    AttributeSpec {
        attribute,
        name,
        wire_name,
        read_only,
    }
}

static REGISTRY: [AttributeSpec; 18] = [
    spec(DsAttribute::ControlGroup, "controlGroup", Some("dsControlGroup"), false),
    spec(DsAttribute::DsLocation, "dsLocation", Some("dsLocation"), false),
    spec(DsAttribute::AltIds, "altIDs", None, false),
    spec(DsAttribute::DsLabel, "dsLabel", Some("dsLabel"), false),
    spec(DsAttribute::Versionable, "versionable", Some("dsVersionable"), false),
    spec(DsAttribute::DsState, "dsState", Some("dsState"), false),
    spec(DsAttribute::FormatUri, "formatURI", Some("dsFormatURI"), false),
    spec(DsAttribute::ChecksumType, "checksumType", Some("dsChecksumType"), false),
    spec(DsAttribute::Checksum, "checksum", Some("dsChecksum"), false),
    spec(DsAttribute::MimeType, "mimeType", Some("dsMIME"), false),
    spec(DsAttribute::LogMessage, "logMessage", None, false),
    spec(DsAttribute::IgnoreContent, "ignoreContent", None, false),
    spec(DsAttribute::LastModifiedDate, "lastModifiedDate", None, false),
    spec(DsAttribute::Content, "content", None, false),
    spec(DsAttribute::AsOfDateTime, "asOfDateTime", None, false),
    spec(DsAttribute::DsCreateDate, "dsCreateDate", Some("dsCreateDate"), true),
    spec(DsAttribute::DsSize, "dsSize", Some("dsSize"), true),
    spec(DsAttribute::DsVersionId, "dsVersionID", Some("dsVersionID"), true),
];

impl DsAttribute {
    /// Attributes a client may set and that change tracking covers
    pub const TRACKED: [DsAttribute; 15] = [
        DsAttribute::ControlGroup,
        DsAttribute::DsLocation,
        DsAttribute::AltIds,
        DsAttribute::DsLabel,
        DsAttribute::Versionable,
        DsAttribute::DsState,
        DsAttribute::FormatUri,
        DsAttribute::ChecksumType,
        DsAttribute::Checksum,
        DsAttribute::MimeType,
        DsAttribute::LogMessage,
        DsAttribute::IgnoreContent,
        DsAttribute::LastModifiedDate,
        DsAttribute::Content,
        DsAttribute::AsOfDateTime,
    ];

    /// Server-assigned attributes
    pub const READ_ONLY: [DsAttribute; 3] = [
        DsAttribute::DsCreateDate,
        DsAttribute::DsSize,
        DsAttribute::DsVersionId,
    ];

    fn spec(self) -> &'static AttributeSpec {
        // REGISTRY is declared in enum order
        &REGISTRY[self as usize]
    }

    pub fn all() -> impl Iterator<Item = DsAttribute> {
        REGISTRY.iter().map(|s| s.attribute)
    }

    /// Client-side name, also the REST API parameter name
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Profile field name, `None` for client-only attributes
    pub fn wire_name(self) -> Option<&'static str> {
        self.spec().wire_name
    }

    /// Key used in create/modify parameter sets
    pub fn param_key(self) -> &'static str {
        self.wire_name().unwrap_or_else(|| self.name())
    }

    pub fn is_read_only(self) -> bool {
        self.spec().read_only
    }

    pub fn default_value(self) -> Option<Value> {
        match self {
            DsAttribute::ControlGroup => Some(Value::from("M")),
            DsAttribute::DsState => Some(Value::from("A")),
            DsAttribute::Versionable => Some(Value::Bool(true)),
            _ => None,
        }
    }

    /// Short alias for `ds`-prefixed names (`dsState` -> `state`)
    pub fn humanized(self) -> Option<String> {
        humanize(self.name())
    }

    /// Look up by name or humanized alias
    pub fn from_name(name: &str) -> Option<DsAttribute> {
        Self::all().find(|a| a.name() == name || a.humanized().as_deref() == Some(name))
    }

    /// Look up by parameter-set key
    pub fn from_param_key(key: &str) -> Option<DsAttribute> {
        Self::all().find(|a| a.param_key() == key)
    }
}

impl std::fmt::Display for DsAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DsAttribute {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ClientError::UnknownAttribute(s.to_string()))
    }
}

/// Strip a leading `ds` and lower-case the next letter
pub fn humanize(name: &str) -> Option<String> {
    let rest = name.strip_prefix("ds")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

/// Table defaults applied to new datastreams
pub fn default_attributes() -> BTreeMap<DsAttribute, Value> {
    DsAttribute::all()
        .filter_map(|a| a.default_value().map(|v| (a, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_matches_enum() {
        for (i, spec) in REGISTRY.iter().enumerate() {
            assert_eq!(spec.attribute as usize, i, "{}", spec.name);
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(DsAttribute::MimeType.wire_name(), Some("dsMIME"));
        assert_eq!(DsAttribute::ControlGroup.wire_name(), Some("dsControlGroup"));
        assert_eq!(DsAttribute::LogMessage.wire_name(), None);
        assert_eq!(DsAttribute::AltIds.wire_name(), None);
        assert_eq!(DsAttribute::MimeType.param_key(), "dsMIME");
        assert_eq!(DsAttribute::LogMessage.param_key(), "logMessage");
    }

    #[test]
    fn test_defaults() {
        let defaults = default_attributes();
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults[&DsAttribute::ControlGroup], Value::from("M"));
        assert_eq!(defaults[&DsAttribute::DsState], Value::from("A"));
        assert_eq!(defaults[&DsAttribute::Versionable], Value::Bool(true));
        assert!(DsAttribute::MimeType.default_value().is_none());
    }

    #[test]
    fn test_read_only() {
        for attr in DsAttribute::READ_ONLY {
            assert!(attr.is_read_only());
        }
        for attr in DsAttribute::TRACKED {
            assert!(!attr.is_read_only());
        }
        assert_eq!(
            DsAttribute::TRACKED.len() + DsAttribute::READ_ONLY.len(),
            DsAttribute::all().count()
        );
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("dsState").as_deref(), Some("state"));
        assert_eq!(humanize("dsCreateDate").as_deref(), Some("createDate"));
        assert_eq!(humanize("mimeType"), None);
        assert_eq!(humanize("ds"), None);
        assert_eq!(DsAttribute::DsVersionId.humanized().as_deref(), Some("versionID"));
    }

    #[test]
    fn test_lookup_by_alias() {
        assert_eq!(DsAttribute::from_name("label"), Some(DsAttribute::DsLabel));
        assert_eq!(DsAttribute::from_name("dsLabel"), Some(DsAttribute::DsLabel));
        assert_eq!(DsAttribute::from_name("location"), Some(DsAttribute::DsLocation));
        assert_eq!("size".parse::<DsAttribute>().unwrap(), DsAttribute::DsSize);
        assert!("bogus".parse::<DsAttribute>().is_err());
        assert_eq!(DsAttribute::from_param_key("dsMIME"), Some(DsAttribute::MimeType));
        assert_eq!(DsAttribute::from_param_key("mimeType"), None);
    }
}
