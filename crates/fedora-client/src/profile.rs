//! Datastream profile codec
//!
//! Decodes `datastreamProfile` documents (and the `datastreamHistory`
//! documents that wrap several of them) into flat field maps.

use std::borrow::Cow;
use std::collections::BTreeMap;

use fedora_common::{
    DATASTREAM_PROFILE, DS_CHECKSUM_VALID, DS_CREATE_DATE, DS_SIZE, DS_VERSIONABLE, MANAGEMENT_NS,
};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::error::Result;
use crate::value::{Value, parse_timestamp};

/// Server attribute name -> value
pub type Profile = BTreeMap<String, Value>;

/// One entry of a datastream's version history
#[derive(Clone, Debug, PartialEq)]
pub struct VersionEntry {
    /// Raw `dsCreateDate` text, used as the version pin
    pub as_of: String,
    pub profile: Profile,
}

/// Child elements of one profile element, in document order
type RawFields = Vec<(String, String)>;

/// Decode a single profile document.
///
/// A document whose root is not a management `datastreamProfile` decodes to
/// an empty profile.
pub fn decode_profile(xml: &str) -> Result<Profile> {
    let xml = with_management_namespace(xml);
    let profile = collect_profiles(&xml, true)?
        .into_iter()
        .next()
        .map(to_profile)
        .unwrap_or_default();
    Ok(profile)
}

/// Decode a version history document into one entry per profile found at
/// any depth, in document order.
pub fn decode_history(xml: &str) -> Result<Vec<VersionEntry>> {
    let xml = with_management_namespace(xml);
    let entries = collect_profiles(&xml, false)?
        .into_iter()
        .map(|fields| {
            let as_of = fields
                .iter()
                .find(|(name, _)| name == DS_CREATE_DATE)
                .map(|(_, text)| text.clone())
                .unwrap_or_default();
            VersionEntry {
                as_of,
                profile: to_profile(fields),
            }
        })
        .collect();
    Ok(entries)
}

/// Profiles served without any namespace declaration get the management
/// namespace as default.
fn with_management_namespace(xml: &str) -> Cow<'_, str> {
    if xml.contains("xmlns=") {
        Cow::Borrowed(xml)
    } else {
        Cow::Owned(xml.replace(
            "<datastreamProfile",
            &format!("<datastreamProfile xmlns=\"{}\"", MANAGEMENT_NS),
        ))
    }
}

fn is_profile_element(ns: &ResolveResult, element: &BytesStart) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == MANAGEMENT_NS.as_bytes())
        && element.local_name().as_ref() == DATASTREAM_PROFILE.as_bytes()
}

fn local_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Walk the document and gather the direct children of every profile
/// element. With `root_only`, only a profile at the document root counts.
fn collect_profiles(xml: &str, root_only: bool) -> Result<Vec<RawFields>> {
    let mut reader = NsReader::from_str(xml);
    let mut profiles = Vec::new();
    let mut depth = 0usize;
    // (depth of the open profile element, fields so far)
    let mut current: Option<(usize, RawFields)> = None;
    let mut field: Option<(String, String)> = None;

    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(e)) => {
                depth += 1;
                match current.as_ref().map(|(d, _)| *d) {
                    None => {
                        if is_profile_element(&ns, &e) && (!root_only || depth == 1) {
                            current = Some((depth, Vec::new()));
                        }
                    }
                    Some(profile_depth) if depth == profile_depth + 1 => {
                        field = Some((local_name(&e), String::new()));
                    }
                    Some(_) => {}
                }
            }
            (ns, Event::Empty(e)) => match current.as_mut() {
                None => {
                    if is_profile_element(&ns, &e) && (!root_only || depth == 0) {
                        profiles.push(Vec::new());
                    }
                }
                Some((profile_depth, fields)) => {
                    if depth == *profile_depth {
                        fields.push((local_name(&e), String::new()));
                    }
                }
            },
            (_, Event::Text(t)) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            (_, Event::CData(c)) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            (_, Event::End(_)) => {
                if let Some(profile_depth) = current.as_ref().map(|(d, _)| *d) {
                    if depth == profile_depth + 1 {
                        if let (Some(done), Some((_, fields))) = (field.take(), current.as_mut()) {
                            fields.push(done);
                        }
                    } else if depth == profile_depth
                        && let Some((_, fields)) = current.take()
                    {
                        profiles.push(fields);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            (_, Event::Eof) => break,
            _ => {}
        }

        if root_only && depth == 0 && !profiles.is_empty() {
            break;
        }
    }

    Ok(profiles)
}

/// Group repeated fields, drop empty scalars and apply type coercions
fn to_profile(fields: RawFields) -> Profile {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, text) in fields {
        grouped.entry(name).or_default().push(text);
    }

    let mut profile = Profile::new();
    for (name, mut values) in grouped {
        let value = if values.len() == 1 {
            let text = values.remove(0);
            if text.is_empty() {
                continue;
            }
            coerce(&name, text)
        } else {
            Value::List(values)
        };
        profile.insert(name, value);
    }
    profile
}

fn coerce(name: &str, text: String) -> Value {
    match name {
        DS_SIZE => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or(Value::Text(text)),
        DS_CREATE_DATE => parse_timestamp(&text)
            .map(Value::Timestamp)
            .unwrap_or(Value::Text(text)),
        DS_CHECKSUM_VALID | DS_VERSIONABLE => Value::Bool(text == "true"),
        _ => Value::Text(text),
    }
}
