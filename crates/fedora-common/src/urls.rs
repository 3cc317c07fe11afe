//! REST API URL helpers
//!
//! Builds the relative endpoint paths of the Fedora REST API. Path segments
//! and query parameters are CGI-escaped: ASCII alphanumerics and `-._~` stay
//! as they are, space becomes `+`, every other byte is percent-encoded.
//! API documentation: <https://wiki.duraspace.org/display/FCR30/REST+API>

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Bytes that are percent-encoded by [`escape`]
const CGI_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// CGI-escape a single path segment or query component
pub fn escape(value: &str) -> String {
    // A literal "%20" in the input is encoded as "%2520", so only spaces match
    utf8_percent_encode(value, CGI_ESCAPE)
        .to_string()
        .replace("%20", "+")
}

/// Append query parameters to a base path
///
/// Parameters keep their order. No `?` is appended when there are none.
///
/// # Examples
///
/// ```
/// use fedora_common::urls::url_for;
///
/// assert_eq!(url_for("objects", &[]), "objects");
/// assert_eq!(
///     url_for("objects", &[("query", "pid~demo*"), ("pid", "true")]),
///     "objects?query=pid~demo%2A&pid=true"
/// );
/// ```
pub fn url_for(base: &str, options: &[(&str, &str)]) -> String {
    if options.is_empty() {
        return base.to_string();
    }

    let query = options
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", base, query)
}

pub fn describe_repository_url(options: &[(&str, &str)]) -> String {
    url_for("fcr:describe", options)
}

pub fn add_namespace_url(prefix: &str, options: &[(&str, &str)]) -> String {
    url_for(&format!("fcr:namespaces/{}", prefix), options)
}

/// Base object endpoint; an `info:fedora` prefix is stripped from the pid
pub fn object_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(&escape(&pid.replace("info:fedora", "")), options)
}

pub fn new_object_url(options: &[(&str, &str)]) -> String {
    url_for("fcr:new", options)
}

pub fn next_pid_url(options: &[(&str, &str)]) -> String {
    url_for("fcr:nextPID", options)
}

pub fn find_objects_url(options: &[(&str, &str)]) -> String {
    url_for("objects", options)
}

/// Object dissemination endpoint, optionally narrowed to a service
/// definition and method
pub fn dissemination_url(
    pid: &str,
    sdef: Option<&str>,
    method: Option<&str>,
    options: &[(&str, &str)],
) -> String {
    let mut base = format!("{}/methods", object_url(pid, &[]));
    if let Some(sdef) = sdef {
        base.push('/');
        base.push_str(&escape(sdef));
    }
    if let Some(method) = method {
        base.push('/');
        base.push_str(&escape(method));
    }
    url_for(&base, options)
}

/// Datastream endpoint (profile, add, modify, purge)
pub fn datastream_url(pid: &str, dsid: &str, options: &[(&str, &str)]) -> String {
    url_for(
        &format!("{}/{}", object_url(pid, &[]), escape(dsid)),
        options,
    )
}

pub fn datastreams_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(&format!("{}/fcr:datastreams", object_url(pid, &[])), options)
}

/// Datastream content endpoint
pub fn datastream_content_url(pid: &str, dsid: &str, options: &[(&str, &str)]) -> String {
    url_for(
        &format!("{}/fcr:content", datastream_url(pid, dsid, &[])),
        options,
    )
}

/// Datastream version history endpoint
pub fn datastream_history_url(pid: &str, dsid: &str, options: &[(&str, &str)]) -> String {
    url_for(
        &format!("{}/history", datastream_url(pid, dsid, &[])),
        options,
    )
}

pub fn validate_object_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(&format!("{}/validate", object_url(pid, &[])), options)
}

pub fn export_object_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(&format!("{}/fcr:export", object_url(pid, &[])), options)
}

pub fn import_object_url(options: &[(&str, &str)]) -> String {
    url_for("/fcr:import", options)
}

pub fn object_versions_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(&format!("{}/fcr:versions", object_url(pid, &[])), options)
}

pub fn object_xml_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(&format!("{}/fcr:export", object_url(pid, &[])), options)
}

pub fn object_relationship_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(&format!("{}/relationships", object_url(pid, &[])), options)
}

pub fn new_object_relationship_url(pid: &str, options: &[(&str, &str)]) -> String {
    url_for(
        &format!("{}/new", object_relationship_url(pid, &[])),
        options,
    )
}
