//! Repository transport seam
//!
//! The datastream entity talks to the repository only through the
//! [`Repository`] trait. [`crate::http::HttpRepository`] is the REST
//! implementation; tests substitute in-memory ones.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fedora_common::urls;

use crate::attributes::DsAttribute;
use crate::config::RepositoryConfig;
use crate::content::Content;
use crate::error::Result;
use crate::value::Value;

/// Options for a profile fetch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileQuery {
    /// Version pin
    pub as_of: Option<String>,
    pub validate_checksum: bool,
}

impl ProfileQuery {
    /// Query string pairs in REST API naming
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(as_of) = &self.as_of {
            pairs.push(("asOfDateTime", as_of.clone()));
        }
        if self.validate_checksum {
            pairs.push(("validateChecksum", "true".to_string()));
        }
        pairs
    }
}

/// Parameter set of an add or modify request, keyed by wire name
#[derive(Clone, Debug, PartialEq)]
pub struct DatastreamParams {
    pub pid: String,
    pub dsid: String,
    fields: BTreeMap<DsAttribute, Value>,
    pub content: Option<Content>,
}

impl DatastreamParams {
    pub fn new(pid: &str, dsid: &str) -> Self {
        Self {
            pid: pid.to_string(),
            dsid: dsid.to_string(),
            fields: BTreeMap::new(),
            content: None,
        }
    }

    pub fn insert(&mut self, attr: DsAttribute, value: Value) {
        self.fields.insert(attr, value);
    }

    /// Look up a field by its parameter key (`dsMIME`, `logMessage`, ...)
    pub fn get(&self, key: &str) -> Option<&Value> {
        DsAttribute::from_param_key(key).and_then(|attr| self.fields.get(&attr))
    }

    pub fn attribute(&self, attr: DsAttribute) -> Option<&Value> {
        self.fields.get(&attr)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Fields as (parameter key, value)
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(attr, value)| (attr.param_key(), value))
    }

    /// Fields as REST API query parameters
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.fields
            .iter()
            .map(|(attr, value)| (attr.name(), value.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Repository operations consumed by the datastream entity.
///
/// Implementations report a missing resource as
/// [`crate::ClientError::NotFound`] and rejected credentials as
/// [`crate::ClientError::Unauthorized`].
#[async_trait]
pub trait Repository: Send + Sync {
    fn config(&self) -> &RepositoryConfig;

    /// Content endpoint of a datastream
    fn datastream_content_url(&self, pid: &str, dsid: &str, options: &[(&str, &str)]) -> String {
        urls::datastream_content_url(pid, dsid, options)
    }

    /// Raw `datastreamProfile` XML
    async fn fetch_datastream_profile(
        &self,
        pid: &str,
        dsid: &str,
        query: &ProfileQuery,
    ) -> Result<String>;

    async fn fetch_datastream_content(
        &self,
        pid: &str,
        dsid: &str,
        as_of: Option<&str>,
    ) -> Result<Content>;

    /// Raw `datastreamHistory` XML, `None` when the server has none
    async fn fetch_datastream_versions(&self, pid: &str, dsid: &str) -> Result<Option<String>>;

    async fn add_datastream(&self, params: &DatastreamParams) -> Result<()>;

    async fn modify_datastream(&self, params: &DatastreamParams) -> Result<()>;

    async fn purge_datastream(&self, pid: &str, dsid: &str) -> Result<()>;
}
