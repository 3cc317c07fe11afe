//! Datastream entity
//!
//! A [`Datastream`] is bound to the digital object that owns it and an id.
//! Attribute values resolve in order: locally assigned value, server
//! profile, default. The profile, the raw profile XML and the server
//! content are fetched lazily and cached until the next mutating
//! operation.
//!
//! `create` and `save` return a fresh instance reflecting the state the
//! server confirmed; the receiver's caches are cleared and it should be
//! dropped. Instances pinned to a version timestamp are read-only.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use fedora_common::{ControlGroup, DEFAULT_MIME_TYPE, DS_CHECKSUM_VALID, is_blank};
use tracing::debug;
use url::Url;

use crate::attributes::{self, DsAttribute};
use crate::content::Content;
use crate::dirty::{self, Baseline, ContentDecision, DirtyTracker};
use crate::error::{ClientError, Result};
use crate::object::DigitalObject;
use crate::profile::{self, Profile};
use crate::repository::{DatastreamParams, ProfileQuery, Repository};
use crate::value::Value;

/// Construction options, kept by the datastream and reused for the fresh
/// instance returned by `create`/`save`
#[derive(Clone, Debug, Default)]
pub struct DatastreamOptions {
    attributes: Vec<(DsAttribute, Value)>,
    content: Option<Content>,
    profile_xml: Option<String>,
    profile: Option<Profile>,
    as_of: Option<String>,
    defaults: BTreeMap<DsAttribute, Value>,
}

impl DatastreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial attribute value, applied through the regular setter
    pub fn attribute(mut self, attr: DsAttribute, value: impl Into<Value>) -> Self {
        let value = value.into();
        match attr {
            DsAttribute::Content => self.content = Some(Content::from(value.to_string())),
            DsAttribute::AsOfDateTime => self.as_of = Some(value.to_string()),
            _ => self.attributes.push((attr, value)),
        }
        self
    }

    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Seed the profile from raw XML instead of fetching it
    pub fn profile_xml(mut self, xml: impl Into<String>) -> Self {
        self.profile_xml = Some(xml.into());
        self
    }

    /// Seed the profile with an already decoded one
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Pin to a version timestamp
    pub fn as_of(mut self, as_of: impl Into<String>) -> Self {
        self.as_of = Some(as_of.into());
        self
    }

    /// Per-instance default, merged over the registry defaults
    pub fn default_attribute(mut self, attr: DsAttribute, value: impl Into<Value>) -> Self {
        self.defaults.insert(attr, value.into());
        self
    }
}

/// Options for a profile lookup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProfileOptions {
    /// Ask the server to validate the stored checksum
    pub validate_checksum: bool,
}

impl ProfileOptions {
    pub fn validating() -> Self {
        Self {
            validate_checksum: true,
        }
    }
}

pub struct Datastream {
    object: Option<Arc<dyn DigitalObject>>,
    dsid: String,
    options: DatastreamOptions,
    default_attributes: BTreeMap<DsAttribute, Value>,
    tracker: DirtyTracker,
    /// Content staged by the caller
    content: Option<Content>,
    as_of: Option<String>,
    profile: Option<Profile>,
    profile_xml: Option<String>,
    /// Server content; the inner `None` records a fetch that found nothing
    datastream_content: Option<Option<Content>>,
}

impl Datastream {
    /// Bind a datastream to its digital object
    pub fn new(
        object: Arc<dyn DigitalObject>,
        dsid: &str,
        options: DatastreamOptions,
    ) -> Result<Self> {
        Self::build(Some(object), dsid, options, false)
    }

    /// A datastream without an owning object; it is always new
    pub fn detached(dsid: &str, options: DatastreamOptions) -> Result<Self> {
        Self::build(None, dsid, options, false)
    }

    /// With `confirmed`, option values are the server-confirmed baseline:
    /// nothing is marked changed and no content or profile is seeded.
    fn build(
        object: Option<Arc<dyn DigitalObject>>,
        dsid: &str,
        options: DatastreamOptions,
        confirmed: bool,
    ) -> Result<Self> {
        let mut default_attributes = attributes::default_attributes();
        default_attributes.extend(options.defaults.iter().map(|(a, v)| (*a, v.clone())));

        let mut datastream = Self {
            object,
            dsid: dsid.to_string(),
            options: DatastreamOptions::default(),
            default_attributes,
            tracker: DirtyTracker::new(),
            content: None,
            as_of: None,
            profile: None,
            profile_xml: None,
            datastream_content: None,
        };

        if !confirmed {
            if let Some(xml) = &options.profile_xml {
                datastream.set_profile_xml(xml)?;
            }
            if let Some(profile) = &options.profile {
                datastream.profile = Some(profile.clone());
            }
        }
        for (attr, value) in &options.attributes {
            datastream.set(*attr, value.clone())?;
        }
        if !confirmed && let Some(content) = &options.content {
            datastream.set_content(content.clone())?;
        }
        if confirmed {
            datastream.tracker.reset();
        }

        // Pin last so the option setters above are not rejected
        datastream.as_of = options.as_of.clone();
        datastream.options = options;
        Ok(datastream)
    }

    pub fn dsid(&self) -> &str {
        &self.dsid
    }

    /// Pid of the owning object
    pub fn pid(&self) -> Option<&str> {
        self.object.as_deref().map(|o| o.pid())
    }

    pub fn object(&self) -> Option<&Arc<dyn DigitalObject>> {
        self.object.as_ref()
    }

    pub fn options(&self) -> &DatastreamOptions {
        &self.options
    }

    pub fn default_attributes(&self) -> &BTreeMap<DsAttribute, Value> {
        &self.default_attributes
    }

    /// Version pin, if this instance is a historical version
    pub fn as_of_date_time(&self) -> Option<&str> {
        self.as_of.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.as_of.is_some()
    }

    /// A new instance with the same identity and options, pinned to `as_of`
    pub fn version_at(&self, as_of: &str) -> Result<Datastream> {
        let options = self.options.clone().as_of(as_of);
        Self::build(self.object.clone(), &self.dsid, options, false)
    }

    fn repository_opt(&self) -> Option<Arc<dyn Repository>> {
        self.object.as_ref().and_then(|o| o.repository())
    }

    fn repository(&self) -> Result<Arc<dyn Repository>> {
        self.repository_opt()
            .ok_or_else(|| ClientError::Detached(self.dsid.clone()))
    }

    fn require_pid(&self) -> Result<String> {
        self.pid()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Detached(self.dsid.clone()))
    }

    fn check_read_only(&self) -> Result<()> {
        match &self.as_of {
            Some(as_of) => Err(ClientError::ReadOnly {
                dsid: self.dsid.clone(),
                as_of: as_of.clone(),
            }),
            None => Ok(()),
        }
    }

    fn eager_load_content(&self) -> bool {
        self.repository_opt()
            .is_some_and(|r| r.config().eager_load_datastream_content)
    }

    // ============== Existence ==============

    /// New when there is no owning object, the object is new, or the
    /// server has no profile for this datastream
    pub async fn is_new(&mut self) -> Result<bool> {
        match &self.object {
            None => return Ok(true),
            Some(object) if object.is_new() => return Ok(true),
            Some(_) => {}
        }
        Ok(is_blank(self.profile_xml(ProfileOptions::default()).await?))
    }

    pub async fn exists(&mut self) -> Result<bool> {
        Ok(!self.is_new().await?)
    }

    // ============== Profile ==============

    /// Server profile, fetched once and cached.
    ///
    /// A cached profile is returned unless checksum validation is requested
    /// and the cached profile carries no `dsChecksumValid` field.
    pub async fn profile(&mut self, opts: ProfileOptions) -> Result<&Profile> {
        let needs_validation = opts.validate_checksum
            && !self
                .profile
                .as_ref()
                .is_some_and(|p| p.contains_key(DS_CHECKSUM_VALID));

        if self.profile.is_none() || needs_validation {
            let profile = if self.repository_opt().is_none() {
                Profile::new()
            } else {
                let xml = self.profile_xml(opts).await?;
                if is_blank(xml) {
                    Profile::new()
                } else {
                    profile::decode_profile(xml)?
                }
            };
            self.profile = Some(profile);
        }

        Ok(self.profile.get_or_insert_with(Profile::new))
    }

    /// Replace the cached profile with one decoded from `xml`
    pub fn set_profile_xml(&mut self, xml: &str) -> Result<()> {
        self.profile = Some(profile::decode_profile(xml)?);
        Ok(())
    }

    /// Raw profile XML; empty when the datastream does not exist yet.
    /// Any explicit option forces a refetch.
    async fn profile_xml(&mut self, opts: ProfileOptions) -> Result<&str> {
        if opts.validate_checksum {
            self.profile_xml = None;
        }
        if self.profile_xml.is_none() {
            let xml = self.fetch_profile_xml(opts).await?;
            self.profile_xml = Some(xml);
        }
        Ok(self.profile_xml.as_deref().unwrap_or_default())
    }

    async fn fetch_profile_xml(&self, opts: ProfileOptions) -> Result<String> {
        let (Some(object), Some(repository)) = (self.object.as_ref(), self.repository_opt())
        else {
            return Ok(String::new());
        };

        let query = ProfileQuery {
            as_of: self.as_of.clone(),
            validate_checksum: opts.validate_checksum || repository.config().validate_checksum,
        };
        match repository
            .fetch_datastream_profile(object.pid(), &self.dsid, &query)
            .await
        {
            Ok(xml) => Ok(xml),
            Err(e) if e.is_not_found() => {
                debug!("No profile for {}/{}, treating as new", object.pid(), self.dsid);
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the server found the stored checksum valid
    pub async fn checksum_valid(&mut self) -> Result<Option<bool>> {
        Ok(self
            .profile(ProfileOptions::validating())
            .await?
            .get(DS_CHECKSUM_VALID)
            .and_then(Value::as_bool))
    }

    // ============== Attributes ==============

    /// Value without any network access: local value, then cached profile,
    /// then default
    pub fn current_value(&self, attr: DsAttribute) -> Option<Value> {
        if attr == DsAttribute::AsOfDateTime {
            return self.as_of.clone().map(Value::Text);
        }
        if let Some(local) = self.tracker.local(attr) {
            return local.clone();
        }
        self.server_value(attr)
    }

    /// Value ignoring local assignments: cached profile, then default
    fn server_value(&self, attr: DsAttribute) -> Option<Value> {
        if let (Some(wire), Some(profile)) = (attr.wire_name(), &self.profile)
            && let Some(value) = profile.get(wire)
        {
            return Some(value.clone());
        }
        self.default_attributes.get(&attr).cloned()
    }

    /// Attribute value, loading the profile when the attribute was not
    /// assigned locally
    pub async fn get(&mut self, attr: DsAttribute) -> Result<Option<Value>> {
        match attr {
            DsAttribute::Content => {
                return Ok(self
                    .content()
                    .await?
                    .map(|b| Value::Text(String::from_utf8_lossy(&b).into_owned())));
            }
            DsAttribute::AsOfDateTime => return Ok(self.as_of.clone().map(Value::Text)),
            _ => {}
        }

        if self.tracker.local(attr).is_none() && attr.wire_name().is_some() {
            self.profile(ProfileOptions::default()).await?;
        }
        Ok(self.current_value(attr))
    }

    pub fn set(&mut self, attr: DsAttribute, value: impl Into<Value>) -> Result<()> {
        self.assign(attr, Some(value.into()))
    }

    /// Clear a locally assigned value
    pub fn unset(&mut self, attr: DsAttribute) -> Result<()> {
        self.assign(attr, None)
    }

    fn assign(&mut self, attr: DsAttribute, value: Option<Value>) -> Result<()> {
        self.check_read_only()?;

        match attr {
            DsAttribute::Content => {
                return match value {
                    Some(value) => self.set_content(value.to_string()),
                    None => {
                        self.content = None;
                        Ok(())
                    }
                };
            }
            DsAttribute::AsOfDateTime => return Err(ClientError::ReadOnlyAttribute(attr.name())),
            _ if attr.is_read_only() => return Err(ClientError::ReadOnlyAttribute(attr.name())),
            _ => {}
        }

        if attr == DsAttribute::DsLocation
            && let Some(location) = &value
        {
            validate_location(location)?;
        }

        let previous = self.baseline(attr);
        self.tracker.assign(attr, previous, value);
        Ok(())
    }

    /// Pre-assignment value of `attr`. Unknown for server attributes whose
    /// profile has not been loaded yet.
    fn baseline(&self, attr: DsAttribute) -> Baseline {
        if let Some(local) = self.tracker.local(attr) {
            return Baseline::Known(local.clone());
        }
        if attr.wire_name().is_some()
            && self.profile.is_none()
            && self.repository_opt().is_some()
        {
            return Baseline::Unknown;
        }
        Baseline::Known(self.server_value(attr))
    }

    /// Load the profile and settle every baseline left unknown by setters
    async fn resolve_baselines(&mut self) -> Result<()> {
        let pending = self.tracker.unresolved();
        if pending.is_empty() {
            return Ok(());
        }

        self.profile(ProfileOptions::default()).await?;
        for attr in pending {
            let value = self.server_value(attr);
            self.tracker.resolve(attr, value);
        }
        Ok(())
    }

    text_accessors! {
        /// Control group code (`X`, `M`, `E` or `R`)
        control_group, set_control_group => DsAttribute::ControlGroup;
        /// Location URI of external and redirect content
        location, set_location => DsAttribute::DsLocation;
        label, set_label => DsAttribute::DsLabel;
        state, set_state => DsAttribute::DsState;
        format_uri, set_format_uri => DsAttribute::FormatUri;
        checksum_type, set_checksum_type => DsAttribute::ChecksumType;
        checksum, set_checksum => DsAttribute::Checksum;
        mime_type, set_mime_type => DsAttribute::MimeType;
        /// Audit message sent with the next create or save
        log_message, set_log_message => DsAttribute::LogMessage;
        last_modified_date, set_last_modified_date => DsAttribute::LastModifiedDate;
    }

    pub async fn versionable(&mut self) -> Result<Option<bool>> {
        Ok(self
            .get(DsAttribute::Versionable)
            .await?
            .and_then(|v| v.as_bool()))
    }

    pub fn set_versionable(&mut self, versionable: bool) -> Result<()> {
        self.set(DsAttribute::Versionable, versionable)
    }

    pub async fn ignore_content(&mut self) -> Result<Option<bool>> {
        Ok(self
            .get(DsAttribute::IgnoreContent)
            .await?
            .and_then(|v| v.as_bool()))
    }

    pub fn set_ignore_content(&mut self, ignore: bool) -> Result<()> {
        self.set(DsAttribute::IgnoreContent, ignore)
    }

    pub async fn alt_ids(&mut self) -> Result<Option<Vec<String>>> {
        Ok(self.get(DsAttribute::AltIds).await?.map(|v| match v {
            Value::List(items) => items,
            other => vec![other.to_string()],
        }))
    }

    pub fn set_alt_ids(&mut self, alt_ids: Vec<String>) -> Result<()> {
        self.set(DsAttribute::AltIds, alt_ids)
    }

    /// Server-assigned creation time of this version
    pub async fn create_date(&mut self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .get(DsAttribute::DsCreateDate)
            .await?
            .and_then(|v| v.as_timestamp()))
    }

    pub async fn size(&mut self) -> Result<Option<i64>> {
        Ok(self
            .get(DsAttribute::DsSize)
            .await?
            .and_then(|v| v.as_integer()))
    }

    pub async fn version_id(&mut self) -> Result<Option<String>> {
        Ok(self
            .get(DsAttribute::DsVersionId)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn is_by_reference(&mut self) -> Result<bool> {
        Ok(self
            .control_group()
            .await?
            .and_then(|cg| cg.parse::<ControlGroup>().ok())
            .is_some_and(|cg| cg.is_by_reference()))
    }

    // ============== Change tracking ==============

    /// Attributes changed since construction or the last sync. Content is
    /// reported by [`Datastream::content_changed`].
    ///
    /// Attributes assigned before the profile was loaded are included until
    /// [`Datastream::changes`] or a save compares them with the server.
    pub fn changed_attributes(&self) -> BTreeSet<DsAttribute> {
        self.tracker.changed_attributes()
    }

    pub fn is_changed(&self, attr: DsAttribute) -> bool {
        self.tracker.is_changed(attr)
    }

    /// Changed attributes including content
    pub async fn changes(&mut self) -> Result<BTreeSet<DsAttribute>> {
        self.resolve_baselines().await?;
        let mut changed = self.changed_attributes();
        if self.content_changed().await? {
            changed.insert(DsAttribute::Content);
        }
        Ok(changed)
    }

    pub async fn is_dirty(&mut self) -> Result<bool> {
        Ok(!self.changes().await?.is_empty())
    }

    /// Whether staged content differs from what the server holds. The
    /// server copy is fetched only when nothing cheaper decides it.
    pub async fn content_changed(&mut self) -> Result<bool> {
        let by_reference = self.is_by_reference().await?;
        let is_new = self.is_new().await?;
        let decision = dirty::content_decision(
            by_reference,
            is_new,
            self.content.as_ref(),
            self.eager_load_content(),
            self.tracker.content_flagged(),
        );

        match decision {
            ContentDecision::Unchanged => Ok(false),
            ContentDecision::Changed => Ok(true),
            ContentDecision::CompareWithServer => {
                let server = self.datastream_content().await?;
                Ok(server.as_ref() != self.content.as_ref())
            }
        }
    }

    // ============== Content ==============

    /// Staged content, or the server content for persisted datastreams
    /// (fetched once and cached until the next mutating operation)
    pub async fn content(&mut self) -> Result<Option<Bytes>> {
        let content = match &self.content {
            Some(staged) => Some(staged.clone()),
            None => self.datastream_content().await?,
        };
        match content {
            Some(content) => Ok(Some(content.read_all()?)),
            None => Ok(None),
        }
    }

    pub fn set_content(&mut self, content: impl Into<Content>) -> Result<()> {
        self.check_read_only()?;
        let content = content.into();

        let prior = match &self.content {
            Some(staged) => Some(staged),
            None if self.eager_load_content() => {
                self.datastream_content.as_ref().and_then(Option::as_ref)
            }
            None => None,
        };
        if prior != Some(&content) {
            self.tracker.flag_content();
        }

        self.content = Some(content);
        Ok(())
    }

    async fn datastream_content(&mut self) -> Result<Option<Content>> {
        if self.is_new().await? {
            return Ok(None);
        }
        if let Some(cached) = &self.datastream_content {
            return Ok(cached.clone());
        }

        let repository = self.repository()?;
        let pid = self.require_pid()?;
        let fetched = match repository
            .fetch_datastream_content(&pid, &self.dsid, self.as_of.as_deref())
            .await
        {
            Ok(content) => Some(content),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        self.datastream_content = Some(fetched.clone());
        Ok(fetched)
    }

    /// True for persisted datastreams; for new ones, a location for
    /// external/redirect datastreams or staged content otherwise
    pub async fn has_content(&mut self) -> Result<bool> {
        if !self.is_new().await? {
            return Ok(true);
        }
        if self.is_by_reference().await? {
            return Ok(self.location().await?.is_some_and(|l| !is_blank(&l)));
        }
        Ok(self
            .content
            .as_ref()
            .is_some_and(|c| c.is_stream() || !c.is_blank()))
    }

    /// Content retrieval URL, pinned to the version if any
    pub fn url(&self) -> Result<String> {
        let repository = self.repository()?;
        let pid = self.require_pid()?;
        let options: Vec<(&str, &str)> = self
            .as_of
            .as_deref()
            .map(|t| ("asOfDateTime", t))
            .into_iter()
            .collect();
        Ok(repository.datastream_content_url(&pid, &self.dsid, &options))
    }

    // ============== Lifecycle ==============

    /// Add the datastream to the repository
    pub async fn create(&mut self) -> Result<Datastream> {
        self.check_read_only()?;
        let repository = self.repository()?;
        let params = self.api_params(true).await?;

        debug!(
            "Adding datastream {}/{} with {} parameters",
            params.pid,
            params.dsid,
            params.len()
        );
        repository.add_datastream(&params).await?;

        self.reset_profile_attributes();
        self.refreshed()
    }

    /// Send changed attributes to the repository, creating the datastream
    /// if it does not exist yet
    pub async fn save(&mut self) -> Result<Datastream> {
        self.check_read_only()?;
        if self.is_new().await? {
            return self.create().await;
        }

        let repository = self.repository()?;
        let params = self.api_params(false).await?;

        debug!(
            "Modifying datastream {}/{} with {} parameters",
            params.pid,
            params.dsid,
            params.len()
        );
        repository.modify_datastream(&params).await?;

        self.reset_profile_attributes();
        self.refreshed()
    }

    /// Purge the datastream and remove it from its object
    pub async fn delete(&mut self) -> Result<&mut Self> {
        self.check_read_only()?;
        if !self.is_new().await? {
            let repository = self.repository()?;
            let pid = self.require_pid()?;
            debug!("Purging datastream {}/{}", pid, self.dsid);
            repository.purge_datastream(&pid, &self.dsid).await?;
        }

        if let Some(object) = &self.object {
            object.remove_datastream(&self.dsid);
        }
        self.reset_profile_attributes();
        Ok(self)
    }

    /// One read-only instance per entry of the version history
    pub async fn versions(&self) -> Result<Vec<Datastream>> {
        let (Some(object), Some(repository)) = (self.object.as_ref(), self.repository_opt())
        else {
            return Ok(Vec::new());
        };

        let xml = match repository
            .fetch_datastream_versions(object.pid(), &self.dsid)
            .await
        {
            Ok(Some(xml)) => xml,
            Ok(None) => return Ok(Vec::new()),
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        profile::decode_history(&xml)?
            .into_iter()
            .map(|entry| {
                let options = DatastreamOptions::new()
                    .profile(entry.profile)
                    .as_of(entry.as_of);
                Self::build(self.object.clone(), &self.dsid, options, false)
            })
            .collect()
    }

    /// Parameter set for add (`for_create`) or modify
    async fn api_params(&mut self, for_create: bool) -> Result<DatastreamParams> {
        let pid = self.require_pid()?;
        self.resolve_baselines().await?;
        let mut params = DatastreamParams::new(&pid, &self.dsid);

        if self.is_new().await? {
            for (attr, value) in &self.default_attributes {
                if !attr.is_read_only() {
                    params.insert(*attr, value.clone());
                }
            }
        }

        for attr in self.tracker.changed_attributes() {
            if let Some(value) = self.current_value(attr) {
                params.insert(attr, value);
            }
        }

        if self.content_changed().await? {
            params.content = self.content.clone();
        }

        if for_create {
            let mime = self
                .get(DsAttribute::MimeType)
                .await?
                .unwrap_or_else(|| Value::from(DEFAULT_MIME_TYPE));
            params.insert(DsAttribute::MimeType, mime);
        }

        Ok(params)
    }

    fn reset_profile_attributes(&mut self) {
        self.profile = None;
        self.profile_xml = None;
        self.datastream_content = None;
        self.tracker.reset();
    }

    fn refreshed(&self) -> Result<Datastream> {
        Self::build(self.object.clone(), &self.dsid, self.options.clone(), true)
    }
}

fn validate_location(value: &Value) -> Result<()> {
    let location = value.to_string();
    match Url::parse(&location) {
        Ok(_) => Ok(()),
        Err(e) => Err(ClientError::MalformedLocation {
            location,
            reason: e.to_string(),
        }),
    }
}

impl fmt::Debug for Datastream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastream")
            .field("pid", &self.pid())
            .field("dsid", &self.dsid)
            .field("as_of", &self.as_of)
            .field("changed", &self.changed_attributes())
            .finish()
    }
}
