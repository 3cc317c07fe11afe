//! Digital object seam
//!
//! A datastream only needs a few things from the object that owns it: the
//! pid, whether the object itself is persisted, the repository handle and a
//! way to drop the datastream from the object's collection.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;

use crate::datastream::{Datastream, DatastreamOptions};
use crate::error::Result;
use crate::repository::Repository;

pub trait DigitalObject: Send + Sync {
    fn pid(&self) -> &str;

    /// The object has not been ingested yet
    fn is_new(&self) -> bool;

    fn repository(&self) -> Option<Arc<dyn Repository>>;

    /// Remove a datastream from the object's collection
    fn remove_datastream(&self, dsid: &str);
}

/// Minimal digital object: a pid, a repository handle and the set of
/// datastream ids the object knows about.
pub struct ObjectRef {
    pid: String,
    new: AtomicBool,
    repository: Option<Arc<dyn Repository>>,
    datastreams: DashSet<String>,
}

impl ObjectRef {
    /// An object that exists in the given repository
    pub fn new(pid: &str, repository: Arc<dyn Repository>) -> Self {
        Self {
            pid: pid.to_string(),
            new: AtomicBool::new(false),
            repository: Some(repository),
            datastreams: DashSet::new(),
        }
    }

    /// An object with no repository behind it
    pub fn detached(pid: &str) -> Self {
        Self {
            pid: pid.to_string(),
            new: AtomicBool::new(true),
            repository: None,
            datastreams: DashSet::new(),
        }
    }

    pub fn set_new(&self, new: bool) {
        self.new.store(new, Ordering::Relaxed);
    }

    pub fn add_datastream_id(&self, dsid: &str) {
        self.datastreams.insert(dsid.to_string());
    }

    pub fn has_datastream(&self, dsid: &str) -> bool {
        self.datastreams.contains(dsid)
    }

    /// Known datastream ids, sorted
    pub fn datastream_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.datastreams.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Bind a datastream to this object and register its id
    pub fn datastream(
        self: &Arc<Self>,
        dsid: &str,
        options: DatastreamOptions,
    ) -> Result<Datastream> {
        let datastream = Datastream::new(self.clone(), dsid, options)?;
        self.add_datastream_id(dsid);
        Ok(datastream)
    }
}

impl DigitalObject for ObjectRef {
    fn pid(&self) -> &str {
        &self.pid
    }

    fn is_new(&self) -> bool {
        self.new.load(Ordering::Relaxed)
    }

    fn repository(&self) -> Option<Arc<dyn Repository>> {
        self.repository.clone()
    }

    fn remove_datastream(&self, dsid: &str) {
        self.datastreams.remove(dsid);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("pid", &self.pid)
            .field("new", &self.is_new())
            .field("attached", &self.repository.is_some())
            .field("datastreams", &self.datastream_ids())
            .finish()
    }
}
