//! Fedora Client - Rust client for Fedora Commons datastreams
//!
//! This crate provides:
//! - Datastream entity with lazy profile and content loading
//! - Attribute registry with wire names and defaults
//! - Per-attribute change tracking so saves send only what changed
//! - Profile and version history decoding
//! - HTTP repository backend over the Fedora REST API
//! - TOML and environment based configuration

#[macro_use]
mod macros;

pub mod attributes;
pub mod config;
pub mod content;
pub mod datastream;
pub mod dirty;
pub mod error;
pub mod http;
pub mod object;
pub mod profile;
pub mod repository;
pub mod value;

// Entity re-exports
pub use datastream::{Datastream, DatastreamOptions, ProfileOptions};
pub use object::{DigitalObject, ObjectRef};

// Repository re-exports
pub use config::RepositoryConfig;
pub use error::{ClientError, Result};
pub use http::HttpRepository;
pub use repository::{DatastreamParams, ProfileQuery, Repository};

// Model re-exports
pub use attributes::DsAttribute;
pub use content::{Content, ContentStream};
pub use profile::{Profile, VersionEntry};
pub use value::Value;
