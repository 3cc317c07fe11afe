//! Datastream content: in-memory bytes or a rewindable stream

use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

/// Readable, rewindable content source
pub trait ContentStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> ContentStream for T {}

/// Content staged for upload or fetched from the repository.
///
/// Clones of a stream share the underlying reader.
#[derive(Clone)]
pub enum Content {
    Bytes(Bytes),
    Stream(Arc<Mutex<Box<dyn ContentStream>>>),
}

impl Content {
    pub fn stream<R: ContentStream + 'static>(reader: R) -> Self {
        Content::Stream(Arc::new(Mutex::new(Box::new(reader))))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Content::Stream(_))
    }

    /// Blank bytes are empty or whitespace only. A stream is never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Content::Bytes(bytes) => fedora_common::is_blank_bytes(bytes),
            Content::Stream(_) => false,
        }
    }

    /// Read the whole content. Streams are rewound before and after the read
    /// so repeated reads return the same bytes.
    pub fn read_all(&self) -> std::io::Result<Bytes> {
        match self {
            Content::Bytes(bytes) => Ok(bytes.clone()),
            Content::Stream(stream) => {
                let mut reader = stream.lock();
                reader.seek(SeekFrom::Start(0))?;
                let mut buf = Vec::new();
                let read = reader.read_to_end(&mut buf);
                reader.seek(SeekFrom::Start(0))?;
                read?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Content::Bytes(a), Content::Bytes(b)) => a == b,
            (Content::Stream(a), Content::Stream(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Content::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Bytes(Bytes::from(value))
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Content::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for Content {
    fn from(value: &[u8]) -> Self {
        Content::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<Bytes> for Content {
    fn from(value: Bytes) -> Self {
        Content::Bytes(value)
    }
}
