//! Event record decoding.
//!
//! A single read from the queue yields zero or more whole records, each a
//! fixed `struct inotify_event` header followed by `len` bytes of
//! NUL-padded name. Records are decoded strictly left to right.

#![allow(clippy::missing_const_for_fn)]

use std::fmt;

use serde::Serialize;

use crate::error::MalformedStream;
use crate::mask;
use crate::Result;

/// Kernel event header, laid out as `struct inotify_event` minus the
/// flexible name member.
#[repr(C)]
struct RawHeader {
    wd: i32,
    mask: u32,
    cookie: u32,
    len: u32,
}

/// Size in bytes of one record header.
pub const HEADER_SIZE: usize = std::mem::size_of::<RawHeader>();

const _: () = assert!(HEADER_SIZE == 16);

/// Name carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventName {
    /// Name decoded as UTF-8.
    Text(String),
    /// Name that is not valid UTF-8, NUL padding removed.
    Bytes(Vec<u8>),
}

impl EventName {
    fn from_field(field: &[u8]) -> Option<Self> {
        let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let trimmed = &field[..end];
        if trimmed.is_empty() {
            return None;
        }
        Some(match std::str::from_utf8(trimmed) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Bytes(trimmed.to_vec()),
        })
    }

    /// The text form, if the name decoded.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(_) => None,
        }
    }

    /// Raw bytes of the name, without padding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

/// One decoded change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Watch descriptor the event belongs to.
    pub wd: i32,
    /// Event bits.
    pub mask: u32,
    /// Correlates `IN_MOVED_FROM` with `IN_MOVED_TO`; zero otherwise.
    pub cookie: u32,
    /// Length of the name field on the wire, padding included.
    pub len: u32,
    /// Name of the affected child, for events on watched directories.
    pub name: Option<EventName>,
}

impl Event {
    /// The watch was removed, explicitly or because its target went away.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.mask & mask::IN_IGNORED != 0
    }

    /// The subject is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mask & mask::IN_ISDIR != 0
    }

    /// The kernel dropped events because the queue was full.
    #[must_use]
    pub fn is_overflow(&self) -> bool {
        self.mask & mask::IN_Q_OVERFLOW != 0
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wd={} {} cookie={}",
            self.wd,
            mask::describe(self.mask),
            self.cookie
        )?;
        if let Some(name) = &self.name {
            write!(f, " name={name}")?;
        }
        Ok(())
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    u32::from_ne_bytes(word)
}

/// Decode the record starting at `offset`, returning it and the offset of
/// the next record.
fn decode_one(buf: &[u8], offset: usize) -> std::result::Result<(Event, usize), MalformedStream> {
    let rest = &buf[offset..];
    if rest.len() < HEADER_SIZE {
        return Err(MalformedStream::TruncatedHeader {
            offset,
            remaining: rest.len(),
        });
    }

    let header = RawHeader {
        wd: i32::from_ne_bytes(read_u32(rest, 0).to_ne_bytes()),
        mask: read_u32(rest, 4),
        cookie: read_u32(rest, 8),
        len: read_u32(rest, 12),
    };

    let len = header.len as usize;
    let body = &rest[HEADER_SIZE..];
    if body.len() < len {
        return Err(MalformedStream::TruncatedName {
            offset,
            len,
            remaining: body.len(),
        });
    }

    let event = Event {
        wd: header.wd,
        mask: header.mask,
        cookie: header.cookie,
        len: header.len,
        name: EventName::from_field(&body[..len]),
    };
    Ok((event, offset + HEADER_SIZE + len))
}

/// Decode every record in `buf`, in order.
///
/// An empty buffer yields no events. Any truncated record fails the whole
/// call; events decoded before the fault are discarded.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedEventStream`] if the buffer does not
/// consist of whole records.
pub fn decode_all(buf: &[u8]) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let (event, next) = decode_one(buf, offset)?;
        events.push(event);
        offset = next;
    }
    Ok(events)
}

/// Serialize one record exactly as the kernel lays it out.
///
/// `name_field` is written verbatim and its length becomes the header's
/// `len`; use [`padded_name`] to produce kernel-style padding.
#[must_use]
pub fn encode_record(wd: i32, mask: u32, cookie: u32, name_field: &[u8]) -> Vec<u8> {
    let len = u32::try_from(name_field.len()).unwrap_or(u32::MAX);
    let mut out = Vec::with_capacity(HEADER_SIZE + name_field.len());
    out.extend_from_slice(&wd.to_ne_bytes());
    out.extend_from_slice(&mask.to_ne_bytes());
    out.extend_from_slice(&cookie.to_ne_bytes());
    out.extend_from_slice(&len.to_ne_bytes());
    out.extend_from_slice(name_field);
    out
}

/// NUL-terminate `name` and pad it to a multiple of the header size, the
/// way the kernel fills the name field.
#[must_use]
pub fn padded_name(name: &str) -> Vec<u8> {
    if name.is_empty() {
        return Vec::new();
    }
    let padded = (name.len() + 1).div_ceil(HEADER_SIZE) * HEADER_SIZE;
    let mut field = name.as_bytes().to_vec();
    field.resize(padded, 0);
    field
}
