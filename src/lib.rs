//! simple-inotify
//!
//! A small inotify session: register watches on a kernel notification queue,
//! hand the queue descriptor to any readiness poller, and decode the raw
//! records it yields into typed events.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod decoder;
pub mod error;
pub mod inotify;
pub mod mask;
pub mod observability;
pub mod registry;
pub mod sys;

pub use config::Config;
pub use decoder::{decode_all, Event, EventName};
pub use error::{Error, MalformedStream, Result};
pub use inotify::{Inotify, SessionStats, DEFAULT_READ_SIZE};
pub use registry::WatchRegistry;
pub use sys::Backend;

#[cfg(target_os = "linux")]
pub use sys::Kernel;
