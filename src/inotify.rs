//! Notification queue session.
//!
//! [`Inotify`] owns one queue descriptor and the registry of watches made on
//! it. The descriptor is released exactly once, either by [`Inotify::close`]
//! or when the session is dropped.

use std::ffi::OsStr;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use crate::decoder::{decode_all, Event};
use crate::error::Error;
use crate::mask::IN_ALL_EVENTS;
use crate::registry::{normalize, WatchRegistry};
use crate::sys::Backend;
use crate::Result;

/// Bytes requested per read by [`Inotify::read_events`].
pub const DEFAULT_READ_SIZE: usize = 0x1000;

/// Counters for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub watches_added: u64,
    pub watches_removed: u64,
    pub reads: u64,
    pub empty_reads: u64,
    pub events_decoded: u64,
}

/// A notification queue plus its watch registry.
///
/// Not safe for concurrent use; callers sharing a session across threads
/// must serialize access themselves.
#[derive(Debug)]
pub struct Inotify<B: Backend> {
    backend: B,
    fd: Option<RawFd>,
    watches: WatchRegistry,
    stats: SessionStats,
}

#[cfg(target_os = "linux")]
impl Inotify<crate::sys::Kernel> {
    /// Open a queue on the running kernel.
    ///
    /// `flags` are `inotify_init1` flags such as
    /// [`IN_NONBLOCK`](crate::mask::IN_NONBLOCK).
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueCreation`] if the kernel refuses.
    pub fn open(flags: i32) -> Result<Self> {
        Self::with_backend(crate::sys::Kernel, flags)
    }
}

impl<B: Backend> Inotify<B> {
    /// Open a queue through `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueCreation`] if the backend refuses.
    pub fn with_backend(mut backend: B, flags: i32) -> Result<Self> {
        let fd = backend
            .init(flags)
            .map_err(|e| Error::queue_creation(&e))?;
        tracing::debug!(fd, flags, "Opened notification queue");

        Ok(Self {
            backend,
            fd: Some(fd),
            watches: WatchRegistry::new(),
            stats: SessionStats::default(),
        })
    }

    /// Watch `path` for the events in `mask`.
    ///
    /// The normalized path is recorded against the returned descriptor,
    /// replacing whatever the descriptor pointed at before.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WatchRegistration`] if the kernel refuses or the
    /// session is closed. Nothing is recorded on failure.
    pub fn add_watch(&mut self, path: impl AsRef<Path>, mask: u32) -> Result<i32> {
        let path = path.as_ref();
        let fd = self.fd.ok_or_else(|| {
            Error::watch_registration(
                path.display().to_string(),
                &io::Error::from_raw_os_error(libc::EBADF),
            )
        })?;

        let wd = self
            .backend
            .add_watch(fd, path, mask)
            .map_err(|e| Error::watch_registration(path.display().to_string(), &e))?;

        let normalized = normalize(path);
        tracing::debug!(wd, mask, path = %normalized.display(), "Added watch");
        self.watches.insert(wd, normalized);
        self.stats.watches_added += 1;
        Ok(wd)
    }

    /// Watch `path` for every event kind.
    ///
    /// # Errors
    ///
    /// See [`add_watch`](Self::add_watch).
    pub fn add_watch_all(&mut self, path: impl AsRef<Path>) -> Result<i32> {
        self.add_watch(path, IN_ALL_EVENTS)
    }

    /// Stop watching `wd`.
    ///
    /// The registry entry is dropped first and unconditionally. A kernel
    /// refusal (typically a descriptor the kernel already retired) is logged
    /// and otherwise ignored.
    pub fn remove_watch(&mut self, wd: i32) {
        if self.watches.remove(wd).is_some() {
            self.stats.watches_removed += 1;
        }

        let Some(fd) = self.fd else {
            return;
        };
        match self.backend.rm_watch(fd, wd) {
            Ok(()) => tracing::debug!(wd, "Removed watch"),
            Err(e) if is_retired_watch(&e) => {
                tracing::debug!(wd, "Watch already retired by the kernel");
            }
            Err(e) => tracing::warn!(wd, error = %e, "Kernel refused watch removal"),
        }
    }

    /// Path watched by `wd`.
    ///
    /// Watches the kernel dropped on its own stay resolvable until the
    /// caller handles the `IN_IGNORED` event with
    /// [`remove_watch`](Self::remove_watch).
    #[must_use]
    pub fn resolve(&self, wd: i32) -> Option<&Path> {
        self.watches.resolve(wd)
    }

    /// Watched path joined with the event's child name, if the descriptor
    /// is still registered.
    #[must_use]
    pub fn event_path(&self, event: &Event) -> Option<PathBuf> {
        let base = self.resolve(event.wd)?;
        Some(match &event.name {
            Some(name) => base.join(OsStr::from_bytes(name.as_bytes())),
            None => base.to_path_buf(),
        })
    }

    /// Current watches.
    #[must_use]
    pub fn watches(&self) -> &WatchRegistry {
        &self.watches
    }

    /// Session counters.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Raw queue descriptor for readiness polling, `None` once closed.
    #[must_use]
    pub fn fileno(&self) -> Option<RawFd> {
        self.fd
    }

    /// Check if the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }

    /// Read and decode whatever events are pending.
    ///
    /// Reads at most [`DEFAULT_READ_SIZE`] bytes. On a non-blocking queue
    /// with nothing pending this returns an empty `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the read fails or the session is closed, and
    /// [`Error::MalformedEventStream`] if the bytes read are not whole records.
    pub fn read_events(&mut self) -> Result<Vec<Event>> {
        let mut buf = [0u8; DEFAULT_READ_SIZE];
        self.read_events_with(&mut buf)
    }

    /// Like [`read_events`](Self::read_events), reading into `buf`.
    ///
    /// `buf` must hold at least one header plus the longest possible name,
    /// or the kernel rejects the read with `EINVAL`.
    ///
    /// # Errors
    ///
    /// See [`read_events`](Self::read_events).
    pub fn read_events_with(&mut self, buf: &mut [u8]) -> Result<Vec<Event>> {
        let fd = self
            .fd
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))?;

        self.stats.reads += 1;
        let n = match self.backend.read(fd, buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            self.stats.empty_reads += 1;
            return Ok(Vec::new());
        }

        let events = decode_all(&buf[..n])?;
        tracing::trace!(bytes = n, events = events.len(), "Read events");
        self.stats.events_decoded += events.len() as u64;
        Ok(events)
    }

    /// Close the queue.
    ///
    /// Safe to call any number of times; only the first call releases the
    /// descriptor. Close failures are logged, never returned.
    pub fn close(&mut self) {
        let Some(fd) = self.fd.take() else {
            return;
        };
        match self.backend.close(fd) {
            Ok(()) => tracing::debug!(fd, "Closed notification queue"),
            Err(e) => tracing::warn!(fd, error = %e, "Failed to close notification queue"),
        }
    }
}

/// `EINVAL` from `inotify_rm_watch` means the descriptor is no longer
/// valid, which is the normal case after `IN_IGNORED` or a oneshot watch.
fn is_retired_watch(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINVAL)
}

impl<B: Backend> Drop for Inotify<B> {
    fn drop(&mut self) {
        self.close();
    }
}
