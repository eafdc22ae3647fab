//! System call seam.
//!
//! The session never talks to the kernel directly. Everything goes through
//! [`Backend`], which `Kernel` implements with raw `libc` calls and tests
//! implement with an in-memory fake.

use std::io;
use std::os::unix::io::RawFd;
use std::path::Path;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::Kernel;

/// Primitive operations on a notification queue.
///
/// Every method reports failure as an `io::Error` carrying the platform
/// errno. Reads on a non-blocking queue with nothing pending must surface
/// `io::ErrorKind::WouldBlock` rather than an empty success.
pub trait Backend {
    /// Create a queue with the given init flags.
    fn init(&mut self, flags: i32) -> io::Result<RawFd>;

    /// Register a watch and return its descriptor.
    fn add_watch(&mut self, fd: RawFd, path: &Path, mask: u32) -> io::Result<i32>;

    /// Remove a watch.
    fn rm_watch(&mut self, fd: RawFd, wd: i32) -> io::Result<()>;

    /// Read raw event records into `buf`, returning the byte count.
    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the queue.
    fn close(&mut self, fd: RawFd) -> io::Result<()>;
}
