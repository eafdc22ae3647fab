//! `inotify(7)` bindings through `libc`.

#![allow(unsafe_code)]

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;

use super::Backend;

/// The running kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct Kernel;

/// Map a `-1` return to the current errno.
fn check(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

impl Backend for Kernel {
    fn init(&mut self, flags: i32) -> io::Result<RawFd> {
        // SAFETY: no pointers are passed.
        check(unsafe { libc::inotify_init1(flags) })
    }

    fn add_watch(&mut self, fd: RawFd, path: &Path, mask: u32) -> io::Result<i32> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        // SAFETY: `c_path` is NUL-terminated and outlives the call.
        check(unsafe { libc::inotify_add_watch(fd, c_path.as_ptr(), mask) })
    }

    fn rm_watch(&mut self, fd: RawFd, wd: i32) -> io::Result<()> {
        // SAFETY: no pointers are passed.
        check(unsafe { libc::inotify_rm_watch(fd, wd) }).map(drop)
    }

    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
            let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n >= 0 {
                return Ok(n.unsigned_abs());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    fn close(&mut self, fd: RawFd) -> io::Result<()> {
        // SAFETY: the caller owns `fd` and never uses it again.
        check(unsafe { libc::close(fd) }).map(drop)
    }
}
