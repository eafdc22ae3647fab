//! Kernel event mask and init flag vocabulary.
//!
//! Masks are plain `u32` bit-sets owned by the kernel ABI. Nothing in the
//! session or decoder interprets them; the lookups here exist for display
//! and command-line parsing.

/// File was accessed.
pub const IN_ACCESS: u32 = 0x0000_0001;
/// File was modified.
pub const IN_MODIFY: u32 = 0x0000_0002;
/// Metadata changed.
pub const IN_ATTRIB: u32 = 0x0000_0004;
/// Writable file was closed.
pub const IN_CLOSE_WRITE: u32 = 0x0000_0008;
/// Unwritable file was closed.
pub const IN_CLOSE_NOWRITE: u32 = 0x0000_0010;
/// File was opened.
pub const IN_OPEN: u32 = 0x0000_0020;
/// File was moved out of the watched directory.
pub const IN_MOVED_FROM: u32 = 0x0000_0040;
/// File was moved into the watched directory.
pub const IN_MOVED_TO: u32 = 0x0000_0080;
/// File was created in the watched directory.
pub const IN_CREATE: u32 = 0x0000_0100;
/// File was deleted from the watched directory.
pub const IN_DELETE: u32 = 0x0000_0200;
/// Watched object was deleted.
pub const IN_DELETE_SELF: u32 = 0x0000_0400;
/// Watched object was moved.
pub const IN_MOVE_SELF: u32 = 0x0000_0800;

/// Backing filesystem was unmounted.
pub const IN_UNMOUNT: u32 = 0x0000_2000;
/// Event queue overflowed.
pub const IN_Q_OVERFLOW: u32 = 0x0000_4000;
/// Watch was removed, explicitly or by the kernel.
pub const IN_IGNORED: u32 = 0x0000_8000;

/// Only watch the path if it is a directory.
pub const IN_ONLYDIR: u32 = 0x0100_0000;
/// Do not follow a symlink.
pub const IN_DONT_FOLLOW: u32 = 0x0200_0000;
/// Stop reporting events for children once they are unlinked.
pub const IN_EXCL_UNLINK: u32 = 0x0400_0000;
/// Fail if a watch already exists for the path.
pub const IN_MASK_CREATE: u32 = 0x1000_0000;
/// Add to the mask of an existing watch instead of replacing it.
pub const IN_MASK_ADD: u32 = 0x2000_0000;
/// Subject of the event is a directory.
pub const IN_ISDIR: u32 = 0x4000_0000;
/// Remove the watch after the first event.
pub const IN_ONESHOT: u32 = 0x8000_0000;

/// Either close event.
pub const IN_CLOSE: u32 = IN_CLOSE_WRITE | IN_CLOSE_NOWRITE;
/// Either half of a rename.
pub const IN_MOVE: u32 = IN_MOVED_FROM | IN_MOVED_TO;

/// Every event a watch can request.
pub const IN_ALL_EVENTS: u32 = IN_ACCESS
    | IN_MODIFY
    | IN_ATTRIB
    | IN_CLOSE_WRITE
    | IN_CLOSE_NOWRITE
    | IN_OPEN
    | IN_MOVED_FROM
    | IN_MOVED_TO
    | IN_CREATE
    | IN_DELETE
    | IN_DELETE_SELF
    | IN_MOVE_SELF;

/// Queue init flag: reads never block.
pub const IN_NONBLOCK: i32 = libc::O_NONBLOCK;
/// Queue init flag: close the descriptor on exec.
pub const IN_CLOEXEC: i32 = libc::O_CLOEXEC;

/// Single-bit names, ascending by bit.
const BITS: &[(&str, u32)] = &[
    ("ACCESS", IN_ACCESS),
    ("MODIFY", IN_MODIFY),
    ("ATTRIB", IN_ATTRIB),
    ("CLOSE_WRITE", IN_CLOSE_WRITE),
    ("CLOSE_NOWRITE", IN_CLOSE_NOWRITE),
    ("OPEN", IN_OPEN),
    ("MOVED_FROM", IN_MOVED_FROM),
    ("MOVED_TO", IN_MOVED_TO),
    ("CREATE", IN_CREATE),
    ("DELETE", IN_DELETE),
    ("DELETE_SELF", IN_DELETE_SELF),
    ("MOVE_SELF", IN_MOVE_SELF),
    ("UNMOUNT", IN_UNMOUNT),
    ("Q_OVERFLOW", IN_Q_OVERFLOW),
    ("IGNORED", IN_IGNORED),
    ("ONLYDIR", IN_ONLYDIR),
    ("DONT_FOLLOW", IN_DONT_FOLLOW),
    ("EXCL_UNLINK", IN_EXCL_UNLINK),
    ("MASK_CREATE", IN_MASK_CREATE),
    ("MASK_ADD", IN_MASK_ADD),
    ("ISDIR", IN_ISDIR),
    ("ONESHOT", IN_ONESHOT),
];

const COMBINATIONS: &[(&str, u32)] = &[
    ("CLOSE", IN_CLOSE),
    ("MOVE", IN_MOVE),
    ("ALL_EVENTS", IN_ALL_EVENTS),
];

/// Names of every known bit set in `mask`, lowest bit first.
#[must_use]
pub fn names(mask: u32) -> Vec<&'static str> {
    BITS.iter()
        .filter(|(_, bit)| mask & bit != 0)
        .map(|(name, _)| *name)
        .collect()
}

/// `names` joined with `|`, or the hex value when no bit is known.
#[must_use]
pub fn describe(mask: u32) -> String {
    let names = names(mask);
    if names.is_empty() {
        format!("{mask:#x}")
    } else {
        names.join("|")
    }
}

/// Look up a mask by name, with or without the `IN_` prefix.
#[must_use]
pub fn parse(name: &str) -> Option<u32> {
    let upper = name.trim().to_ascii_uppercase();
    let bare = upper.strip_prefix("IN_").unwrap_or(&upper);
    BITS.iter()
        .chain(COMBINATIONS)
        .find(|(n, _)| *n == bare)
        .map(|(_, bit)| *bit)
}

/// Parse and OR together a list of mask names.
///
/// Returns the first unknown name on failure.
pub fn parse_list<S: AsRef<str>>(names: &[S]) -> std::result::Result<u32, String> {
    names.iter().try_fold(0, |acc, name| {
        parse(name.as_ref())
            .map(|bit| acc | bit)
            .ok_or_else(|| name.as_ref().to_string())
    })
}
