//! Unified error types for the fsprobe-core library.
//!
//! Uses SNAFU for context-rich error handling. Variants fall into three
//! groups: fatal resource errors (a native source could not be opened or
//! queried, or a hard limit was hit), recoverable per-item errors (a single
//! watch rejected by the kernel), and malformed caller input (a bad type
//! list). Per-entry stat/statvfs failures never become errors at all; they
//! leave the affected snapshot zeroed.

use snafu::{ResultExt, Snafu};
use std::path::PathBuf;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all core library operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Mount table file could not be opened. Fatal: the snapshot aborts.
    #[snafu(display("failed to open mount table at {}", path.display()))]
    MountTableOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Mount table file could not be read mid-pass.
    #[snafu(display("failed to read mount table at {}", path.display()))]
    MountTableRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The batch mount enumeration call failed.
    #[snafu(display("failed to enumerate mounted filesystems"))]
    MountEnumeration { source: std::io::Error },

    /// An alternate mount table was requested on a platform whose native
    /// source is a system call, not a file.
    #[snafu(display("mount table overrides are not supported on this platform"))]
    TableOverrideUnsupported,

    /// A type list mixes plain and "no"-prefixed tokens.
    #[snafu(display("bad type list '{spec}': cannot mix plain and 'no'-prefixed types"))]
    MixedTypeList { spec: String },

    /// The native change-notification queue could not be created.
    #[snafu(display("failed to create change-notification queue"))]
    NotifyInit { source: nix::Error },

    /// A watcher already holds as many registrations as it was built for.
    #[snafu(display("watch table full ({capacity} watches)"))]
    WatchOverflow { capacity: usize },

    /// The kernel refused to watch a path. Recoverable: the caller may drop
    /// the path and keep going.
    #[snafu(display("cannot watch {}", path.display()))]
    WatchRejected { path: PathBuf, source: nix::Error },

    /// Reading from the change-notification queue failed for a reason other
    /// than an interrupted call.
    #[snafu(display("failed to read change notification"))]
    NotifyRead { source: nix::Error },
}

/// Extension trait for adding context to io::Error results.
pub trait IoResultExt<T> {
    /// Add context for mount table open errors.
    fn table_open_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for mount table read errors.
    fn table_read_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn table_open_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(MountTableOpenSnafu { path: path.into() })
    }

    fn table_read_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(MountTableReadSnafu { path: path.into() })
    }
}
