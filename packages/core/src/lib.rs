//! fsprobe-core: mounted-filesystem snapshots and path modification watches.
//!
//! This library is the OS observation layer behind the fsprobe tools. It
//! exposes three services over one platform-independent API: a point-in-time
//! snapshot of mounted filesystems, a type-list predicate for narrowing that
//! snapshot, and a bounded blocking watcher that reports path modifications.
//! The native sources behind the snapshot (text mount table vs. batch
//! `getmntinfo`) and the watcher (inotify vs. kqueue) are selected at
//! compile time.
//!
//! # Modules
//!
//! - [`mount`]: Mount snapshots via [`read_mounts`]
//! - [`filter`]: Filesystem type filtering
//! - [`watch`]: Blocking path-modification watcher
//! - [`escape`]: Backslash-octal decoding for text table fields
//! - [`pack`]: Single-allocation string packing for entries
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use fsprobe_core::{read_mounts, TypeFilter, Watcher};
//!
//! // Snapshot the mount table, keeping only real disk filesystems.
//! let filter = TypeFilter::parse(Some("notmpfs,nodevtmpfs")).unwrap();
//! let mounts = read_mounts(None).unwrap();
//! for mount in mounts.iter().filter(|m| filter.matches_entry(m)) {
//!     println!("{} on {}", mount.device(), mount.dir().display());
//! }
//!
//! // Independently, block until one of two files changes.
//! let mut watcher = Watcher::with_capacity(2).unwrap();
//! watcher.add(0, "/tmp/a").unwrap();
//! watcher.add(1, "/tmp/b").unwrap();
//! let (tag, path) = watcher.wait().unwrap();
//! println!("#{tag}: {} modified", path.display());
//! ```

pub mod error;
pub mod escape;
pub mod filter;
pub mod mount;
pub mod pack;
pub mod watch;

// Re-export commonly used types
pub use error::{Error, Result};
pub use filter::TypeFilter;
pub use mount::{MetaSnapshot, MountEntry, SpaceSnapshot, read_mounts};
pub use watch::Watcher;
