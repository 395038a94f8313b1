//! Blocking modification watches over a fixed set of paths.
//!
//! A [`Watcher`] is built with a hard registration capacity, fed paths with
//! [`Watcher::add`], then polled with [`Watcher::wait`], which blocks until
//! the kernel reports one registered path modified. The shared logic
//! (capacity check, tag lookup, ready queue, retry of interrupted reads)
//! sits here; the native queue behind it is chosen at compile time —
//! inotify on Linux, kqueue vnode filters on macOS and FreeBSD.
//!
//! One watcher is single-threaded by design: all `add` calls happen before
//! the `wait` loop, and nothing here is safe to share across threads.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use snafu::ensure;

use crate::error::{Result, WatchOverflowSnafu};

use self::backend::{Backend, WatchId};

/// One registered path and the tag the caller wants back for it.
#[derive(Debug)]
struct Registration {
    id: WatchId,
    tag: u64,
    path: PathBuf,
}

/// Multiplexes modification watches over one native notification queue.
#[derive(Debug)]
pub struct Watcher {
    backend: Backend,
    capacity: usize,
    watches: Vec<Registration>,
    // Native ids observed but not yet handed to the caller. One native
    // read may report several paths; the surplus is drained on later
    // `wait` calls.
    ready: VecDeque<WatchId>,
}

impl Watcher {
    /// Creates a watcher that will accept at most `capacity` registrations.
    ///
    /// Fails if the native notification queue cannot be created.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            backend: Backend::open()?,
            capacity,
            watches: Vec::with_capacity(capacity),
            ready: VecDeque::new(),
        })
    }

    /// Registers `path` for modification events; `tag` comes back from
    /// [`Watcher::wait`] whenever that path is reported.
    ///
    /// Exceeding the declared capacity is a hard `WatchOverflow` error. A
    /// path the kernel refuses to watch comes back as `WatchRejected`,
    /// which the caller may treat as skippable and continue adding others.
    pub fn add(&mut self, tag: u64, path: impl Into<PathBuf>) -> Result<()> {
        ensure!(
            self.watches.len() < self.capacity,
            WatchOverflowSnafu {
                capacity: self.capacity
            }
        );

        let path = path.into();
        let id = self.backend.add_watch(&path)?;
        self.watches.push(Registration { id, tag, path });
        Ok(())
    }

    /// Blocks until one registered path is modified, returning its tag and
    /// path.
    ///
    /// Writes landing between two calls may be coalesced into a single
    /// report; how many events one write produces is backend-dependent.
    /// Interrupted native reads are retried and events with no matching
    /// registration are dropped, so the caller only ever sees paths it
    /// registered.
    pub fn wait(&mut self) -> Result<(u64, PathBuf)> {
        loop {
            while let Some(id) = self.ready.pop_front() {
                if let Some(reg) = self.watches.iter().find(|r| r.id == id) {
                    return Ok((reg.tag, reg.path.clone()));
                }
            }
            self.backend.wait_raw(&mut self.ready)?;
        }
    }

    /// Number of successful registrations so far.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// True if nothing was registered yet.
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// The registration limit this watcher was built with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(not(any(target_os = "macos", target_os = "freebsd")))]
mod backend {
    //! inotify backend: one queue fd, one watch descriptor per path.

    use std::collections::VecDeque;
    use std::path::Path;

    use nix::errno::Errno;
    use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
    use snafu::ResultExt;

    use crate::error::{NotifyInitSnafu, NotifyReadSnafu, Result, WatchRejectedSnafu};

    pub(super) type WatchId = WatchDescriptor;

    #[derive(Debug)]
    pub(super) struct Backend {
        queue: Inotify,
    }

    impl Backend {
        pub(super) fn open() -> Result<Self> {
            let queue = Inotify::init(InitFlags::empty()).context(NotifyInitSnafu)?;
            Ok(Self { queue })
        }

        pub(super) fn add_watch(&mut self, path: &Path) -> Result<WatchId> {
            self.queue
                .add_watch(path, AddWatchFlags::IN_MODIFY)
                .context(WatchRejectedSnafu { path })
        }

        pub(super) fn wait_raw(&mut self, ready: &mut VecDeque<WatchId>) -> Result<()> {
            // read_events blocks on the queue fd and returns every event
            // currently pending.
            loop {
                match self.queue.read_events() {
                    Ok(events) => {
                        ready.extend(events.into_iter().map(|event| event.wd));
                        return Ok(());
                    }
                    Err(Errno::EINTR) => continue,
                    Err(source) => return Err(source).context(NotifyReadSnafu),
                }
            }
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "freebsd"))]
mod backend {
    //! kqueue backend: each path is held open read-only and its fd is
    //! registered with an edge-triggered vnode write filter.

    use std::collections::VecDeque;
    use std::os::fd::{AsRawFd, OwnedFd, RawFd};
    use std::path::Path;

    use nix::errno::Errno;
    use nix::fcntl::{OFlag, open};
    use nix::sys::event::{EventFilter, EventFlag, FilterFlag, KEvent, Kqueue};
    use nix::sys::stat::Mode;
    use snafu::ResultExt;

    use crate::error::{NotifyInitSnafu, NotifyReadSnafu, Result, WatchRejectedSnafu};

    pub(super) type WatchId = RawFd;

    #[derive(Debug)]
    pub(super) struct Backend {
        queue: Kqueue,
        // Keeps registered fds alive; kqueue drops a vnode filter when its
        // fd closes.
        files: Vec<OwnedFd>,
    }

    impl Backend {
        pub(super) fn open() -> Result<Self> {
            let queue = Kqueue::new().context(NotifyInitSnafu)?;
            Ok(Self {
                queue,
                files: Vec::new(),
            })
        }

        pub(super) fn add_watch(&mut self, path: &Path) -> Result<WatchId> {
            let file = open(path, OFlag::O_RDONLY, Mode::empty())
                .context(WatchRejectedSnafu { path })?;
            let id = file.as_raw_fd();

            let change = KEvent::new(
                id as libc::uintptr_t,
                EventFilter::EVFILT_VNODE,
                EventFlag::EV_ADD | EventFlag::EV_CLEAR,
                FilterFlag::NOTE_WRITE,
                0,
                0,
            );
            self.queue
                .kevent(&[change], &mut [], None)
                .context(WatchRejectedSnafu { path })?;

            self.files.push(file);
            Ok(id)
        }

        pub(super) fn wait_raw(&mut self, ready: &mut VecDeque<WatchId>) -> Result<()> {
            let mut events = [KEvent::new(
                0,
                EventFilter::EVFILT_VNODE,
                EventFlag::empty(),
                FilterFlag::empty(),
                0,
                0,
            )];

            loop {
                match self.queue.kevent(&[], &mut events, None) {
                    Ok(n) => {
                        ready.extend(events[..n].iter().map(|e| e.ident() as RawFd));
                        return Ok(());
                    }
                    Err(Errno::EINTR) => continue,
                    Err(source) => return Err(source).context(NotifyReadSnafu),
                }
            }
        }
    }
}

#[cfg(all(test, not(any(target_os = "macos", target_os = "freebsd"))))]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_capacity_is_a_hard_limit() {
        let dir = TempDir::new().unwrap();
        let mut watcher = Watcher::with_capacity(3).unwrap();

        for i in 0..3 {
            let path = dir.path().join(format!("f{i}"));
            fs::write(&path, b"x").unwrap();
            watcher.add(i, path).unwrap();
        }
        assert_eq!(watcher.len(), 3);

        let extra = dir.path().join("f3");
        fs::write(&extra, b"x").unwrap();
        let err = watcher.add(3, extra).unwrap_err();
        assert!(matches!(err, Error::WatchOverflow { capacity: 3 }));
    }

    #[test]
    fn test_rejected_path_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let mut watcher = Watcher::with_capacity(2).unwrap();

        let err = watcher
            .add(0, dir.path().join("does-not-exist"))
            .unwrap_err();
        assert!(matches!(err, Error::WatchRejected { .. }));

        // The failed add consumed no capacity; a good path still fits.
        assert!(watcher.is_empty());
        let good = dir.path().join("good");
        fs::write(&good, b"x").unwrap();
        watcher.add(1, good).unwrap();
        assert_eq!(watcher.len(), 1);
    }

    #[test]
    fn test_wait_reports_modified_path() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();

        let mut watcher = Watcher::with_capacity(3).unwrap();
        watcher.add(5, &a).unwrap();
        watcher.add(6, &b).unwrap();

        let mut file = fs::OpenOptions::new().append(true).open(&b).unwrap();
        file.write_all(b"more").unwrap();
        file.sync_all().unwrap();

        let (tag, path) = watcher.wait().unwrap();
        assert_eq!(tag, 6);
        assert_eq!(path, b);
    }

    #[test]
    fn test_repeated_waits_observe_each_path() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"x").unwrap();
        fs::write(&b, b"x").unwrap();

        let mut watcher = Watcher::with_capacity(2).unwrap();
        watcher.add(1, &a).unwrap();
        watcher.add(2, &b).unwrap();

        fs::OpenOptions::new()
            .append(true)
            .open(&a)
            .unwrap()
            .write_all(b"1")
            .unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&b)
            .unwrap()
            .write_all(b"2")
            .unwrap();

        // Two modified paths, two waits; batches may arrive in one native
        // read or two, but both paths are eventually observed.
        let first = watcher.wait().unwrap();
        let second = watcher.wait().unwrap();
        let mut tags = [first.0, second.0];
        tags.sort_unstable();
        assert_eq!(tags, [1, 2]);
    }
}
