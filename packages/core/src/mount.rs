//! Mounted-filesystem snapshots.
//!
//! [`read_mounts`] takes one point-in-time pass over the kernel's mount
//! records and returns them newest-mount-first, so an overmount shows up
//! before the mount it shadows. Two native sources feed the same data
//! model, selected at compile time:
//!
//! - the text mount table (`/proc/mounts` on Linux, or any fstab-family
//!   file passed as an override), with backslash-octal escapes in the
//!   device and mount point fields;
//! - the `getmntinfo` batch call on macOS and FreeBSD, which returns fixed
//!   `statfs` records. That call reports no option string, so `opts` is
//!   always empty there; it also serves no override files.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::pack::{PackedStrings, StringPacker};

/// Field order inside a packed entry.
const FIELD_TYPE: usize = 0;
const FIELD_DIR: usize = 1;
const FIELD_DEVICE: usize = 2;
const FIELD_OPTS: usize = 3;

/// Best-effort stat of a mount point. Zeroed when the stat call failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetaSnapshot {
    /// Size of the mount point inode, in bytes.
    pub size: u64,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// File mode bits, including the file type class.
    pub mode: u32,
}

/// Best-effort statvfs of a mount point. Zeroed when the call failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpaceSnapshot {
    /// Fundamental block size the counts below are denominated in.
    pub block_size: u64,
    /// Total blocks in the filesystem.
    pub blocks: u64,
    /// Blocks free, including those reserved for root.
    pub blocks_free: u64,
    /// Blocks free to unprivileged users.
    pub blocks_available: u64,
}

impl SpaceSnapshot {
    /// Total capacity in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.block_size * self.blocks
    }

    /// Free space in bytes, counting root-reserved blocks.
    pub fn free_bytes(&self) -> u64 {
        self.block_size * self.blocks_free
    }

    /// Used space in bytes.
    pub fn used_bytes(&self) -> u64 {
        self.block_size * self.blocks.saturating_sub(self.blocks_free)
    }
}

/// One mounted filesystem.
///
/// The four string fields live in a single owned block, each independently
/// NUL-terminated; accessors return views into it. Entries are built once
/// by [`read_mounts`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    strings: PackedStrings,
    meta: MetaSnapshot,
    space: SpaceSnapshot,
}

impl MountEntry {
    fn new(
        fs_type: &str,
        dir: &str,
        device: &str,
        opts: &str,
        meta: MetaSnapshot,
        space: SpaceSnapshot,
    ) -> Self {
        let mut packer = StringPacker::with_capacity(
            4,
            fs_type.len() + dir.len() + device.len() + opts.len(),
        );
        packer.push(fs_type);
        packer.push(dir);
        packer.push(device);
        packer.push(opts);
        Self {
            strings: packer.finish(),
            meta,
            space,
        }
    }

    /// Filesystem type name, e.g. "ext4".
    pub fn fs_type(&self) -> &str {
        self.strings.get(FIELD_TYPE)
    }

    /// Mount point path, escapes already decoded.
    pub fn dir(&self) -> &Path {
        Path::new(self.strings.get(FIELD_DIR))
    }

    /// Source device or pseudo-source, escapes already decoded.
    pub fn device(&self) -> &str {
        self.strings.get(FIELD_DEVICE)
    }

    /// Comma-separated mount options. Empty on platforms whose native
    /// source does not report them.
    pub fn opts(&self) -> &str {
        self.strings.get(FIELD_OPTS)
    }

    /// Mount point stat snapshot.
    pub fn meta(&self) -> &MetaSnapshot {
        &self.meta
    }

    /// Mount point capacity snapshot.
    pub fn space(&self) -> &SpaceSnapshot {
        &self.space
    }
}

/// Stats a mount point for the metadata and capacity snapshots.
///
/// Failures are not reported; the affected snapshot stays zeroed and the
/// enumeration pass continues.
fn snapshot_point(dir: &Path) -> (MetaSnapshot, SpaceSnapshot) {
    let meta = nix::sys::stat::stat(dir)
        .map(|st| MetaSnapshot {
            size: st.st_size as u64,
            uid: st.st_uid,
            gid: st.st_gid,
            mode: st.st_mode as u32,
        })
        .unwrap_or_default();

    let space = nix::sys::statvfs::statvfs(dir)
        .map(|vfs| SpaceSnapshot {
            block_size: vfs.fragment_size() as u64,
            blocks: vfs.blocks() as u64,
            blocks_free: vfs.blocks_free() as u64,
            blocks_available: vfs.blocks_available() as u64,
        })
        .unwrap_or_default();

    (meta, space)
}

/// Returns a snapshot of currently mounted filesystems, newest mount first.
///
/// With no override, the live system table is read and each entry is
/// enriched with stat/statvfs snapshots (best-effort; a failure zeroes that
/// entry's snapshot only). With `table_override`, that file is read instead
/// and enrichment is skipped, so fstab-family files can be inspected
/// without touching the filesystem they describe.
///
/// Fails only if the native source cannot be opened or queried.
pub fn read_mounts(table_override: Option<&Path>) -> Result<Vec<MountEntry>> {
    read_native(table_override)
}

#[cfg(not(any(target_os = "macos", target_os = "freebsd")))]
fn read_native(table_override: Option<&Path>) -> Result<Vec<MountEntry>> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    use crate::error::IoResultExt;
    use crate::escape::decode_field;

    // Default text mount table.
    const MOUNT_TABLE: &str = "/proc/mounts";

    let path = table_override.unwrap_or(Path::new(MOUNT_TABLE));
    let file = File::open(path).table_open_context(path)?;
    let reader = BufReader::new(file);

    let mut mounts = Vec::new();
    for line in reader.lines() {
        let line = line.table_read_context(path)?;
        let line = line.trim();

        // Skip comments and blank lines (fstab-family files carry both).
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // device dir type opts [dump pass]
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }

        let device = decode_field(parts[0]);
        let dir = decode_field(parts[1]);
        let (meta, space) = if table_override.is_none() {
            snapshot_point(Path::new(&dir))
        } else {
            Default::default()
        };

        mounts.push(MountEntry::new(parts[2], &dir, &device, parts[3], meta, space));
    }

    // Reverse once instead of front-inserting per record.
    mounts.reverse();
    Ok(mounts)
}

#[cfg(any(target_os = "macos", target_os = "freebsd"))]
fn read_native(table_override: Option<&Path>) -> Result<Vec<MountEntry>> {
    use std::ffi::CStr;
    use std::os::raw::c_char;

    use snafu::{ResultExt, ensure};

    use crate::error::{MountEnumerationSnafu, TableOverrideUnsupportedSnafu};

    ensure!(table_override.is_none(), TableOverrideUnsupportedSnafu);

    // The kernel owns the record array; it stays valid for the life of the
    // process and must not be freed.
    let mut records: *mut libc::statfs = std::ptr::null_mut();
    let count = unsafe { libc::getmntinfo(&mut records, 0) };
    if count <= 0 {
        return Err(std::io::Error::last_os_error()).context(MountEnumerationSnafu);
    }

    fn field(raw: &[c_char]) -> String {
        // statfs name fields are NUL-terminated by the kernel.
        unsafe { CStr::from_ptr(raw.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    let entries = unsafe { std::slice::from_raw_parts(records, count as usize) };
    let mut mounts = Vec::with_capacity(entries.len());
    for rec in entries {
        let fs_type = field(&rec.f_fstypename);
        let dir = field(&rec.f_mntonname);
        let device = field(&rec.f_mntfromname);
        let (meta, space) = snapshot_point(Path::new(&dir));

        // statfs carries flag bits, not an option string; opts stays empty.
        mounts.push(MountEntry::new(&fs_type, &dir, &device, "", meta, space));
    }

    mounts.reverse();
    Ok(mounts)
}

#[cfg(all(test, not(any(target_os = "macos", target_os = "freebsd"))))]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_TABLE: &str = "\
/dev/sda1 / ext4 rw,relatime 0 0
tmpfs /tmp tmpfs rw,nosuid,nodev 0 0
/dev/sdb1 /mnt/My\\040Drive vfat rw,umask=000 0 0
";

    fn table_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_all_records_newest_first() {
        let file = table_file(SAMPLE_TABLE);
        let mounts = read_mounts(Some(file.path())).unwrap();

        assert_eq!(mounts.len(), 3);
        assert_eq!(mounts[0].device(), "/dev/sdb1");
        assert_eq!(mounts[1].fs_type(), "tmpfs");
        assert_eq!(mounts[2].device(), "/dev/sda1");
        assert_eq!(mounts[2].dir(), Path::new("/"));
        assert_eq!(mounts[2].opts(), "rw,relatime");
    }

    #[test]
    fn test_escaped_fields_decoded() {
        let file = table_file(SAMPLE_TABLE);
        let mounts = read_mounts(Some(file.path())).unwrap();

        assert_eq!(mounts[0].dir(), Path::new("/mnt/My Drive"));
    }

    #[test]
    fn test_override_skips_enrichment() {
        // "/" would certainly stat, but with an override the snapshots
        // must stay zeroed.
        let file = table_file(SAMPLE_TABLE);
        let mounts = read_mounts(Some(file.path())).unwrap();

        for mount in &mounts {
            assert_eq!(*mount.meta(), MetaSnapshot::default());
            assert_eq!(*mount.space(), SpaceSnapshot::default());
        }
    }

    #[test]
    fn test_comments_and_short_lines_skipped() {
        let file = table_file(
            "# static table\n\n/dev/sda1 / ext4 rw 0 0\nbogus line\n",
        );
        let mounts = read_mounts(Some(file.path())).unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].fs_type(), "ext4");
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let err = read_mounts(Some(Path::new("/nonexistent/mounts"))).unwrap_err();
        assert!(matches!(err, Error::MountTableOpen { .. }));
    }

    #[test]
    fn test_live_table_enriched() {
        let mounts = read_mounts(None).unwrap();
        assert!(!mounts.is_empty());

        // The root mount is always present and statvfs of "/" succeeds, so
        // at least one entry carries a non-zero capacity snapshot.
        assert!(mounts.iter().any(|m| m.space().blocks > 0));
    }

    #[test]
    fn test_empty_opts_preserved_in_block() {
        let entry = MountEntry::new(
            "devfs",
            "/dev",
            "devfs",
            "",
            MetaSnapshot::default(),
            SpaceSnapshot::default(),
        );
        assert_eq!(entry.opts(), "");
        assert_eq!(entry.fs_type(), "devfs");
    }

    #[test]
    fn test_space_snapshot_byte_math() {
        let space = SpaceSnapshot {
            block_size: 4096,
            blocks: 100,
            blocks_free: 25,
            blocks_available: 20,
        };
        assert_eq!(space.total_bytes(), 409_600);
        assert_eq!(space.free_bytes(), 102_400);
        assert_eq!(space.used_bytes(), 307_200);
    }
}
