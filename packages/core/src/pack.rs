//! Single-allocation string packing for mount entries.
//!
//! Each mount entry carries four strings. Rather than four separate
//! allocations, they are packed back-to-back into one owned block, each
//! field NUL-terminated, and read back as borrowed views. The block is
//! built once and never mutated afterwards.

use std::ops::Range;

/// Accumulates fields into one contiguous buffer.
#[derive(Debug, Default)]
pub struct StringPacker {
    buf: String,
    fields: Vec<Range<usize>>,
}

impl StringPacker {
    /// Creates a packer sized for `fields` fields totalling `bytes` bytes
    /// of content (terminators are accounted for internally).
    pub fn with_capacity(fields: usize, bytes: usize) -> Self {
        Self {
            buf: String::with_capacity(bytes + fields),
            fields: Vec::with_capacity(fields),
        }
    }

    /// Appends one field and its terminator.
    pub fn push(&mut self, field: &str) {
        let start = self.buf.len();
        self.buf.push_str(field);
        self.fields.push(start..self.buf.len());
        self.buf.push('\0');
    }

    /// Freezes the buffer into an immutable packed block.
    pub fn finish(self) -> PackedStrings {
        PackedStrings {
            buf: self.buf.into_boxed_str(),
            fields: self.fields.into_boxed_slice(),
        }
    }
}

/// An immutable block of NUL-terminated string fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedStrings {
    buf: Box<str>,
    fields: Box<[Range<usize>]>,
}

impl PackedStrings {
    /// Returns field `index` as a view into the block, without its
    /// terminator. Panics if `index` is out of range.
    pub fn get(&self, index: usize) -> &str {
        let range = self.fields[index].clone();
        &self.buf[range]
    }

    /// Number of packed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no fields were packed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(fields: &[&str]) -> PackedStrings {
        let mut packer = StringPacker::with_capacity(
            fields.len(),
            fields.iter().map(|f| f.len()).sum(),
        );
        for f in fields {
            packer.push(f);
        }
        packer.finish()
    }

    #[test]
    fn test_fields_read_back() {
        let packed = pack(&["ext4", "/", "/dev/sda1", "rw,relatime"]);
        assert_eq!(packed.len(), 4);
        assert_eq!(packed.get(0), "ext4");
        assert_eq!(packed.get(1), "/");
        assert_eq!(packed.get(2), "/dev/sda1");
        assert_eq!(packed.get(3), "rw,relatime");
    }

    #[test]
    fn test_empty_field_kept() {
        let packed = pack(&["tmpfs", "/tmp", "tmpfs", ""]);
        assert_eq!(packed.get(3), "");
    }

    #[test]
    fn test_fields_individually_terminated() {
        let packed = pack(&["a", "bb", "ccc"]);
        // One block: content plus one NUL per field, nothing shared.
        assert_eq!(packed.buf.len(), "a".len() + "bb".len() + "ccc".len() + 3);
        assert_eq!(&*packed.buf, "a\0bb\0ccc\0");
    }

    #[test]
    fn test_fields_do_not_overlap() {
        let packed = pack(&["xx", "xx", "xx"]);
        let mut ranges: Vec<_> = packed.fields.to_vec();
        ranges.sort_by_key(|r| r.start);
        for pair in ranges.windows(2) {
            assert!(pair[0].end < pair[1].start, "terminator separates fields");
        }
    }
}
