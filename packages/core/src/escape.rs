//! Backslash-octal escape decoding for mount table fields.
//!
//! The kernel's text mount table encodes whitespace in device and mount
//! point names as `\nnn` octal sequences (a directory "My Drive" appears as
//! `My\040Drive`). Decoding happens before the fields are packed into an
//! entry, so field offsets are computed from decoded lengths.

/// Decodes `\nnn` octal escapes in place. The buffer only ever shrinks.
///
/// A backslash followed by exactly three octal digits collapses to the byte
/// they denote (modulo 256). Anything else — fewer than three digits, a
/// non-octal digit, or an escape truncated by the end of the buffer — is
/// copied through verbatim.
pub fn decode_octal_escapes(buf: &mut Vec<u8>) {
    let mut read = 0;
    let mut write = 0;

    while read < buf.len() {
        if buf[read] == b'\\' && read + 3 < buf.len() {
            let digits = [buf[read + 1], buf[read + 2], buf[read + 3]];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| (acc << 3) + u32::from(d - b'0'));
                buf[write] = value as u8;
                write += 1;
                read += 4;
                continue;
            }
        }
        buf[write] = buf[read];
        write += 1;
        read += 1;
    }

    buf.truncate(write);
}

/// Decodes escapes in a raw table field and returns it as a string, with
/// any non-UTF-8 decoded bytes replaced.
pub fn decode_field(raw: &str) -> String {
    let mut bytes = raw.as_bytes().to_vec();
    decode_octal_escapes(&mut bytes);
    String::from_utf8_lossy(&bytes).into_owned()
}
