use memchr::{memchr, memrchr};

/// Locate a record boundary at or near the middle of `buf`.
///
/// `buf` must contain only whole, separator-terminated records. Scans
/// forward from the midpoint for the next separator and returns the
/// position just past it; the buffer's final separator is never a valid
/// target (it would yield an empty right half), so if the forward scan
/// only reaches it, the scan retries backward from the midpoint.
///
/// Returns 0 when `buf` holds fewer than two records — the base-case
/// signal for the scheduler.
pub fn split_point(buf: &[u8], separator: u8) -> usize {
    if buf.len() < 2 {
        return 0;
    }
    let mid = buf.len() / 2;

    if let Some(i) = memchr(separator, &buf[mid..]) {
        let pos = mid + i;
        if pos + 1 < buf.len() {
            return pos + 1;
        }
    }

    match memrchr(separator, &buf[..mid]) {
        Some(i) => i + 1,
        None => 0,
    }
}
