use memchr::memchr;

/// Head record of `run`: its content (excluding the separator) and its
/// frame length (including the separator). A run missing its trailing
/// separator yields its whole remainder as one record.
#[inline]
fn head_record(run: &[u8], separator: u8) -> (&[u8], usize) {
    match memchr(separator, run) {
        Some(i) => (&run[..i], i + 1),
        None => (run, run.len()),
    }
}

/// Merge two sorted, separator-framed runs into `out`.
///
/// `out` must not alias either run and must hold at least
/// `left.len() + right.len()` bytes. Records are compared byte-by-byte
/// (unsigned) up to, not including, their separator; the smaller record
/// is copied including its separator. Ties take the left record, which
/// keeps the merge stable.
pub fn merge(out: &mut [u8], left: &[u8], right: &[u8], separator: u8) {
    debug_assert!(out.len() >= left.len() + right.len());

    let mut l = 0;
    let mut r = 0;
    let mut o = 0;

    while l < left.len() || r < right.len() {
        let take_left = if r >= right.len() {
            true
        } else if l >= left.len() {
            false
        } else {
            let (lrec, _) = head_record(&left[l..], separator);
            let (rrec, _) = head_record(&right[r..], separator);
            lrec <= rrec
        };

        if take_left {
            let (_, n) = head_record(&left[l..], separator);
            out[o..o + n].copy_from_slice(&left[l..l + n]);
            l += n;
            o += n;
        } else {
            let (_, n) = head_record(&right[r..], separator);
            out[o..o + n].copy_from_slice(&right[r..r + n]);
            r += n;
            o += n;
        }
    }
}
