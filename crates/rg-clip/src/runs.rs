//! Horizontal run enumeration shared by the mask and tile clippers.

use std::sync::OnceLock;

/// For each of the 256 possible mask bytes, its maximal set-bit runs as
/// `(start_bit, len)`, bit 0 counted from the MSB. Built once on first use
/// so a clipper never re-scans a byte bit by bit on every call.
fn byte_run_table() -> &'static [Vec<(u8, u8)>; 256] {
    static TABLE: OnceLock<[Vec<(u8, u8)>; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        std::array::from_fn(|byte| {
            let byte = byte as u8;
            let mut runs = Vec::new();
            let mut i = 0u8;
            while i < 8 {
                if (byte >> (7 - i)) & 1 == 1 {
                    let start = i;
                    let mut len = 0u8;
                    while i < 8 && (byte >> (7 - i)) & 1 == 1 {
                        len += 1;
                        i += 1;
                    }
                    runs.push((start, len));
                } else {
                    i += 1;
                }
            }
            runs
        })
    })
}

/// Maximal runs of set bits in `row`, restricted to `[x0, x1)`, using the
/// precomputed byte table and merging runs across byte boundaries.
pub(crate) fn mask_row_runs(row: &[u8], x0: i32, x1: i32) -> Vec<(i32, i32)> {
    let table = byte_run_table();
    let mut runs: Vec<(i32, i32)> = Vec::new();
    if x1 <= x0 {
        return runs;
    }
    let mut byte_idx = (x0 / 8) as usize;
    loop {
        let byte_start = byte_idx as i32 * 8;
        if byte_start >= x1 || byte_idx >= row.len() {
            break;
        }
        for &(start, len) in &table[row[byte_idx] as usize] {
            let run_start = byte_start + start as i32;
            let run_end = run_start + len as i32;
            if run_end <= x0 || run_start >= x1 {
                continue;
            }
            let cs = run_start.max(x0);
            let ce = run_end.min(x1);
            if let Some(last) = runs.last_mut() {
                if last.1 == cs {
                    last.1 = ce;
                    continue;
                }
            }
            runs.push((cs, ce));
        }
        byte_idx += 1;
    }
    runs
}

/// Maximal runs where `bit_at(x)` holds, restricted to `[x0, x1)`. Used for
/// the tile clipper, whose mask is a replicated pattern rather than a
/// stored byte buffer.
pub(crate) fn runs_in_span(mut bit_at: impl FnMut(i32) -> bool, x0: i32, x1: i32) -> Vec<(i32, i32)> {
    let mut runs = Vec::new();
    let mut x = x0;
    while x < x1 {
        if bit_at(x) {
            let start = x;
            while x < x1 && bit_at(x) {
                x += 1;
            }
            runs.push((start, x));
        } else {
            x += 1;
        }
    }
    runs
}
