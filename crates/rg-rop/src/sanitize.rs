//! Pre-simplifies a rop code when an operand is known to be a bit
//! constant, so the engine can skip reading it.

/// Forces operand bit `pos` (0=D, 1=S, 2=T) to `value` in `code`'s truth
/// table, replicating the result across both settings of that bit so the
/// operand is no longer read.
fn force_operand(code: u8, pos: u8, value: bool) -> u8 {
    let mut out = 0u8;
    for idx in 0u8..8 {
        let mut src_idx = idx;
        if value {
            src_idx |= 1 << pos;
        } else {
            src_idx &= !(1 << pos);
        }
        let bit = (code >> src_idx) & 1;
        out |= bit << idx;
    }
    out
}

/// Collapses a constant source and/or constant texture into `lop`.
/// `s_bit`/`t_bit` are `Some(value)` when the corresponding operand is a
/// known constant bit (e.g. both scolors/tcolors equal and reduced to a
/// single 0/1 raster bit), `None` when the operand must still be read.
pub fn sanitize_lop(lop: u8, s_bit: Option<bool>, t_bit: Option<bool>) -> u8 {
    let mut code = lop;
    if let Some(v) = s_bit {
        code = force_operand(code, 1, v);
    }
    if let Some(v) = t_bit {
        code = force_operand(code, 2, v);
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{rop_usage, RopUsage};

    #[test]
    fn collapsing_s_to_0_from_dst_rop_drops_s_dependency() {
        // D|S|T (0xFE) collapsed with S=0 should equal D|T (depends on D,T only).
        let collapsed = sanitize_lop(0xFE, Some(false), None);
        assert_eq!(rop_usage(collapsed), RopUsage::Dt);
    }

    #[test]
    fn collapsing_s_to_1_makes_rop_independent_of_s() {
        let collapsed = sanitize_lop(0xCC, Some(true), None); // pure S-copy
        assert_eq!(rop_usage(collapsed), RopUsage::None);
    }

    #[test]
    fn no_constants_leaves_code_unchanged() {
        assert_eq!(sanitize_lop(0x66, None, None), 0x66);
    }
}
