//! Bit-arithmetic helpers shared by the address and field passes.

/// Returns the number of address bits needed to index `x` distinct locations.
///
/// This is the ceiling of `log2(x)`. By convention `clog2(0)` and `clog2(1)`
/// are both 0; callers that need a non-degenerate bus width clamp the result
/// themselves.
pub fn clog2(x: u64) -> u32 {
    if x <= 1 {
        return 0;
    }
    64 - (x - 1).leading_zeros()
}

/// Returns a mask with the low `width` bits set.
///
/// `width` must be at most 64. `width_mask(0)` is 0 and `width_mask(64)` is
/// `u64::MAX`.
pub fn width_mask(width: u32) -> u64 {
    debug_assert!(width <= 64, "mask width {width} exceeds u64");
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
