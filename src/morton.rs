// morton.rs - 2D Z-order codes over the leaf grid
//
// Bit layout: ...y1x1y0x0. Each axis holds up to 16 bits.

/// Spread the low 16 bits of `v` into the even bit positions.
#[inline]
fn spread_bits(v: u32) -> u32 {
    let mut x = v & 0x0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

/// Gather the even bits of `z` into the low 16 bits.
#[inline]
fn unweave_bits(z: u32) -> u32 {
    let mut x = z & 0x5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF;
    x
}

#[inline]
pub fn interleave(x: u32, y: u32) -> u32 {
    debug_assert!(x <= 0xFFFF && y <= 0xFFFF, "morton axis exceeds 16 bits");
    spread_bits(x) | (spread_bits(y) << 1)
}

#[inline]
pub fn deinterleave(z: u32) -> (u32, u32) {
    (unweave_bits(z), unweave_bits(z >> 1))
}
