//! Byte-level operations on packed RGBA data.
//!
//! Both functions work on slices of `R, G, B, A` quadruplets and are written
//! as straight loops over fixed-size chunks so the compiler can vectorize
//! them. Results do not depend on vectorization.

/// Composite `src` over `dst`, in place.
///
/// Per color: `out = src * a + dst * (255 - a)` for R, G and B, and
/// `out_a = a + dst_a * (255 - a)`, where `a` is the source alpha and all
/// products are divided by 255 with rounding. A fully transparent source
/// leaves `dst` untouched; a fully opaque source replaces it.
///
/// # Panics
/// If the slices differ in length or are not a whole number of colors.
pub fn blend(dst: &mut [u8], src: &[u8]) {
    assert_eq!(dst.len(), src.len(), "blend requires equal sizes");
    assert_eq!(dst.len() % 4, 0, "blend requires whole RGBA entries");

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let alpha = s[3] as u32;
        let inv = 255 - alpha;
        d[0] = div255(s[0] as u32 * alpha + d[0] as u32 * inv);
        d[1] = div255(s[1] as u32 * alpha + d[1] as u32 * inv);
        d[2] = div255(s[2] as u32 * alpha + d[2] as u32 * inv);
        d[3] = (alpha + div255(d[3] as u32 * inv) as u32) as u8;
    }
}

/// Byte-wise equality of two packed buffers.
pub fn equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.chunks(32)
        .zip(b.chunks(32))
        .all(|(x, y)| x.iter().zip(y).fold(0u8, |acc, (p, q)| acc | (p ^ q)) == 0)
}

/// Rounded division by 255 for values up to 255 * 255.
#[inline(always)]
fn div255(v: u32) -> u8 {
    ((v + 128 + ((v + 128) >> 8)) >> 8) as u8
}
