//! Row-level byte swizzles on interleaved 8-bit pixels.
//!
//! Each function checks that the row holds whole pixels and that the
//! destination is large enough, then dispatches to AVX2 when available.

// ---------------------------------------------------------------------------
// Byte-order row kernels used by the converter fast paths.
//
// #[rite] row functions hold the AVX2 loops; #[arcane] wrappers are the
// incant! dispatch targets. Kernels that only run scalar skip the token.
// ---------------------------------------------------------------------------

use crate::error::SizeError;
use archmage::incant;
use archmage::prelude::*;

// ===========================================================================
// Validation helpers
// ===========================================================================

#[inline]
fn check_inplace(len: usize, bpp: usize) -> Result<(), SizeError> {
    if len == 0 || len % bpp != 0 {
        Err(SizeError::NotPixelAligned)
    } else {
        Ok(())
    }
}

#[inline]
fn check_copy(
    src_len: usize,
    src_bpp: usize,
    dst_len: usize,
    dst_bpp: usize,
) -> Result<(), SizeError> {
    if src_len == 0 || src_len % src_bpp != 0 {
        return Err(SizeError::NotPixelAligned);
    }
    if dst_len < (src_len / src_bpp) * dst_bpp {
        return Err(SizeError::PixelCountMismatch);
    }
    Ok(())
}

// ===========================================================================
// SIMD constants
// ===========================================================================

#[cfg(target_arch = "x86_64")]
const BR_SHUF_MASK_AVX: [i8; 32] = [
    2, 1, 0, 3, 6, 5, 4, 7, 10, 9, 8, 11, 14, 13, 12, 15, 2, 1, 0, 3, 6, 5, 4, 7, 10, 9, 8, 11, 14,
    13, 12, 15,
];

#[cfg(target_arch = "x86_64")]
const ALPHA_FF_MASK_AVX: [i8; 32] = [
    0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, -1, 0,
    0, 0, -1,
];

#[cfg(target_arch = "x86_64")]
const GRAY_EXPAND_MASK_AVX: [i8; 32] = [
    0, 0, 0, -128, 1, 1, 1, -128, 2, 2, 2, -128, 3, 3, 3, -128, 4, 4, 4, -128, 5, 5, 5, -128, 6, 6,
    6, -128, 7, 7, 7, -128,
];

#[cfg(target_arch = "x86_64")]
const RGB_TO_BGRA_SHUF_AVX: [i8; 32] = [
    2, 1, 0, -128, 5, 4, 3, -128, 8, 7, 6, -128, 11, 10, 9, -128, 2, 1, 0, -128, 5, 4, 3, -128, 8,
    7, 6, -128, 11, 10, 9, -128,
];

#[cfg(target_arch = "x86_64")]
const RGB_TO_RGBA_SHUF_AVX: [i8; 32] = [
    0, 1, 2, -128, 3, 4, 5, -128, 6, 7, 8, -128, 9, 10, 11, -128, 0, 1, 2, -128, 3, 4, 5, -128, 6,
    7, 8, -128, 9, 10, 11, -128,
];

// Moves the second 12-byte group of a 24-byte load up into the high lane.
#[cfg(target_arch = "x86_64")]
const RGB_ALIGN_PERM_AVX: [i8; 32] = [
    0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 5, 0, 0, 0, 6, 0, 0, 0,
];

// ===========================================================================
// Scalar row implementations
// ===========================================================================

fn swap_br_row_scalar(_token: ScalarToken, row: &mut [u8]) {
    for px in row.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

fn copy_swap_br_row_scalar(_token: ScalarToken, src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
    }
}

fn fill_alpha_row_scalar(_token: ScalarToken, row: &mut [u8]) {
    for px in row.chunks_exact_mut(4) {
        px[3] = 0xFF;
    }
}

fn rgb_to_bgra_row_scalar(_token: ScalarToken, src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
        d.copy_from_slice(&[s[2], s[1], s[0], 0xFF]);
    }
}

fn rgb_to_rgba_row_scalar(_token: ScalarToken, src: &[u8], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
        d.copy_from_slice(&[s[0], s[1], s[2], 0xFF]);
    }
}

fn gray_to_4bpp_row_scalar(_token: ScalarToken, src: &[u8], dst: &mut [u8]) {
    for (&v, d) in src.iter().zip(dst.chunks_exact_mut(4)) {
        d.copy_from_slice(&[v, v, v, 0xFF]);
    }
}

// ===========================================================================
// Scalar contiguous wrappers (dispatch targets for incant!)
// ===========================================================================

fn swap_br_impl_scalar(t: ScalarToken, b: &mut [u8]) {
    swap_br_row_scalar(t, b);
}
fn copy_swap_br_impl_scalar(t: ScalarToken, s: &[u8], d: &mut [u8]) {
    copy_swap_br_row_scalar(t, s, d);
}
fn fill_alpha_impl_scalar(t: ScalarToken, b: &mut [u8]) {
    fill_alpha_row_scalar(t, b);
}
fn rgb_to_bgra_impl_scalar(t: ScalarToken, s: &[u8], d: &mut [u8]) {
    rgb_to_bgra_row_scalar(t, s, d);
}
fn rgb_to_rgba_impl_scalar(t: ScalarToken, s: &[u8], d: &mut [u8]) {
    rgb_to_rgba_row_scalar(t, s, d);
}
fn gray_to_4bpp_impl_scalar(t: ScalarToken, s: &[u8], d: &mut [u8]) {
    gray_to_4bpp_row_scalar(t, s, d);
}

// ===========================================================================
// x86-64 AVX2: rite row implementations
// ===========================================================================

#[cfg(target_arch = "x86_64")]
#[rite]
fn swap_br_row_v3(_token: X64V3Token, row: &mut [u8]) {
    let mask = _mm256_loadu_si256(&BR_SHUF_MASK_AVX);
    let (blocks, tail) = row.as_chunks_mut::<32>();
    for block in blocks {
        let v = _mm256_loadu_si256(&*block);
        let shuffled = _mm256_shuffle_epi8(v, mask);
        _mm256_storeu_si256(block, shuffled);
    }
    for px in tail.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

#[cfg(target_arch = "x86_64")]
#[rite]
fn copy_swap_br_row_v3(_token: X64V3Token, src: &[u8], dst: &mut [u8]) {
    let mask = _mm256_loadu_si256(&BR_SHUF_MASK_AVX);
    let (src_blocks, src_tail) = src.as_chunks::<32>();
    // Callers pass equal lengths, so blocks and tails line up.
    let (dst_blocks, dst_tail) = dst.as_chunks_mut::<32>();
    for (s, d) in src_blocks.iter().zip(dst_blocks.iter_mut()) {
        let v = _mm256_loadu_si256(s);
        let shuffled = _mm256_shuffle_epi8(v, mask);
        _mm256_storeu_si256(d, shuffled);
    }
    for (s, d) in src_tail.chunks_exact(4).zip(dst_tail.chunks_exact_mut(4)) {
        d.copy_from_slice(&[s[2], s[1], s[0], s[3]]);
    }
}

#[cfg(target_arch = "x86_64")]
#[rite]
fn fill_alpha_row_v3(_token: X64V3Token, row: &mut [u8]) {
    let alpha = _mm256_loadu_si256(&ALPHA_FF_MASK_AVX);
    let (blocks, tail) = row.as_chunks_mut::<32>();
    for block in blocks {
        let v = _mm256_loadu_si256(&*block);
        let result = _mm256_or_si256(v, alpha);
        _mm256_storeu_si256(block, result);
    }
    for px in tail.chunks_exact_mut(4) {
        px[3] = 0xFF;
    }
}

#[cfg(target_arch = "x86_64")]
#[rite]
fn rgb_to_bgra_row_v3(_token: X64V3Token, src: &[u8], dst: &mut [u8]) {
    let perm = _mm256_loadu_si256(&RGB_ALIGN_PERM_AVX);
    let shuf = _mm256_loadu_si256(&RGB_TO_BGRA_SHUF_AVX);
    let alpha = _mm256_loadu_si256(&ALPHA_FF_MASK_AVX);
    let (mut is, mut id) = (0, 0);
    // Each step consumes 24 source bytes but loads 32.
    while let (Some(s), Some(d)) = (
        src.get(is..).and_then(|r| r.first_chunk::<32>()),
        dst.get_mut(id..).and_then(|r| r.first_chunk_mut::<32>()),
    ) {
        let rgb = _mm256_loadu_si256(s);
        let aligned = _mm256_permutevar8x32_epi32(rgb, perm);
        let bgr0 = _mm256_shuffle_epi8(aligned, shuf);
        _mm256_storeu_si256(d, _mm256_or_si256(bgr0, alpha));
        is += 24;
        id += 32;
    }
    for (s, d) in src[is..].chunks_exact(3).zip(dst[id..].chunks_exact_mut(4)) {
        d.copy_from_slice(&[s[2], s[1], s[0], 0xFF]);
    }
}

#[cfg(target_arch = "x86_64")]
#[rite]
fn rgb_to_rgba_row_v3(_token: X64V3Token, src: &[u8], dst: &mut [u8]) {
    let perm = _mm256_loadu_si256(&RGB_ALIGN_PERM_AVX);
    let shuf = _mm256_loadu_si256(&RGB_TO_RGBA_SHUF_AVX);
    let alpha = _mm256_loadu_si256(&ALPHA_FF_MASK_AVX);
    let (mut is, mut id) = (0, 0);
    while let (Some(s), Some(d)) = (
        src.get(is..).and_then(|r| r.first_chunk::<32>()),
        dst.get_mut(id..).and_then(|r| r.first_chunk_mut::<32>()),
    ) {
        let rgb = _mm256_loadu_si256(s);
        let aligned = _mm256_permutevar8x32_epi32(rgb, perm);
        let rgba0 = _mm256_shuffle_epi8(aligned, shuf);
        _mm256_storeu_si256(d, _mm256_or_si256(rgba0, alpha));
        is += 24;
        id += 32;
    }
    for (s, d) in src[is..].chunks_exact(3).zip(dst[id..].chunks_exact_mut(4)) {
        d.copy_from_slice(&[s[0], s[1], s[2], 0xFF]);
    }
}

#[cfg(target_arch = "x86_64")]
#[rite]
fn gray_to_4bpp_row_v3(_token: X64V3Token, src: &[u8], dst: &mut [u8]) {
    let expand = _mm256_loadu_si256(&GRAY_EXPAND_MASK_AVX);
    let alpha = _mm256_loadu_si256(&ALPHA_FF_MASK_AVX);
    let (mut is, mut id) = (0, 0);
    while let (Some(g), Some(d)) = (
        src.get(is..).and_then(|r| r.first_chunk::<8>()),
        dst.get_mut(id..).and_then(|r| r.first_chunk_mut::<32>()),
    ) {
        let grays = _mm256_set1_epi64x(u64::from_ne_bytes(*g) as i64);
        let expanded = _mm256_shuffle_epi8(grays, expand);
        _mm256_storeu_si256(d, _mm256_or_si256(expanded, alpha));
        is += 8;
        id += 32;
    }
    for (&v, d) in src[is..].iter().zip(dst[id..].chunks_exact_mut(4)) {
        d.copy_from_slice(&[v, v, v, 0xFF]);
    }
}

#[cfg(target_arch = "x86_64")]
#[arcane]
fn swap_br_impl_v3(t: X64V3Token, b: &mut [u8]) {
    swap_br_row_v3(t, b);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn copy_swap_br_impl_v3(t: X64V3Token, s: &[u8], d: &mut [u8]) {
    copy_swap_br_row_v3(t, s, d);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn fill_alpha_impl_v3(t: X64V3Token, b: &mut [u8]) {
    fill_alpha_row_v3(t, b);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn rgb_to_bgra_impl_v3(t: X64V3Token, s: &[u8], d: &mut [u8]) {
    rgb_to_bgra_row_v3(t, s, d);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn rgb_to_rgba_impl_v3(t: X64V3Token, s: &[u8], d: &mut [u8]) {
    rgb_to_rgba_row_v3(t, s, d);
}
#[cfg(target_arch = "x86_64")]
#[arcane]
fn gray_to_4bpp_impl_v3(t: X64V3Token, s: &[u8], d: &mut [u8]) {
    gray_to_4bpp_row_v3(t, s, d);
}

// ===========================================================================
// Public API: 4bpp
// ===========================================================================

/// Swap bytes 0 and 2 of every 4-byte pixel in place (RGBA↔BGRA).
pub fn rgba_to_bgra_inplace(buf: &mut [u8]) -> Result<(), SizeError> {
    check_inplace(buf.len(), 4)?;
    incant!(swap_br_impl(buf), [v3, scalar]);
    Ok(())
}

/// Copy 4-byte pixels, swapping bytes 0 and 2.
pub fn rgba_to_bgra(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 4, dst.len(), 4)?;
    let dst = &mut dst[..src.len()];
    incant!(copy_swap_br_impl(src, dst), [v3, scalar]);
    Ok(())
}

/// Set byte 3 of every 4-byte pixel to 255.
///
/// On little-endian targets this is also "make opaque" for packed
/// `0xAARRGGBB` words viewed as bytes.
pub fn fill_alpha(buf: &mut [u8]) -> Result<(), SizeError> {
    check_inplace(buf.len(), 4)?;
    incant!(fill_alpha_impl(buf), [v3, scalar]);
    Ok(())
}

/// RGB → BGRA with alpha 255.
pub fn rgb_to_bgra(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 3, dst.len(), 4)?;
    incant!(rgb_to_bgra_impl(src, dst), [v3, scalar]);
    Ok(())
}

/// RGB → RGBA with alpha 255.
pub fn rgb_to_rgba(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 3, dst.len(), 4)?;
    incant!(rgb_to_rgba_impl(src, dst), [v3, scalar]);
    Ok(())
}

/// Gray → RGBA (gray replicated into three channels, alpha 255). Also valid
/// for BGRA since the color channels are equal.
pub fn gray_to_rgba(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 1, dst.len(), 4)?;
    incant!(gray_to_4bpp_impl(src, dst), [v3, scalar]);
    Ok(())
}

// ===========================================================================
// Public API: 3bpp (scalar only)
// ===========================================================================

/// Swap bytes 0 and 2 of every 3-byte pixel in place (RGB↔BGR).
pub fn rgb_to_bgr_inplace(buf: &mut [u8]) -> Result<(), SizeError> {
    check_inplace(buf.len(), 3)?;
    for px in buf.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(())
}

/// Copy 3-byte pixels, swapping bytes 0 and 2.
pub fn rgb_to_bgr(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 3, dst.len(), 3)?;
    for (s, d) in src.chunks_exact(3).zip(dst.chunks_exact_mut(3)) {
        d.copy_from_slice(&[s[2], s[1], s[0]]);
    }
    Ok(())
}

/// RGBA → RGB, dropping byte 3.
pub fn rgba_to_rgb(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 4, dst.len(), 3)?;
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
        d.copy_from_slice(&s[..3]);
    }
    Ok(())
}

/// BGRA → RGB, dropping byte 3 and reversing the color bytes.
pub fn bgra_to_rgb(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 4, dst.len(), 3)?;
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(3)) {
        d.copy_from_slice(&[s[2], s[1], s[0]]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use archmage::testing::{CompileTimePolicy, for_each_token_permutation};

    fn policy() -> CompileTimePolicy {
        if std::env::var_os("CI").is_some() {
            CompileTimePolicy::Fail
        } else {
            CompileTimePolicy::WarnStderr
        }
    }

    fn make_bytes(n_pixels: usize, bpp: usize) -> Vec<u8> {
        (0..n_pixels * bpp).map(|i| (i % 251) as u8).collect()
    }

    fn ref_expand(src: &[u8], order: [usize; 3]) -> Vec<u8> {
        src.chunks_exact(3)
            .flat_map(|s| [s[order[0]], s[order[1]], s[order[2]], 0xFF])
            .collect()
    }

    const TEST_PIXEL_COUNTS: &[usize] = &[1, 2, 3, 7, 8, 15, 16, 31, 32, 33, 63, 64, 65, 100];

    #[test]
    fn permutation_swap_br() {
        let report = for_each_token_permutation(policy(), |perm| {
            for &n in TEST_PIXEL_COUNTS {
                let src = make_bytes(n, 4);
                let mut expected = src.clone();
                for px in expected.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }

                let mut inplace = src.clone();
                rgba_to_bgra_inplace(&mut inplace).unwrap();
                assert_eq!(inplace, expected, "inplace n={n} tier={perm}");

                let mut copied = vec![0u8; n * 4];
                rgba_to_bgra(&src, &mut copied).unwrap();
                assert_eq!(copied, expected, "copy n={n} tier={perm}");
            }
        });
        std::eprintln!("swap_br: {report}");
    }

    #[test]
    fn permutation_fill_alpha() {
        let report = for_each_token_permutation(policy(), |perm| {
            for &n in TEST_PIXEL_COUNTS {
                let mut data = make_bytes(n, 4);
                fill_alpha(&mut data).unwrap();
                assert!(
                    data.chunks_exact(4).all(|px| px[3] == 0xFF),
                    "fill_alpha n={n} tier={perm}"
                );
                assert_eq!(data[0], 0);
                if n > 1 {
                    assert_eq!(data[6], 6, "color bytes untouched n={n} tier={perm}");
                }
            }
        });
        std::eprintln!("fill_alpha: {report}");
    }

    #[test]
    fn permutation_rgb_expansion() {
        let report = for_each_token_permutation(policy(), |perm| {
            for &n in TEST_PIXEL_COUNTS {
                let src = make_bytes(n, 3);
                let mut dst = vec![0u8; n * 4];
                rgb_to_rgba(&src, &mut dst).unwrap();
                assert_eq!(dst, ref_expand(&src, [0, 1, 2]), "rgba n={n} tier={perm}");
                rgb_to_bgra(&src, &mut dst).unwrap();
                assert_eq!(dst, ref_expand(&src, [2, 1, 0]), "bgra n={n} tier={perm}");
            }
        });
        std::eprintln!("rgb_expansion: {report}");
    }

    #[test]
    fn permutation_gray_expansion() {
        let report = for_each_token_permutation(policy(), |perm| {
            for &n in TEST_PIXEL_COUNTS {
                let src = make_bytes(n, 1);
                let mut dst = vec![0u8; n * 4];
                gray_to_rgba(&src, &mut dst).unwrap();
                let expected: Vec<u8> = src.iter().flat_map(|&v| [v, v, v, 0xFF]).collect();
                assert_eq!(dst, expected, "gray n={n} tier={perm}");
            }
        });
        std::eprintln!("gray_expansion: {report}");
    }

    #[test]
    fn contraction_and_3bpp_swap() {
        let rgba = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut rgb = [0u8; 6];
        rgba_to_rgb(&rgba, &mut rgb).unwrap();
        assert_eq!(rgb, [1, 2, 3, 5, 6, 7]);
        bgra_to_rgb(&rgba, &mut rgb).unwrap();
        assert_eq!(rgb, [3, 2, 1, 7, 6, 5]);

        let mut bgr = [0u8; 6];
        rgb_to_bgr(&rgb, &mut bgr).unwrap();
        assert_eq!(bgr, [1, 2, 3, 5, 6, 7]);
        rgb_to_bgr_inplace(&mut bgr).unwrap();
        assert_eq!(bgr, rgb);
    }

    #[test]
    fn size_errors() {
        assert_eq!(fill_alpha(&mut []), Err(SizeError::NotPixelAligned));
        assert_eq!(
            rgba_to_bgra_inplace(&mut [0u8; 5]),
            Err(SizeError::NotPixelAligned)
        );
        assert_eq!(
            rgb_to_rgba(&[0u8; 6], &mut [0u8; 7]),
            Err(SizeError::PixelCountMismatch)
        );
    }
}
