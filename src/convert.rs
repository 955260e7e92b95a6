//! Row conversion between pixel formats.
//!
//! Every conversion first looks for a byte-order kernel from
//! [`crate::swizzle`] (channel reorders, alpha fill, 3↔4 byte expansion and
//! contraction). Anything else goes through a per-pixel decode into straight
//! or premultiplied ARGB, an optional alpha adjustment, and an encode into
//! the destination layout. Alpha arithmetic only happens when the two
//! formats disagree about premultiplication, so pure reorders are lossless.

use crate::error::{PixelError, Result};
use crate::format::{ByteLayout, IntLayout, Layout, PixelFormat, Sample, Samples, SamplesMut};
use crate::palette::{Palette, PaletteTables};
use crate::swizzle;

/// One pixel in channel form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Argb {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Scale a straight channel by alpha, rounding to nearest.
#[inline(always)]
pub fn premultiply(c: u8, a: u8) -> u8 {
    ((u32::from(c) * u32::from(a) + 127) / 255) as u8
}

/// Undo [`premultiply`]: `min(255, c * 255 / a)`. A zero alpha leaves the
/// channel untouched.
#[inline(always)]
pub fn unpremultiply(c: u8, a: u8) -> u8 {
    if a == 0 {
        c
    } else {
        (u32::from(c) * 255 / u32::from(a)).min(255) as u8
    }
}

/// Packed `0xAARRGGBB` premultiplied → straight.
pub fn unpremultiply_argb(v: u32) -> u32 {
    let [a, r, g, b] = v.to_be_bytes();
    u32::from_be_bytes([a, unpremultiply(r, a), unpremultiply(g, a), unpremultiply(b, a)])
}

/// Packed `0xAARRGGBB` straight → premultiplied.
pub fn premultiply_argb(v: u32) -> u32 {
    let [a, r, g, b] = v.to_be_bytes();
    u32::from_be_bytes([a, premultiply(r, a), premultiply(g, a), premultiply(b, a)])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlphaOp {
    Keep,
    Premultiply,
    Unpremultiply,
}

impl AlphaOp {
    fn between(from: PixelFormat, to: PixelFormat) -> Self {
        match (from.is_premultiplied(), to.is_premultiplied()) {
            (true, false) => AlphaOp::Unpremultiply,
            (false, true) if from.has_alpha() => AlphaOp::Premultiply,
            _ => AlphaOp::Keep,
        }
    }

    #[inline(always)]
    fn apply(self, c: Argb) -> Argb {
        match self {
            AlphaOp::Keep => c,
            AlphaOp::Premultiply => Argb {
                a: c.a,
                r: premultiply(c.r, c.a),
                g: premultiply(c.g, c.a),
                b: premultiply(c.b, c.a),
            },
            AlphaOp::Unpremultiply => Argb {
                a: c.a,
                r: unpremultiply(c.r, c.a),
                g: unpremultiply(c.g, c.a),
                b: unpremultiply(c.b, c.a),
            },
        }
    }
}

impl IntLayout {
    #[inline(always)]
    fn decode(self, v: u32) -> Argb {
        Argb {
            a: self.a.map_or(0xFF, |s| (v >> s) as u8),
            r: (v >> self.r) as u8,
            g: (v >> self.g) as u8,
            b: (v >> self.b) as u8,
        }
    }

    #[inline(always)]
    fn encode(self, c: Argb) -> u32 {
        (u32::from(c.r) << self.r)
            | (u32::from(c.g) << self.g)
            | (u32::from(c.b) << self.b)
            | self.a.map_or(0, |s| u32::from(c.a) << s)
    }
}

impl ByteLayout {
    #[inline(always)]
    fn decode(self, px: &[u8], tables: Option<&PaletteTables>) -> Argb {
        match self {
            ByteLayout::Interleaved { r, g, b, a } => Argb {
                a: a.map_or(0xFF, |i| px[i]),
                r: px[r],
                g: px[g],
                b: px[b],
            },
            ByteLayout::Gray => {
                let v = px[0];
                Argb {
                    a: 0xFF,
                    r: v,
                    g: v,
                    b: v,
                }
            }
            ByteLayout::Indexed => tables.map_or(
                Argb {
                    a: 0,
                    r: 0,
                    g: 0,
                    b: 0,
                },
                |t| t.lookup(px[0]),
            ),
        }
    }

    #[inline(always)]
    fn encode(self, c: Argb, px: &mut [u8]) {
        match self {
            ByteLayout::Interleaved { r, g, b, a } => {
                px[r] = c.r;
                px[g] = c.g;
                px[b] = c.b;
                if let Some(i) = a {
                    px[i] = c.a;
                }
            }
            ByteLayout::Gray => {
                px[0] = ((u32::from(c.r) + u32::from(c.g) + u32::from(c.b)) / 3) as u8;
            }
            // Indexed destinations are rejected before any row is touched.
            ByteLayout::Indexed => {}
        }
    }
}

// ===========================================================================
// Byte-order fast paths
// ===========================================================================

/// Memory byte pattern of a format, where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Rgba,
    Bgra,
    RgbaPre,
    BgraPre,
    Rgb,
    Bgr,
    /// Four bytes with an unused fourth byte.
    Rgbx,
    Bgrx,
    Gray,
}

fn byte_order(format: PixelFormat) -> Option<ByteOrder> {
    let little = cfg!(target_endian = "little");
    match format {
        PixelFormat::ByteRgba => Some(ByteOrder::Rgba),
        PixelFormat::ByteBgra => Some(ByteOrder::Bgra),
        PixelFormat::ByteRgbaPre => Some(ByteOrder::RgbaPre),
        PixelFormat::ByteRgb => Some(ByteOrder::Rgb),
        PixelFormat::ByteBgr => Some(ByteOrder::Bgr),
        PixelFormat::ByteGray => Some(ByteOrder::Gray),
        PixelFormat::IntArgb if little => Some(ByteOrder::Bgra),
        PixelFormat::IntArgbPre if little => Some(ByteOrder::BgraPre),
        PixelFormat::IntRgb if little => Some(ByteOrder::Bgrx),
        PixelFormat::IntBgr if little => Some(ByteOrder::Rgbx),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kernel {
    Copy,
    SwapBr,
    SwapRb3,
    RgbToRgba,
    RgbToBgra,
    DropAlpha,
    DropAlphaSwap,
    GrayExpand,
    CopyFillAlpha,
    SwapFillAlpha,
}

fn kernel(from: PixelFormat, to: PixelFormat) -> Option<Kernel> {
    use ByteOrder::*;
    if from == to {
        return Some(Kernel::Copy);
    }
    Some(match (byte_order(from)?, byte_order(to)?) {
        (a, b) if a == b => Kernel::Copy,
        (Rgba, Bgra) | (Bgra, Rgba) | (RgbaPre, BgraPre) | (BgraPre, RgbaPre) => Kernel::SwapBr,
        (Rgb, Bgr) | (Bgr, Rgb) => Kernel::SwapRb3,
        (Rgb, Rgba) | (Bgr, Bgra) => Kernel::RgbToRgba,
        (Rgb, Bgra) | (Bgr, Rgba) => Kernel::RgbToBgra,
        (Rgba | Rgbx, Rgb) | (Bgra | Bgrx, Bgr) => Kernel::DropAlpha,
        (Bgra | Bgrx, Rgb) | (Rgba | Rgbx, Bgr) => Kernel::DropAlphaSwap,
        (Gray, Rgba | Bgra) => Kernel::GrayExpand,
        (Bgrx, Bgra) | (Rgbx, Rgba) => Kernel::CopyFillAlpha,
        (Bgrx, Rgba) | (Rgbx, Bgra) => Kernel::SwapFillAlpha,
        _ => return None,
    })
}

fn as_bytes<'a>(s: Samples<'a>) -> &'a [u8] {
    match s {
        Samples::Int(s) => bytemuck::cast_slice(s),
        Samples::Byte(s) => s,
    }
}

fn as_bytes_mut<'a>(s: SamplesMut<'a>) -> &'a mut [u8] {
    match s {
        SamplesMut::Int(s) => bytemuck::cast_slice_mut(s),
        SamplesMut::Byte(s) => s,
    }
}

fn run_kernel(kernel: Kernel, src: &[u8], dst: &mut [u8]) -> Result<()> {
    match kernel {
        Kernel::Copy => dst.copy_from_slice(src),
        Kernel::SwapBr => swizzle::rgba_to_bgra(src, dst)?,
        Kernel::SwapRb3 => swizzle::rgb_to_bgr(src, dst)?,
        Kernel::RgbToRgba => swizzle::rgb_to_rgba(src, dst)?,
        Kernel::RgbToBgra => swizzle::rgb_to_bgra(src, dst)?,
        Kernel::DropAlpha => swizzle::rgba_to_rgb(src, dst)?,
        Kernel::DropAlphaSwap => swizzle::bgra_to_rgb(src, dst)?,
        Kernel::GrayExpand => swizzle::gray_to_rgba(src, dst)?,
        Kernel::CopyFillAlpha => {
            dst.copy_from_slice(src);
            swizzle::fill_alpha(dst)?;
        }
        Kernel::SwapFillAlpha => {
            swizzle::rgba_to_bgra(src, dst)?;
            swizzle::fill_alpha(dst)?;
        }
    }
    Ok(())
}

fn run_kernel_in_place(kernel: Kernel, row: &mut [u8]) -> Option<Result<()>> {
    let done = match kernel {
        Kernel::Copy => Ok(()),
        Kernel::SwapBr => swizzle::rgba_to_bgra_inplace(row),
        Kernel::SwapRb3 => swizzle::rgb_to_bgr_inplace(row),
        Kernel::CopyFillAlpha => swizzle::fill_alpha(row),
        Kernel::SwapFillAlpha => {
            swizzle::rgba_to_bgra_inplace(row).and_then(|()| swizzle::fill_alpha(row))
        }
        _ => return None,
    };
    Some(done.map_err(PixelError::from))
}

// ===========================================================================
// Validation
// ===========================================================================

fn check_pair(from: PixelFormat, to: PixelFormat, palette: Option<&Palette>) -> Result<()> {
    if to == PixelFormat::ByteIndexed && from != PixelFormat::ByteIndexed {
        return Err(PixelError::Unsupported {
            from: from.name(),
            to: to.name(),
        });
    }
    if from == PixelFormat::ByteIndexed && to != from && palette.is_none() {
        return Err(PixelError::MissingPalette);
    }
    Ok(())
}

fn row_len(format: PixelFormat, count: usize, actual: usize) -> Result<usize> {
    let required = count
        .checked_mul(format.sample_count())
        .ok_or_else(|| PixelError::InvalidLayout(format!("{count} pixels overflow a row")))?;
    if actual < required {
        return Err(PixelError::BufferTooSmall { required, actual });
    }
    Ok(required)
}

fn kind_mismatch(format: PixelFormat, actual: crate::format::SampleKind) -> PixelError {
    PixelError::SampleKindMismatch {
        format: format.name(),
        expected: format.sample_kind(),
        actual,
    }
}

// ===========================================================================
// Row conversion
// ===========================================================================

/// Convert `count` pixels from `src` (in `from`) into `dst` (in `to`).
///
/// `palette` is required when `from` is [`PixelFormat::ByteIndexed`].
/// Converting into `ByteIndexed` is only supported from `ByteIndexed`.
pub fn convert_row<S: Sample, D: Sample>(
    from: PixelFormat,
    src: &[S],
    to: PixelFormat,
    dst: &mut [D],
    count: usize,
    palette: Option<&Palette>,
) -> Result<()> {
    convert_samples(
        from,
        S::samples(src),
        to,
        D::samples_mut(dst),
        count,
        palette,
    )
}

/// Type-erased [`convert_row`].
pub fn convert_samples(
    from: PixelFormat,
    src: Samples<'_>,
    to: PixelFormat,
    dst: SamplesMut<'_>,
    count: usize,
    palette: Option<&Palette>,
) -> Result<()> {
    if src.kind() != from.sample_kind() {
        return Err(kind_mismatch(from, src.kind()));
    }
    if dst.kind() != to.sample_kind() {
        return Err(kind_mismatch(to, dst.kind()));
    }
    check_pair(from, to, palette)?;
    let src_len = row_len(from, count, src.len())?;
    let dst_len = row_len(to, count, dst.len())?;
    if count == 0 {
        return Ok(());
    }

    if let Some(k) = kernel(from, to) {
        let src = &as_bytes(src)[..src_len * size_of_kind(from)];
        let dst = &mut as_bytes_mut(dst)[..dst_len * size_of_kind(to)];
        return run_kernel(k, src, dst);
    }

    let op = AlphaOp::between(from, to);
    let tables = palette.map(Palette::tables);
    let (fc, tc) = (from.sample_count(), to.sample_count());
    match (from.layout(), src, to.layout(), dst) {
        (Layout::Int(fl), Samples::Int(s), Layout::Int(tl), SamplesMut::Int(d)) => {
            for (s, d) in s[..src_len].iter().zip(&mut d[..dst_len]) {
                *d = tl.encode(op.apply(fl.decode(*s)));
            }
        }
        (Layout::Int(fl), Samples::Int(s), Layout::Byte(tl), SamplesMut::Byte(d)) => {
            for (s, d) in s[..src_len].iter().zip(d[..dst_len].chunks_exact_mut(tc)) {
                tl.encode(op.apply(fl.decode(*s)), d);
            }
        }
        (Layout::Byte(fl), Samples::Byte(s), Layout::Int(tl), SamplesMut::Int(d)) => {
            for (s, d) in s[..src_len].chunks_exact(fc).zip(&mut d[..dst_len]) {
                *d = tl.encode(op.apply(fl.decode(s, tables)));
            }
        }
        (Layout::Byte(fl), Samples::Byte(s), Layout::Byte(tl), SamplesMut::Byte(d)) => {
            for (s, d) in s[..src_len]
                .chunks_exact(fc)
                .zip(d[..dst_len].chunks_exact_mut(tc))
            {
                tl.encode(op.apply(fl.decode(s, tables)), d);
            }
        }
        (_, src, _, _) => return Err(kind_mismatch(from, src.kind())),
    }
    Ok(())
}

fn size_of_kind(format: PixelFormat) -> usize {
    if format.is_int() { 4 } else { 1 }
}

/// Convert the first `count` pixels of `row` from `from` to `to` without a
/// second buffer.
///
/// Both formats must use the sample type `S` and the same number of samples
/// per pixel.
pub fn convert_row_in_place<S: Sample>(
    from: PixelFormat,
    to: PixelFormat,
    row: &mut [S],
    count: usize,
    palette: Option<&Palette>,
) -> Result<()> {
    from.check_sample::<S>()?;
    to.check_sample::<S>()?;
    check_pair(from, to, palette)?;
    if from.sample_count() != to.sample_count() {
        return Err(PixelError::Unsupported {
            from: from.name(),
            to: to.name(),
        });
    }
    let len = row_len(from, count, row.len())?;
    if count == 0 || from == to {
        return Ok(());
    }
    let row = &mut row[..len];

    if let Some(k) = kernel(from, to) {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(row);
        if let Some(done) = run_kernel_in_place(k, bytes) {
            return done;
        }
    }

    let op = AlphaOp::between(from, to);
    let tables = palette.map(Palette::tables);
    match (from.layout(), to.layout(), S::samples_mut(row)) {
        (Layout::Int(fl), Layout::Int(tl), SamplesMut::Int(row)) => {
            for v in row {
                *v = tl.encode(op.apply(fl.decode(*v)));
            }
        }
        (Layout::Byte(fl), Layout::Byte(tl), SamplesMut::Byte(row)) => {
            for px in row.chunks_exact_mut(from.sample_count()) {
                let c = fl.decode(px, tables);
                tl.encode(op.apply(c), px);
            }
        }
        (_, _, row) => return Err(kind_mismatch(from, row.kind())),
    }
    Ok(())
}

/// Decode the leading pixels of `src` into channel form, without any alpha
/// adjustment.
pub(crate) fn decode_row(
    format: PixelFormat,
    src: Samples<'_>,
    palette: Option<&Palette>,
    out: &mut [Argb],
) -> Result<()> {
    let tables = palette.map(Palette::tables);
    match (format.layout(), src) {
        (Layout::Int(l), Samples::Int(s)) => {
            for (p, v) in out.iter_mut().zip(s) {
                *p = l.decode(*v);
            }
        }
        (Layout::Byte(l), Samples::Byte(s)) => {
            for (p, px) in out.iter_mut().zip(s.chunks_exact(format.sample_count())) {
                *p = l.decode(px, tables);
            }
        }
        (_, src) => return Err(kind_mismatch(format, src.kind())),
    }
    Ok(())
}

/// Encode `pixels` into the front of `dst`, without any alpha adjustment.
pub(crate) fn encode_row(format: PixelFormat, pixels: &[Argb], dst: SamplesMut<'_>) -> Result<()> {
    match (format.layout(), dst) {
        (Layout::Int(l), SamplesMut::Int(d)) => {
            for (v, p) in d.iter_mut().zip(pixels) {
                *v = l.encode(*p);
            }
        }
        (Layout::Byte(l), SamplesMut::Byte(d)) => {
            for (px, p) in d.chunks_exact_mut(format.sample_count()).zip(pixels) {
                l.encode(*p, px);
            }
        }
        (_, dst) => return Err(kind_mismatch(format, dst.kind())),
    }
    Ok(())
}

impl PixelFormat {
    /// Convert `count` pixels of `src_format` data into this format.
    ///
    /// Reads from `src[src_offset..]` and writes to `dest[dest_offset..]`.
    /// When `dest` is `None` a buffer of `dest_offset + count * sample_count`
    /// samples is allocated; a supplied buffer that is too short is grown to
    /// that length. Indexed sources need a palette and go through
    /// [`convert_row`] instead.
    pub fn convert_from<S: Sample, D: Sample>(
        self,
        src_format: PixelFormat,
        src: &[S],
        src_offset: usize,
        dest: Option<Vec<D>>,
        dest_offset: usize,
        count: usize,
    ) -> Result<Vec<D>> {
        if src_format == PixelFormat::ByteIndexed {
            return Err(PixelError::Unsupported {
                from: src_format.name(),
                to: self.name(),
            });
        }
        src_format.check_sample::<S>()?;
        self.check_sample::<D>()?;
        let needed = count
            .checked_mul(self.sample_count())
            .and_then(|n| n.checked_add(dest_offset))
            .ok_or_else(|| PixelError::InvalidLayout(format!("{count} pixels overflow a row")))?;
        let mut dest = dest.unwrap_or_default();
        if dest.len() < needed {
            dest.resize(needed, D::default());
        }
        let src = src.get(src_offset..).ok_or(PixelError::BufferTooSmall {
            required: src_offset,
            actual: src.len(),
        })?;
        convert_row(src_format, src, self, &mut dest[dest_offset..], count, None)?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_argb<S: Sample>(format: PixelFormat, row: &[S], count: usize) -> Vec<u32> {
        let mut out = vec![0u32; count];
        convert_row(format, row, PixelFormat::IntArgb, &mut out, count, None).unwrap();
        out
    }

    #[test]
    fn unpremultiply_regressions() {
        assert_eq!(unpremultiply_argb(0xc3c3_c3c3), 0xc3ff_ffff);
        assert_eq!(unpremultiply_argb(0x5c5b_5c5b), 0x5cfc_fffc);
        assert_eq!(unpremultiply_argb(0x7471_7272), 0x74f8_fafa);
        assert_eq!(unpremultiply_argb(0x1413_1313), 0x14f2_f2f2);
        assert_eq!(unpremultiply_argb(0x0202_0201), 0x02ff_ff7f);
        assert_eq!(unpremultiply_argb(0x0403_0303), 0x04bf_bfbf);
        assert_eq!(unpremultiply_argb(0x0012_3456), 0x0012_3456);
    }

    #[test]
    fn premultiplied_row_unpremultiplies_through_converter() {
        let src = [0xc3c3_c3c3u32, 0x5c5b_5c5b, 0x7471_7272];
        let mut dst = [0u32; 3];
        convert_row(
            PixelFormat::IntArgbPre,
            &src,
            PixelFormat::IntArgb,
            &mut dst,
            3,
            None,
        )
        .unwrap();
        assert_eq!(dst, [0xc3ff_ffff, 0x5cfc_fffc, 0x74f8_fafa]);
    }

    #[test]
    fn premultiply_round_trip_is_bounded() {
        for a in 1..=255u8 {
            let tolerance = 1 + 128 / u32::from(a);
            for c in 0..=255u8 {
                let back = unpremultiply(premultiply(c, a), a);
                let diff = u32::from(c.abs_diff(back));
                assert!(diff <= tolerance, "c={c} a={a} back={back}");
                if a == 255 {
                    assert_eq!(back, c);
                }
            }
        }
    }

    #[test]
    fn opaque_black_to_abgr_pre() {
        let mut dst = [0u8; 4];
        convert_row(
            PixelFormat::IntArgb,
            &[0xFF00_0000u32],
            PixelFormat::ByteAbgrPre,
            &mut dst,
            1,
            None,
        )
        .unwrap();
        assert_eq!(dst, [0xFF, 0, 0, 0]);
    }

    #[test]
    fn every_byte_layout_decodes_to_the_same_argb() {
        let argb = [0x8011_2233u32, 0xFF44_5566, 0x0077_8899];
        for to in PixelFormat::ALL {
            if to.is_int() || to == PixelFormat::ByteIndexed || to.is_premultiplied() {
                continue;
            }
            let mut bytes = vec![0u8; 3 * to.sample_count()];
            convert_row(PixelFormat::IntArgb, &argb, to, &mut bytes, 3, None).unwrap();
            let back = to_argb(to, &bytes, 3);
            let expected: Vec<u32> = match to {
                PixelFormat::ByteGray => argb
                    .iter()
                    .map(|&v| {
                        let [_, r, g, b] = v.to_be_bytes();
                        let y = ((u32::from(r) + u32::from(g) + u32::from(b)) / 3) as u8;
                        u32::from_be_bytes([0xFF, y, y, y])
                    })
                    .collect(),
                f if f.is_opaque() => argb.iter().map(|v| v | 0xFF00_0000).collect(),
                _ => argb.to_vec(),
            };
            assert_eq!(back, expected, "{to}");
        }
    }

    #[test]
    fn int_rgb_is_written_with_a_zero_top_byte() {
        let mut dst = [0xFFFF_FFFFu32; 2];
        convert_row(
            PixelFormat::ByteRgb,
            &[1u8, 2, 3, 4, 5, 6],
            PixelFormat::IntRgb,
            &mut dst,
            2,
            None,
        )
        .unwrap();
        assert_eq!(dst, [0x0001_0203, 0x0004_0506]);

        let mut bgr = [0u32; 1];
        convert_row(
            PixelFormat::IntArgb,
            &[0x7F01_0203u32],
            PixelFormat::IntBgr,
            &mut bgr,
            1,
            None,
        )
        .unwrap();
        assert_eq!(bgr, [0x0003_0201]);
    }

    #[test]
    fn int_rgb_reads_as_opaque() {
        assert_eq!(
            to_argb(PixelFormat::IntRgb, &[0x0012_3456u32, 0xAB65_4321], 2),
            [0xFF12_3456, 0xFF65_4321]
        );
    }

    #[test]
    fn gray_row_expands_to_argb() {
        assert_eq!(
            to_argb(PixelFormat::ByteGray, &[0u8, 0x80, 0xFF], 3),
            [0xFF00_0000, 0xFF80_8080, 0xFFFF_FFFF]
        );
    }

    #[test]
    fn in_place_reorders() {
        let mut row = [1u8, 2, 3, 4, 5, 6, 7, 8];
        convert_row_in_place(PixelFormat::ByteRgba, PixelFormat::ByteArgb, &mut row, 2, None)
            .unwrap();
        assert_eq!(row, [4, 1, 2, 3, 8, 5, 6, 7]);
        convert_row_in_place(PixelFormat::ByteArgb, PixelFormat::ByteAbgr, &mut row, 2, None)
            .unwrap();
        assert_eq!(row, [4, 3, 2, 1, 8, 7, 6, 5]);

        let mut ints = [0x8040_2010u32];
        convert_row_in_place(PixelFormat::IntArgb, PixelFormat::IntArgbPre, &mut ints, 1, None)
            .unwrap();
        assert_eq!(ints, [premultiply_argb(0x8040_2010)]);
    }

    #[test]
    fn in_place_rejects_mismatched_sample_counts() {
        let mut row = [0u8; 12];
        let err =
            convert_row_in_place(PixelFormat::ByteRgb, PixelFormat::ByteRgba, &mut row, 3, None)
                .unwrap_err();
        assert!(matches!(err, PixelError::Unsupported { .. }));
    }

    #[test]
    fn indexed_needs_a_palette() {
        let mut dst = [0u32; 2];
        let err = convert_row(
            PixelFormat::ByteIndexed,
            &[0u8, 1],
            PixelFormat::IntArgb,
            &mut dst,
            2,
            None,
        )
        .unwrap_err();
        assert_eq!(err, PixelError::MissingPalette);

        let palette = Palette::from_argb(&[0xFF11_2233, 0x8044_5566]).unwrap();
        convert_row(
            PixelFormat::ByteIndexed,
            &[1u8, 0],
            PixelFormat::IntArgb,
            &mut dst,
            2,
            Some(&palette),
        )
        .unwrap();
        assert_eq!(dst, [0x8044_5566, 0xFF11_2233]);
    }

    #[test]
    fn cannot_convert_into_indexed() {
        let mut dst = [0u8; 1];
        let err = convert_row(
            PixelFormat::IntArgb,
            &[0u32],
            PixelFormat::ByteIndexed,
            &mut dst,
            1,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PixelError::Unsupported { .. }));
    }

    #[test]
    fn convert_from_allocates_and_validates() {
        let out: Vec<u8> = PixelFormat::ByteRgb
            .convert_from(PixelFormat::IntArgb, &[0u32, 0xFF01_0203], 1, None, 2, 1)
            .unwrap();
        assert_eq!(out, [0, 0, 1, 2, 3]);

        let err = PixelFormat::ByteRgb
            .convert_from::<u8, u8>(PixelFormat::ByteIndexed, &[0], 0, None, 0, 1)
            .unwrap_err();
        assert!(matches!(err, PixelError::Unsupported { .. }));

        let err = PixelFormat::ByteRgb
            .convert_from::<u32, u32>(PixelFormat::IntArgb, &[0], 0, None, 0, 1)
            .unwrap_err();
        assert!(matches!(err, PixelError::SampleKindMismatch { .. }));
    }

    #[test]
    fn short_buffers_are_reported() {
        let mut dst = [0u8; 5];
        let err = convert_row(
            PixelFormat::IntArgb,
            &[0u32, 0],
            PixelFormat::ByteRgb,
            &mut dst,
            2,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PixelError::BufferTooSmall {
                required: 6,
                actual: 5
            }
        );
    }
}
