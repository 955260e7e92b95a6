use std::marker::PhantomData;

use crate::convert::{Argb, decode_row, encode_row};
use crate::error::{PixelError, Result};
use crate::format::{PixelFormat, Sample, SampleKind};
use crate::iter::{PixelIterator, check_dest};
use crate::palette::Palette;

/// Resamples a source iterator to a new size while streaming.
///
/// Each output pixel is the integer mean of the source box it covers, so
/// shrinking averages and enlarging replicates. Channels are averaged in the
/// source's own representation, premultiplied or not. Source rows are pulled
/// (or skipped) only when an output row needs them, and only the most recent
/// source row is kept.
///
/// The output keeps the source format when it stores `D` samples and is not
/// indexed. Otherwise rows come out as `INT_ARGB` for `u32` or `4BYTE_RGBA`
/// for `u8`, or their premultiplied forms for premultiplied sources.
pub struct ScalingIterator<I: PixelIterator, D: Sample = <I as PixelIterator>::Sample> {
    source: I,
    width: usize,
    height: usize,
    format: PixelFormat,
    x_spans: Vec<(usize, usize)>,
    src_row: Vec<I::Sample>,
    decoded: Vec<Argb>,
    /// Index of the source row held in `decoded`.
    cached: Option<usize>,
    /// Source rows consumed so far.
    src_y: usize,
    y: usize,
    sums: Vec<[u64; 4]>,
    out: Vec<Argb>,
    _dest: PhantomData<fn() -> D>,
}

/// Source range `[s0, s1)` covered by destination index `d`.
fn span(d: usize, src: usize, dst: usize) -> (usize, usize) {
    let s0 = d * src / dst;
    let s1 = ((d + 1) * src / dst).max(s0 + 1);
    (s0, s1)
}

fn output_format(source: PixelFormat, kind: SampleKind) -> PixelFormat {
    if source != PixelFormat::ByteIndexed && source.sample_kind() == kind {
        return source;
    }
    match (kind, source.is_premultiplied()) {
        (SampleKind::Int, false) => PixelFormat::IntArgb,
        (SampleKind::Int, true) => PixelFormat::IntArgbPre,
        (SampleKind::Byte, false) => PixelFormat::ByteRgba,
        (SampleKind::Byte, true) => PixelFormat::ByteRgbaPre,
    }
}

impl<I: PixelIterator, D: Sample> ScalingIterator<I, D> {
    pub fn new(source: I, width: usize, height: usize) -> Result<Self> {
        let (src_w, src_h) = (source.width(), source.height());
        if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
            return Err(PixelError::InvalidLayout(format!(
                "cannot scale {src_w}x{src_h} to {width}x{height}"
            )));
        }
        let from = source.format();
        if from == PixelFormat::ByteIndexed && source.palette().is_none() {
            return Err(PixelError::MissingPalette);
        }
        Ok(Self {
            format: output_format(from, D::KIND),
            x_spans: (0..width).map(|x| span(x, src_w, width)).collect(),
            src_row: vec![I::Sample::default(); source.minimum_row_len()],
            decoded: vec![Argb::default(); src_w],
            cached: None,
            src_y: 0,
            y: 0,
            sums: vec![[0; 4]; width],
            out: vec![Argb::default(); width],
            source,
            width,
            height,
            _dest: PhantomData,
        })
    }

    /// Scale both dimensions by `ratio`, rounding and keeping at least one
    /// pixel.
    pub fn with_ratio(source: I, ratio: f64) -> Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(PixelError::InvalidLayout(format!(
                "scale ratio must be positive, got {ratio}"
            )));
        }
        let scale = |n: usize| ((n as f64 * ratio).round() as usize).max(1);
        let (w, h) = (scale(source.width()), scale(source.height()));
        Self::new(source, w, h)
    }

    /// Scale to the largest size that fits inside `max_width` x `max_height`
    /// while keeping the source's aspect ratio. The tighter dimension lands
    /// exactly on its limit; the other is truncated, but never below one
    /// pixel. Smaller sources are enlarged to fill the box.
    pub fn fit_within(source: I, max_width: usize, max_height: usize) -> Result<Self> {
        let (src_w, src_h) = (source.width(), source.height());
        if max_width == 0 || max_height == 0 || src_w == 0 || src_h == 0 {
            return Err(PixelError::InvalidLayout(format!(
                "cannot fit {src_w}x{src_h} within {max_width}x{max_height}"
            )));
        }
        // Compare max_w / src_w against max_h / src_h without division.
        let (mw, mh) = (max_width as u128, max_height as u128);
        let (sw, sh) = (src_w as u128, src_h as u128);
        let (w, h) = if mw * sh < mh * sw {
            (max_width, ((mw * sh / sw) as usize).max(1))
        } else {
            (((mh * sw / sh) as usize).max(1), max_height)
        };
        Self::new(source, w, h)
    }

    /// Make source row `y` the cached, decoded row.
    fn load(&mut self, y: usize) -> Result<()> {
        if self.cached == Some(y) {
            return Ok(());
        }
        while self.src_y < y {
            self.source.skip()?;
            self.src_y += 1;
        }
        self.source.next_row(&mut self.src_row)?;
        self.src_y += 1;
        decode_row(
            self.source.format(),
            <I::Sample as Sample>::samples(&self.src_row),
            self.source.palette(),
            &mut self.decoded,
        )?;
        self.cached = Some(y);
        Ok(())
    }
}

impl<I: PixelIterator, D: Sample> PixelIterator for ScalingIterator<I, D> {
    type Sample = D;

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn is_top_down(&self) -> bool {
        self.source.is_top_down()
    }

    fn is_done(&self) -> bool {
        self.y >= self.height
    }

    fn palette(&self) -> Option<&Palette> {
        None
    }

    fn skip(&mut self) -> Result<()> {
        if self.is_done() {
            return Err(PixelError::EndOfData);
        }
        self.y += 1;
        Ok(())
    }

    fn next_row(&mut self, dest: &mut [D]) -> Result<()> {
        check_dest(dest, self.minimum_row_len())?;
        if self.is_done() {
            return Err(PixelError::EndOfData);
        }
        let (y0, y1) = span(self.y, self.source.height(), self.height);
        self.sums.fill([0; 4]);
        for sy in y0..y1 {
            self.load(sy)?;
            for (sum, &(x0, x1)) in self.sums.iter_mut().zip(&self.x_spans) {
                for p in &self.decoded[x0..x1] {
                    sum[0] += u64::from(p.a);
                    sum[1] += u64::from(p.r);
                    sum[2] += u64::from(p.g);
                    sum[3] += u64::from(p.b);
                }
            }
        }
        let rows = (y1 - y0) as u64;
        for ((out, sum), &(x0, x1)) in self.out.iter_mut().zip(&self.sums).zip(&self.x_spans) {
            let n = rows * (x1 - x0) as u64;
            *out = Argb {
                a: (sum[0] / n) as u8,
                r: (sum[1] / n) as u8,
                g: (sum[2] / n) as u8,
                b: (sum[3] / n) as u8,
            };
        }
        encode_row(self.format, &self.out, D::samples_mut(dest))?;
        self.y += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayPixelIterator;
    use crate::iter::collect_rows;

    #[test]
    fn spans_cover_the_source() {
        assert_eq!(span(0, 4, 2), (0, 2));
        assert_eq!(span(1, 4, 2), (2, 4));
        assert_eq!(span(0, 2, 4), (0, 1));
        assert_eq!(span(1, 2, 4), (0, 1));
        assert_eq!(span(3, 2, 4), (1, 2));
        assert_eq!(span(2, 5, 3), (3, 5));
    }

    #[test]
    fn halves_by_box_average() {
        let gray = [0u8, 10, 20, 30, 40, 50, 60, 70];
        let src = ArrayPixelIterator::packed(&gray, 4, 2, PixelFormat::ByteGray).unwrap();
        let mut half: ScalingIterator<_> = ScalingIterator::new(src, 2, 1).unwrap();
        assert_eq!(half.format(), PixelFormat::ByteGray);
        // (0 + 10 + 40 + 50) / 4 and (20 + 30 + 60 + 70) / 4
        assert_eq!(collect_rows(&mut half).unwrap(), [25, 45]);
    }

    #[test]
    fn doubles_by_replication() {
        let argb = [0xFF00_0000u32, 0x80FF_FFFF];
        let src = ArrayPixelIterator::packed(&argb, 2, 1, PixelFormat::IntArgb).unwrap();
        let mut big: ScalingIterator<_> = ScalingIterator::with_ratio(src, 2.0).unwrap();
        assert_eq!((big.width(), big.height()), (4, 2));
        let a = 0xFF00_0000;
        let b = 0x80FF_FFFF;
        assert_eq!(collect_rows(&mut big).unwrap(), [a, a, b, b, a, a, b, b]);
    }

    #[test]
    fn skipping_output_rows_skips_source_rows() {
        let gray: Vec<u8> = (0..8).map(|y| y * 10).collect();
        let src = ArrayPixelIterator::packed(&gray, 1, 8, PixelFormat::ByteGray).unwrap();
        let mut quarter: ScalingIterator<_> = ScalingIterator::new(src, 1, 2).unwrap();
        quarter.skip().unwrap();
        let mut row = [0u8; 1];
        quarter.next_row(&mut row).unwrap();
        assert_eq!(row, [(40 + 50 + 60 + 70) / 4]);
        assert!(quarter.is_done());
        assert_eq!(quarter.next_row(&mut row), Err(PixelError::EndOfData));
    }

    #[test]
    fn indexed_source_becomes_argb() {
        let palette = Palette::from_argb(&[0xFF00_0000, 0xFFFF_FFFF]).unwrap();
        let idx = [0u8, 1];
        let src = ArrayPixelIterator::packed(&idx, 2, 1, PixelFormat::ByteIndexed)
            .unwrap()
            .with_palette(&palette);
        let mut one: ScalingIterator<_, u32> = ScalingIterator::new(src, 1, 1).unwrap();
        assert_eq!(one.format(), PixelFormat::IntArgb);
        assert_eq!(collect_rows(&mut one).unwrap(), [0xFF7F_7F7F]);
    }

    #[test]
    fn premultiplied_bytes_scaled_into_ints() {
        let rgba = [10u8, 20, 30, 40, 30, 40, 50, 60];
        let src = ArrayPixelIterator::packed(&rgba, 2, 1, PixelFormat::ByteRgbaPre).unwrap();
        let mut one: ScalingIterator<_, u32> = ScalingIterator::new(src, 1, 1).unwrap();
        assert_eq!(one.format(), PixelFormat::IntArgbPre);
        assert_eq!(collect_rows(&mut one).unwrap(), [0x3214_1E28]);
    }

    #[test]
    fn rejects_empty_sizes_and_bad_ratios() {
        let data = [0u32; 4];
        let src = ArrayPixelIterator::packed(&data, 2, 2, PixelFormat::IntRgb).unwrap();
        assert!(ScalingIterator::<_, u32>::new(src.clone(), 0, 1).is_err());
        assert!(ScalingIterator::<_, u32>::with_ratio(src.clone(), 0.0).is_err());
        assert!(ScalingIterator::<_, u32>::with_ratio(src.clone(), f64::NAN).is_err());
        assert!(ScalingIterator::<_, u32>::fit_within(src, 0, 4).is_err());
    }

    #[test]
    fn large_uniform_source_averages_without_overflow() {
        // 4200 * 4200 * 255 does not fit in a u32 accumulator.
        let side = 4200;
        let white = vec![255u8; side * side];
        let src = ArrayPixelIterator::packed(&white, side, side, PixelFormat::ByteGray).unwrap();
        let mut one: ScalingIterator<_> = ScalingIterator::new(src, 1, 1).unwrap();
        assert_eq!(collect_rows(&mut one).unwrap(), [255]);
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        let data = [0u8; 8 * 6];
        let src = ArrayPixelIterator::packed(&data, 8, 6, PixelFormat::ByteGray).unwrap();
        let fit: ScalingIterator<_> = ScalingIterator::fit_within(src.clone(), 4, 4).unwrap();
        assert_eq!((fit.width(), fit.height()), (4, 3));

        let fit: ScalingIterator<_> = ScalingIterator::fit_within(src.clone(), 100, 3).unwrap();
        assert_eq!((fit.width(), fit.height()), (4, 3));

        let fit: ScalingIterator<_> = ScalingIterator::fit_within(src, 100, 100).unwrap();
        assert_eq!((fit.width(), fit.height()), (100, 75));

        let strip = [0u8; 1000];
        let src = ArrayPixelIterator::packed(&strip, 1000, 1, PixelFormat::ByteGray).unwrap();
        let fit: ScalingIterator<_> = ScalingIterator::fit_within(src, 10, 10).unwrap();
        assert_eq!((fit.width(), fit.height()), (10, 1));
    }

    #[test]
    fn indexed_bytes_scale_into_rgba() {
        let palette = Palette::from_argb(&[0x8000_00FF]).unwrap();
        let idx = [0u8; 4];
        let src = ArrayPixelIterator::packed(&idx, 2, 2, PixelFormat::ByteIndexed)
            .unwrap()
            .with_palette(&palette);
        let mut one: ScalingIterator<_> = ScalingIterator::new(src, 1, 1).unwrap();
        assert_eq!(one.format(), PixelFormat::ByteRgba);
        assert_eq!(collect_rows(&mut one).unwrap(), [0, 0, 255, 128]);
    }
}
