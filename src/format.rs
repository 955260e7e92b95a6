//! Pixel format descriptors and the format registry.
//!
//! A [`PixelFormat`] names one memory layout for a row of pixels. Packed
//! formats store one `u32` per pixel; interleaved formats store one `u8` per
//! channel. Every format carries a stable numeric code (matching the common
//! raster type constants where one exists) and a unique name.
//!
//! The descriptors themselves are plain `const` data. [`FormatRegistry`] is
//! the lookup table from codes and names back to formats; it is built once,
//! validated for duplicates, and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{PixelError, Result};

/// Storage type of one sample in a row buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// One packed `u32` per pixel.
    Int,
    /// One `u8` per channel.
    Byte,
}

/// How a format represents transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alpha {
    /// No alpha channel; pixels read as opaque.
    None,
    /// Color channels are independent of alpha.
    Straight,
    /// Color channels are pre-scaled by alpha.
    Premultiplied,
    /// Alpha comes from a palette entry.
    Palette,
}

/// Where each channel lives inside one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Layout {
    Int(IntLayout),
    Byte(ByteLayout),
}

/// Bit shifts of each channel inside a packed `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IntLayout {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteLayout {
    /// Byte offsets of each channel inside one pixel.
    Interleaved {
        r: usize,
        g: usize,
        b: usize,
        a: Option<usize>,
    },
    Gray,
    Indexed,
}

/// Every pixel layout this crate can iterate over and convert between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PixelFormat {
    /// `0x00RRGGBB`; the top byte is ignored.
    IntRgb,
    /// `0xAARRGGBB`.
    IntArgb,
    /// `0xAARRGGBB`, premultiplied.
    IntArgbPre,
    /// `0x00BBGGRR`.
    IntBgr,
    ByteBgr,
    ByteAbgr,
    ByteAbgrPre,
    /// Linear gray, one byte per pixel.
    ByteGray,
    /// One palette index per pixel.
    ByteIndexed,
    ByteBgra,
    ByteRgb,
    ByteArgb,
    ByteArgbPre,
    ByteRgba,
    ByteRgbaPre,
}

/// First code used for layouts with no host raster constant.
pub const CUSTOM_CODE_START: i32 = 100;

impl PixelFormat {
    /// All formats, in code order.
    pub const ALL: [PixelFormat; 15] = [
        PixelFormat::IntRgb,
        PixelFormat::IntArgb,
        PixelFormat::IntArgbPre,
        PixelFormat::IntBgr,
        PixelFormat::ByteBgr,
        PixelFormat::ByteAbgr,
        PixelFormat::ByteAbgrPre,
        PixelFormat::ByteGray,
        PixelFormat::ByteIndexed,
        PixelFormat::ByteBgra,
        PixelFormat::ByteRgb,
        PixelFormat::ByteArgb,
        PixelFormat::ByteArgbPre,
        PixelFormat::ByteRgba,
        PixelFormat::ByteRgbaPre,
    ];

    /// Stable numeric identity of this format.
    pub const fn code(self) -> i32 {
        match self {
            PixelFormat::IntRgb => 1,
            PixelFormat::IntArgb => 2,
            PixelFormat::IntArgbPre => 3,
            PixelFormat::IntBgr => 4,
            PixelFormat::ByteBgr => 5,
            PixelFormat::ByteAbgr => 6,
            PixelFormat::ByteAbgrPre => 7,
            PixelFormat::ByteGray => 10,
            PixelFormat::ByteIndexed => 13,
            PixelFormat::ByteBgra => CUSTOM_CODE_START,
            PixelFormat::ByteRgb => CUSTOM_CODE_START + 1,
            PixelFormat::ByteArgb => CUSTOM_CODE_START + 2,
            PixelFormat::ByteArgbPre => CUSTOM_CODE_START + 3,
            PixelFormat::ByteRgba => CUSTOM_CODE_START + 4,
            PixelFormat::ByteRgbaPre => CUSTOM_CODE_START + 5,
        }
    }

    /// Name like `"INT_ARGB_PRE"` or `"3BYTE_BGR"`.
    pub const fn name(self) -> &'static str {
        match self {
            PixelFormat::IntRgb => "INT_RGB",
            PixelFormat::IntArgb => "INT_ARGB",
            PixelFormat::IntArgbPre => "INT_ARGB_PRE",
            PixelFormat::IntBgr => "INT_BGR",
            PixelFormat::ByteBgr => "3BYTE_BGR",
            PixelFormat::ByteAbgr => "4BYTE_ABGR",
            PixelFormat::ByteAbgrPre => "4BYTE_ABGR_PRE",
            PixelFormat::ByteGray => "BYTE_GRAY",
            PixelFormat::ByteIndexed => "BYTE_INDEXED",
            PixelFormat::ByteBgra => "4BYTE_BGRA",
            PixelFormat::ByteRgb => "3BYTE_RGB",
            PixelFormat::ByteArgb => "4BYTE_ARGB",
            PixelFormat::ByteArgbPre => "4BYTE_ARGB_PRE",
            PixelFormat::ByteRgba => "4BYTE_RGBA",
            PixelFormat::ByteRgbaPre => "4BYTE_RGBA_PRE",
        }
    }

    pub const fn sample_kind(self) -> SampleKind {
        match self {
            PixelFormat::IntRgb
            | PixelFormat::IntArgb
            | PixelFormat::IntArgbPre
            | PixelFormat::IntBgr => SampleKind::Int,
            _ => SampleKind::Byte,
        }
    }

    pub const fn is_int(self) -> bool {
        matches!(self.sample_kind(), SampleKind::Int)
    }

    pub const fn is_byte(self) -> bool {
        !self.is_int()
    }

    /// Number of array elements used to store one pixel.
    ///
    /// 1 for packed formats, gray and indexed; 3 or 4 for interleaved color.
    pub const fn sample_count(self) -> usize {
        match self.layout() {
            Layout::Int(_) | Layout::Byte(ByteLayout::Gray | ByteLayout::Indexed) => 1,
            Layout::Byte(ByteLayout::Interleaved { a: None, .. }) => 3,
            Layout::Byte(ByteLayout::Interleaved { a: Some(_), .. }) => 4,
        }
    }

    pub const fn alpha(self) -> Alpha {
        match self {
            PixelFormat::IntArgb
            | PixelFormat::ByteAbgr
            | PixelFormat::ByteBgra
            | PixelFormat::ByteArgb
            | PixelFormat::ByteRgba => Alpha::Straight,
            PixelFormat::IntArgbPre
            | PixelFormat::ByteAbgrPre
            | PixelFormat::ByteArgbPre
            | PixelFormat::ByteRgbaPre => Alpha::Premultiplied,
            PixelFormat::ByteIndexed => Alpha::Palette,
            _ => Alpha::None,
        }
    }

    pub const fn has_alpha(self) -> bool {
        !matches!(self.alpha(), Alpha::None)
    }

    pub const fn is_premultiplied(self) -> bool {
        matches!(self.alpha(), Alpha::Premultiplied)
    }

    pub const fn is_opaque(self) -> bool {
        matches!(self.alpha(), Alpha::None)
    }

    /// True when the code mirrors a host raster type constant rather than a
    /// custom code from [`CUSTOM_CODE_START`] upwards.
    pub const fn is_platform_type(self) -> bool {
        self.code() < CUSTOM_CODE_START
    }

    pub(crate) const fn layout(self) -> Layout {
        const fn int(r: u32, g: u32, b: u32, a: Option<u32>) -> Layout {
            Layout::Int(IntLayout { r, g, b, a })
        }
        const fn bytes(r: usize, g: usize, b: usize, a: Option<usize>) -> Layout {
            Layout::Byte(ByteLayout::Interleaved { r, g, b, a })
        }
        match self {
            PixelFormat::IntRgb => int(16, 8, 0, None),
            PixelFormat::IntArgb | PixelFormat::IntArgbPre => int(16, 8, 0, Some(24)),
            PixelFormat::IntBgr => int(0, 8, 16, None),
            PixelFormat::ByteBgr => bytes(2, 1, 0, None),
            PixelFormat::ByteRgb => bytes(0, 1, 2, None),
            PixelFormat::ByteAbgr | PixelFormat::ByteAbgrPre => bytes(3, 2, 1, Some(0)),
            PixelFormat::ByteBgra => bytes(2, 1, 0, Some(3)),
            PixelFormat::ByteArgb | PixelFormat::ByteArgbPre => bytes(1, 2, 3, Some(0)),
            PixelFormat::ByteRgba | PixelFormat::ByteRgbaPre => bytes(0, 1, 2, Some(3)),
            PixelFormat::ByteGray => Layout::Byte(ByteLayout::Gray),
            PixelFormat::ByteIndexed => Layout::Byte(ByteLayout::Indexed),
        }
    }

    /// Descriptor used to populate a [`FormatRegistry`].
    pub const fn descriptor(self) -> FormatDescriptor {
        FormatDescriptor {
            format: self,
            code: self.code(),
            name: self.name(),
        }
    }

    /// Fails unless this format stores samples of type `S`.
    pub fn check_sample<S: Sample>(self) -> Result<()> {
        if self.sample_kind() == S::KIND {
            Ok(())
        } else {
            Err(PixelError::SampleKindMismatch {
                format: self.name(),
                expected: self.sample_kind(),
                actual: S::KIND,
            })
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u32 {}
}

/// A row buffer element: `u32` for packed formats, `u8` for interleaved ones.
pub trait Sample:
    sealed::Sealed + bytemuck::Pod + Default + fmt::Debug + PartialEq + Send + Sync + 'static
{
    const KIND: SampleKind;

    fn samples(row: &[Self]) -> Samples<'_>;

    fn samples_mut(row: &mut [Self]) -> SamplesMut<'_>;
}

impl Sample for u8 {
    const KIND: SampleKind = SampleKind::Byte;

    fn samples(row: &[u8]) -> Samples<'_> {
        Samples::Byte(row)
    }

    fn samples_mut(row: &mut [u8]) -> SamplesMut<'_> {
        SamplesMut::Byte(row)
    }
}

impl Sample for u32 {
    const KIND: SampleKind = SampleKind::Int;

    fn samples(row: &[u32]) -> Samples<'_> {
        Samples::Int(row)
    }

    fn samples_mut(row: &mut [u32]) -> SamplesMut<'_> {
        SamplesMut::Int(row)
    }
}

/// Type-erased view of a row buffer.
#[derive(Debug, Clone, Copy)]
pub enum Samples<'a> {
    Int(&'a [u32]),
    Byte(&'a [u8]),
}

/// Type-erased mutable view of a row buffer.
#[derive(Debug)]
pub enum SamplesMut<'a> {
    Int(&'a mut [u32]),
    Byte(&'a mut [u8]),
}

impl Samples<'_> {
    pub fn kind(&self) -> SampleKind {
        match self {
            Samples::Int(_) => SampleKind::Int,
            Samples::Byte(_) => SampleKind::Byte,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::Int(s) => s.len(),
            Samples::Byte(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SamplesMut<'_> {
    pub fn kind(&self) -> SampleKind {
        match self {
            SamplesMut::Int(_) => SampleKind::Int,
            SamplesMut::Byte(_) => SampleKind::Byte,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SamplesMut::Int(s) => s.len(),
            SamplesMut::Byte(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One registry entry: a format and the identity it is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub format: PixelFormat,
    pub code: i32,
    pub name: &'static str,
}

/// Immutable catalogue of pixel formats, keyed by code and by name.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    by_code: BTreeMap<i32, FormatDescriptor>,
    by_name: BTreeMap<&'static str, FormatDescriptor>,
}

/// Host raster constants that have no [`PixelFormat`] but still have a name.
const UNSUPPORTED_PLATFORM_TYPES: [(i32, &str); 5] = [
    (0, "CUSTOM"),
    (8, "USHORT_565_RGB"),
    (9, "USHORT_555_RGB"),
    (11, "USHORT_GRAY"),
    (12, "BYTE_BINARY"),
];

static STANDARD: LazyLock<FormatRegistry> = LazyLock::new(|| {
    FormatRegistry::new(PixelFormat::ALL.map(PixelFormat::descriptor))
        .unwrap_or_else(|e| panic!("built-in pixel formats are inconsistent: {e}"))
});

impl FormatRegistry {
    /// Build a registry, rejecting any repeated code or name.
    pub fn new(descriptors: impl IntoIterator<Item = FormatDescriptor>) -> Result<Self> {
        let mut by_code = BTreeMap::new();
        let mut by_name = BTreeMap::new();
        for d in descriptors {
            if by_name.insert(d.name, d).is_some() {
                return Err(PixelError::DuplicateFormat {
                    what: "name",
                    value: d.name.to_string(),
                });
            }
            if by_code.insert(d.code, d).is_some() {
                return Err(PixelError::DuplicateFormat {
                    what: "code",
                    value: d.code.to_string(),
                });
            }
        }
        Ok(Self { by_code, by_name })
    }

    /// The registry of every built-in [`PixelFormat`].
    pub fn standard() -> &'static FormatRegistry {
        &STANDARD
    }

    pub fn get(&self, code: i32) -> Option<PixelFormat> {
        self.by_code.get(&code).map(|d| d.format)
    }

    pub fn by_name(&self, name: &str) -> Option<PixelFormat> {
        self.by_name.get(name).map(|d| d.format)
    }

    /// Registered formats in code order, optionally only those mirroring a
    /// host raster constant.
    pub fn values(&self, only_platform: bool) -> Vec<PixelFormat> {
        self.by_code
            .values()
            .filter(|d| !only_platform || d.code < CUSTOM_CODE_START)
            .map(|d| d.format)
            .collect()
    }

    /// Human-readable name for any known code, including host raster types
    /// this crate cannot iterate over.
    pub fn describe(&self, code: i32) -> Result<&'static str> {
        if let Some(d) = self.by_code.get(&code) {
            return Ok(d.name);
        }
        UNSUPPORTED_PLATFORM_TYPES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
            .ok_or(PixelError::UnknownFormatCode(code))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_round_trips_codes_and_names() {
        let registry = FormatRegistry::standard();
        assert_eq!(registry.len(), PixelFormat::ALL.len());
        for format in PixelFormat::ALL {
            assert_eq!(registry.get(format.code()), Some(format));
            assert_eq!(registry.by_name(format.name()), Some(format));
        }
    }

    #[test]
    fn describe_names_platform_types() {
        let registry = FormatRegistry::standard();
        assert_eq!(registry.describe(2).unwrap(), "INT_ARGB");
        assert_eq!(registry.describe(5).unwrap(), "3BYTE_BGR");
        assert_eq!(registry.describe(10).unwrap(), "BYTE_GRAY");
        assert_eq!(registry.describe(8).unwrap(), "USHORT_565_RGB");
        assert_eq!(registry.describe(101).unwrap(), "3BYTE_RGB");
        assert_eq!(registry.describe(102).unwrap(), "4BYTE_ARGB");
        assert_eq!(registry.describe(100).unwrap(), "4BYTE_BGRA");
        assert_eq!(registry.describe(103).unwrap(), "4BYTE_ARGB_PRE");
        assert_eq!(
            registry.describe(-7),
            Err(PixelError::UnknownFormatCode(-7))
        );
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let err = FormatRegistry::new([
            PixelFormat::IntArgb.descriptor(),
            FormatDescriptor {
                format: PixelFormat::IntRgb,
                code: PixelFormat::IntArgb.code(),
                name: "SOMETHING_ELSE",
            },
        ])
        .unwrap_err();
        assert!(matches!(err, PixelError::DuplicateFormat { what: "code", .. }));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let err = FormatRegistry::new([
            PixelFormat::ByteRgb.descriptor(),
            FormatDescriptor {
                format: PixelFormat::ByteBgr,
                code: 999,
                name: "3BYTE_RGB",
            },
        ])
        .unwrap_err();
        assert!(matches!(err, PixelError::DuplicateFormat { what: "name", .. }));
    }

    #[test]
    fn platform_filter() {
        let platform = FormatRegistry::standard().values(true);
        assert!(platform.contains(&PixelFormat::IntArgb));
        assert!(platform.contains(&PixelFormat::ByteIndexed));
        assert!(!platform.contains(&PixelFormat::ByteRgba));
        assert!(platform.iter().all(|f| f.is_platform_type()));
    }

    #[test]
    fn sample_counts() {
        assert_eq!(PixelFormat::IntArgb.sample_count(), 1);
        assert_eq!(PixelFormat::ByteGray.sample_count(), 1);
        assert_eq!(PixelFormat::ByteRgb.sample_count(), 3);
        assert_eq!(PixelFormat::ByteAbgrPre.sample_count(), 4);
        assert!(PixelFormat::IntBgr.is_int());
        assert!(PixelFormat::ByteIndexed.is_byte());
    }
}
