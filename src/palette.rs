//! Color tables for [`PixelFormat::ByteIndexed`](crate::PixelFormat::ByteIndexed) rows.

use std::sync::OnceLock;

use crate::convert::Argb;
use crate::error::{PixelError, Result};

/// Up to 256 straight-alpha RGBA entries.
///
/// Index expansion goes through four 256-entry lookup tables that are built
/// on first use and cached for the life of the palette.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    entries: Vec<[u8; 4]>,
    tables: OnceLock<PaletteTables>,
}

#[derive(Debug, Clone)]
pub(crate) struct PaletteTables {
    red: [u8; 256],
    green: [u8; 256],
    blue: [u8; 256],
    alpha: [u8; 256],
}

impl PaletteTables {
    #[inline(always)]
    pub(crate) fn lookup(&self, index: u8) -> Argb {
        let i = usize::from(index);
        Argb {
            a: self.alpha[i],
            r: self.red[i],
            g: self.green[i],
            b: self.blue[i],
        }
    }
}

impl Palette {
    pub const MAX_LEN: usize = 256;

    /// Build a palette from `[r, g, b, a]` entries.
    pub fn new(entries: impl IntoIterator<Item = [u8; 4]>) -> Result<Self> {
        let entries: Vec<[u8; 4]> = entries.into_iter().collect();
        if entries.len() > Self::MAX_LEN {
            return Err(PixelError::InvalidLayout(format!(
                "palette has {} entries, at most {} are addressable",
                entries.len(),
                Self::MAX_LEN
            )));
        }
        Ok(Self {
            entries,
            tables: OnceLock::new(),
        })
    }

    /// Build a palette from packed `0xAARRGGBB` entries.
    pub fn from_argb(entries: &[u32]) -> Result<Self> {
        Self::new(entries.iter().map(|&v| {
            let [a, r, g, b] = v.to_be_bytes();
            [r, g, b, a]
        }))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `[r, g, b, a]` entry at `index`, if the palette has one.
    pub fn get(&self, index: u8) -> Option<[u8; 4]> {
        self.entries.get(usize::from(index)).copied()
    }

    pub fn entries(&self) -> &[[u8; 4]] {
        &self.entries
    }

    /// Lookup tables; indices past the end expand to transparent black.
    pub(crate) fn tables(&self) -> &PaletteTables {
        self.tables.get_or_init(|| {
            log::debug!("building lookup tables for a {}-entry palette", self.entries.len());
            let mut t = PaletteTables {
                red: [0; 256],
                green: [0; 256],
                blue: [0; 256],
                alpha: [0; 256],
            };
            for (i, &[r, g, b, a]) in self.entries.iter().enumerate() {
                t.red[i] = r;
                t.green[i] = g;
                t.blue[i] = b;
                t.alpha[i] = a;
            }
            t
        })
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Palette {}
