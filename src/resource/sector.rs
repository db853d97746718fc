//! CD sector geometry: logical (cooked) offsets → physical (raw) offsets.
//!
//! Optical images are stored either as cooked 2048-byte user-data sectors or
//! as raw sectors that wrap the same 2048 bytes in a sync/header/subheader
//! prefix and an EDC/ECC suffix.
//!
//! ## Layouts
//! ```text
//! cooked        [ 2048 user data ]
//! Mode 1 raw    [ 12 sync | 4 header ] [ 2048 user data ] [ 288 EDC/ECC ]     = 2352
//! Mode 2 Form 1 [ 12 sync | 4 header | 8 subheader ] [ 2048 ] [ 280 EDC/ECC ] = 2352
//! Mode 2 (2336) [ 8 subheader ] [ 2048 ] [ 280 EDC/ECC ]                      = 2336
//! raw + subcode [ 2352 raw sector ] [ 96 subchannel ]                         = 2448
//! ```

use super::{Resource, clamp};
use crate::{Error, Result};

/// Logical payload bytes per sector.
pub const PAYLOAD: u64 = 2048;

/// Physical layout of one sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorGeometry {
    sector_size: u32,
    header_size: u32,
}

impl SectorGeometry {
    /// 2048-byte user-data sectors; logical and physical offsets coincide.
    pub const COOKED: Self = Self {
        sector_size: 2048,
        header_size: 0,
    };
    /// Mode 1, 2352-byte raw sectors.
    pub const MODE1_RAW: Self = Self {
        sector_size: 2352,
        header_size: 16,
    };
    /// Mode 2 Form 1, 2352-byte raw sectors.
    pub const MODE2_FORM1_RAW: Self = Self {
        sector_size: 2352,
        header_size: 24,
    };
    /// Mode 2, 2336-byte sectors (no sync or header).
    pub const MODE2_2336: Self = Self {
        sector_size: 2336,
        header_size: 8,
    };

    /// Build a geometry, rejecting sector sizes we do not know how to
    /// interpret with [`Error::UnsupportedGeometry`].
    pub fn new(sector_size: u32, header_size: u32) -> Result<Self> {
        if !matches!(sector_size, 2048 | 2336 | 2352 | 2448)
            || u64::from(header_size) + PAYLOAD > u64::from(sector_size)
        {
            return Err(Error::UnsupportedGeometry { sector_size });
        }
        Ok(Self {
            sector_size,
            header_size,
        })
    }

    /// Geometry for a cue-sheet style track mode such as `MODE1/2352`.
    pub fn from_track_mode(mode: &str) -> Result<Self> {
        match mode.to_ascii_uppercase().as_str() {
            "MODE1/2048" | "MODE2/2048" => Ok(Self::COOKED),
            "MODE1/2352" => Ok(Self::MODE1_RAW),
            "MODE2/2352" | "CDI/2352" => Ok(Self::MODE2_FORM1_RAW),
            "MODE2/2336" | "CDI/2336" => Ok(Self::MODE2_2336),
            "MODE1/2448" => Self::new(2448, 16),
            "MODE2/2448" => Self::new(2448, 24),
            other => {
                let sector_size = other
                    .split_once('/')
                    .and_then(|(_, size)| size.parse().ok())
                    .unwrap_or(0);
                Err(Error::UnsupportedGeometry { sector_size })
            }
        }
    }

    /// Physical bytes per sector.
    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Bytes preceding the user data in each sector.
    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    /// Whether logical and physical offsets coincide.
    pub fn is_cooked(&self) -> bool {
        self.sector_size == 2048
    }

    /// Physical offset of the first payload byte of `sector`.
    #[inline]
    pub fn payload_offset(&self, sector: u64) -> u64 {
        sector * u64::from(self.sector_size) + u64::from(self.header_size)
    }
}

/// A [`Resource`] exposing the logical 2048-byte payload space of a track.
pub struct CookedView<R> {
    inner: R,
    geometry: SectorGeometry,
    /// Physical byte offset of the track's first sector inside `inner`.
    start: u64,
}

impl<R: Resource> CookedView<R> {
    pub fn new(inner: R, geometry: SectorGeometry) -> Self {
        Self::with_start(inner, geometry, 0)
    }

    /// View a track that begins `start` bytes into `inner`.
    pub fn with_start(inner: R, geometry: SectorGeometry, start: u64) -> Self {
        Self {
            inner,
            geometry,
            start,
        }
    }

    pub fn geometry(&self) -> SectorGeometry {
        self.geometry
    }

    fn physical(&self, sector: u64) -> u64 {
        self.start + self.geometry.payload_offset(sector)
    }
}

impl<R: Resource> Resource for CookedView<R> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn size(&self) -> u64 {
        let physical = self.inner.size().saturating_sub(self.start);
        if self.geometry.is_cooked() {
            physical
        } else {
            physical / u64::from(self.geometry.sector_size) * PAYLOAD
        }
    }

    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        if self.geometry.is_cooked() {
            return self.inner.read(self.start.saturating_add(seek_to), amount);
        }

        let amount = clamp(self.size(), seek_to, amount);
        if amount == 0 {
            return Ok(Vec::new());
        }

        let end = seek_to + amount as u64;
        let first = seek_to / PAYLOAD;
        let last = (end - 1) / PAYLOAD;
        let lead = seek_to % PAYLOAD;

        if first == last {
            return self.inner.read(self.physical(first) + lead, amount);
        }

        let mut out = Vec::with_capacity(amount);
        let head = self
            .inner
            .read(self.physical(first) + lead, (PAYLOAD - lead) as usize)?;
        let head_short = head.len() < (PAYLOAD - lead) as usize;
        out.extend_from_slice(&head);
        if head_short {
            return Ok(out);
        }

        for sector in first + 1..last {
            let chunk = self.inner.read(self.physical(sector), PAYLOAD as usize)?;
            let short = chunk.len() < PAYLOAD as usize;
            out.extend_from_slice(&chunk);
            if short {
                return Ok(out);
            }
        }

        let tail = (end - last * PAYLOAD) as usize;
        out.extend_from_slice(&self.inner.read(self.physical(last), tail)?);
        Ok(out)
    }
}
