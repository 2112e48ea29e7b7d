//! Terrain template identities and the tile block container

use super::{LandType, TILE_HEIGHT, TILE_SIZE, TILE_WIDTH};
use crate::error::LoadError;

/// Terrain template. Each one is a file of 24x24 tiles in the theater's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateType {
    Clear1,
    Water1,
    Water2,
    Shore1,
    Shore2,
    Shore3,
    Shore4,
    Shore5,
    Shore6,
    Shore7,
    Shore8,
    Cliff1,
    Cliff2,
    Road1,
    Road2,
    Road3,
    Rough1,
    Rough2,
}

impl TemplateType {
    pub const ALL: [TemplateType; 18] = [
        TemplateType::Clear1,
        TemplateType::Water1,
        TemplateType::Water2,
        TemplateType::Shore1,
        TemplateType::Shore2,
        TemplateType::Shore3,
        TemplateType::Shore4,
        TemplateType::Shore5,
        TemplateType::Shore6,
        TemplateType::Shore7,
        TemplateType::Shore8,
        TemplateType::Cliff1,
        TemplateType::Cliff2,
        TemplateType::Road1,
        TemplateType::Road2,
        TemplateType::Road3,
        TemplateType::Rough1,
        TemplateType::Rough2,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Base file name, without extension
    pub fn file_stem(self) -> &'static str {
        match self {
            TemplateType::Clear1 => "CLEAR1",
            TemplateType::Water1 => "W1",
            TemplateType::Water2 => "W2",
            TemplateType::Shore1 => "SH1",
            TemplateType::Shore2 => "SH2",
            TemplateType::Shore3 => "SH3",
            TemplateType::Shore4 => "SH4",
            TemplateType::Shore5 => "SH5",
            TemplateType::Shore6 => "SH6",
            TemplateType::Shore7 => "SH7",
            TemplateType::Shore8 => "SH8",
            TemplateType::Cliff1 => "CL1",
            TemplateType::Cliff2 => "CL2",
            TemplateType::Road1 => "RD01",
            TemplateType::Road2 => "RD02",
            TemplateType::Road3 => "RD03",
            TemplateType::Rough1 => "RG01",
            TemplateType::Rough2 => "RG02",
        }
    }

    /// Land class shared by every tile of the template
    pub fn land_type(self) -> LandType {
        match self {
            TemplateType::Water1 | TemplateType::Water2 => LandType::Water,
            TemplateType::Shore1
            | TemplateType::Shore2
            | TemplateType::Shore3
            | TemplateType::Shore4
            | TemplateType::Shore5
            | TemplateType::Shore6
            | TemplateType::Shore7
            | TemplateType::Shore8 => LandType::Beach,
            TemplateType::Cliff1 | TemplateType::Cliff2 => LandType::Rock,
            TemplateType::Road1 | TemplateType::Road2 | TemplateType::Road3 => LandType::Road,
            TemplateType::Rough1 | TemplateType::Rough2 => LandType::Rough,
            TemplateType::Clear1 => LandType::Clear,
        }
    }
}

// ============================================================================
// TemplateData
// ============================================================================

pub const TEMPLATE_HEADER_SIZE: usize = 8;

/// Every tile of one template, materialized at load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateData {
    pub template: TemplateType,
    pub tile_count: usize,
    /// `tile_count * TILE_SIZE` bytes
    pub pixels: Vec<u8>,
    pub land: Vec<LandType>,
}

#[inline]
fn read_u16(data: &[u8], at: usize) -> usize {
    u16::from_le_bytes([data[at], data[at + 1]]) as usize
}

impl TemplateData {
    /// Parse a template file.
    ///
    /// Headed form: width u16, height u16, count u16, reserved u16, an
    /// optional table of `count` u32 offsets, then `count` tile blocks.
    /// Anything else is treated as bare concatenated tile blocks.
    pub fn parse(template: TemplateType, data: &[u8]) -> Result<Self, LoadError> {
        let tiles = Self::headed_tiles(data).unwrap_or(data);
        let tile_count = tiles.len() / TILE_SIZE;
        if tile_count == 0 {
            return Err(LoadError::Truncated {
                expected: TILE_SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            template,
            tile_count,
            pixels: tiles[..tile_count * TILE_SIZE].to_vec(),
            land: vec![template.land_type(); tile_count],
        })
    }

    fn headed_tiles(data: &[u8]) -> Option<&[u8]> {
        if data.len() < TEMPLATE_HEADER_SIZE {
            return None;
        }
        let (w, h, count) = (read_u16(data, 0), read_u16(data, 2), read_u16(data, 4));
        if w != TILE_WIDTH as usize || h != TILE_HEIGHT as usize || count == 0 {
            return None;
        }
        let body = count * TILE_SIZE;
        let with_table = TEMPLATE_HEADER_SIZE + count * 4;
        if data.len() >= with_table + body {
            Some(&data[with_table..with_table + body])
        } else if data.len() >= TEMPLATE_HEADER_SIZE + body {
            Some(&data[TEMPLATE_HEADER_SIZE..TEMPLATE_HEADER_SIZE + body])
        } else {
            None
        }
    }

    /// Pixels of tile `index`
    pub fn tile(&self, index: usize) -> Option<&[u8]> {
        if index >= self.tile_count {
            return None;
        }
        Some(&self.pixels[index * TILE_SIZE..(index + 1) * TILE_SIZE])
    }

    /// Land class of tile `index`, clear when out of range
    pub fn land_type(&self, index: usize) -> LandType {
        self.land.get(index).copied().unwrap_or(LandType::Clear)
    }

    /// Bytes held by this template
    pub fn memory_size(&self) -> usize {
        self.pixels.len() + self.land.len() * std::mem::size_of::<LandType>()
    }
}
