//! Color remap tables derived from a palette by nearest-color search

use super::{Color, PALETTE_SIZE};
use std::ops::Deref;

/// First palette index of the house-color ramp
pub const HOUSE_REMAP_START: usize = 80;
/// Number of entries in the house-color ramp (80..=95)
pub const HOUSE_REMAP_COUNT: usize = 16;
pub const FADE_LEVELS: usize = 16;

// ============================================================================
// RemapTable
// ============================================================================

/// 256-entry index lookup. Entry 0 always maps to 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapTable([u8; PALETTE_SIZE]);

impl RemapTable {
    pub fn identity() -> Self {
        Self::from_fn(|i| i as u8)
    }

    /// Build from a per-index function; entry 0 is forced to 0
    pub fn from_fn(mut f: impl FnMut(usize) -> u8) -> Self {
        let mut table = [0u8; PALETTE_SIZE];
        for (i, entry) in table.iter_mut().enumerate().skip(1) {
            *entry = f(i);
        }
        Self(table)
    }

    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        self.0[index as usize]
    }

    #[inline]
    pub fn as_array(&self) -> &[u8; PALETTE_SIZE] {
        &self.0
    }
}

impl Default for RemapTable {
    fn default() -> Self {
        Self::identity()
    }
}

impl Deref for RemapTable {
    type Target = [u8; PALETTE_SIZE];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================================
// Nearest Color
// ============================================================================

/// Index of the palette entry nearest to `target` by squared RGB distance.
/// Ties resolve to the lowest index; index 0 is only returned if
/// `skip_zero` is false.
pub fn closest_color(palette: &[Color; PALETTE_SIZE], target: Color, skip_zero: bool) -> u8 {
    let start = usize::from(skip_zero);
    let mut best_index = start;
    let mut best_dist = u32::MAX;

    for (i, c) in palette.iter().enumerate().skip(start) {
        let dist = c.distance_sq(target);
        if dist < best_dist {
            best_dist = dist;
            best_index = i;
            if dist == 0 {
                break;
            }
        }
    }

    best_index as u8
}

// ============================================================================
// House Colors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HouseColor {
    Gold,
    LtBlue,
    Red,
    Green,
    Orange,
    Grey,
    Blue,
    Brown,
}

impl HouseColor {
    pub const ALL: [HouseColor; 8] = [
        HouseColor::Gold,
        HouseColor::LtBlue,
        HouseColor::Red,
        HouseColor::Green,
        HouseColor::Orange,
        HouseColor::Grey,
        HouseColor::Blue,
        HouseColor::Brown,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Fully lit hue of the ramp
    pub fn base_color(self) -> Color {
        match self {
            HouseColor::Gold => Color::new(255, 255, 0),
            HouseColor::LtBlue => Color::new(0, 160, 255),
            HouseColor::Red => Color::new(255, 0, 0),
            HouseColor::Green => Color::new(0, 200, 0),
            HouseColor::Orange => Color::new(255, 128, 0),
            HouseColor::Grey => Color::new(128, 128, 128),
            HouseColor::Blue => Color::new(0, 0, 255),
            HouseColor::Brown => Color::new(140, 80, 40),
        }
    }
}

/// Identity except for the house ramp, which is pulled toward the house hue
/// from 30% brightness (darkest) to full (lightest)
pub fn house_remap(palette: &[Color; PALETTE_SIZE], house: HouseColor) -> RemapTable {
    let base = house.base_color();
    let mut table = RemapTable::identity();
    for i in 0..HOUSE_REMAP_COUNT {
        let shade = i as f32 / (HOUSE_REMAP_COUNT - 1) as f32;
        let target = base.scaled(0.3 + 0.7 * shade);
        table.0[HOUSE_REMAP_START + i] = closest_color(palette, target, true);
    }
    table
}

// ============================================================================
// Shadow / Fade / Ghost
// ============================================================================

/// Darken every color by `intensity` (0 = unchanged, 1 = black)
pub fn shadow_table(palette: &[Color; PALETTE_SIZE], intensity: f32) -> RemapTable {
    let factor = 1.0 - intensity.clamp(0.0, 1.0);
    RemapTable::from_fn(|i| closest_color(palette, palette[i].scaled(factor), true))
}

/// Sixteen progressively darker tables, level 0 identity and level 15 black
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadeTables(Vec<RemapTable>);

impl FadeTables {
    pub fn generate(palette: &[Color; PALETTE_SIZE]) -> Self {
        let mut levels = Vec::with_capacity(FADE_LEVELS);
        levels.push(RemapTable::identity());
        for level in 1..FADE_LEVELS {
            let factor = 1.0 - level as f32 / (FADE_LEVELS - 1) as f32;
            levels.push(RemapTable::from_fn(|i| {
                closest_color(palette, palette[i].scaled(factor), true)
            }));
        }
        Self(levels)
    }

    /// Table for `level`, clamped to the darkest level
    pub fn level(&self, level: usize) -> &RemapTable {
        &self.0[level.min(FADE_LEVELS - 1)]
    }
}

impl Default for FadeTables {
    fn default() -> Self {
        Self(vec![RemapTable::identity(); FADE_LEVELS])
    }
}

/// Lighten each color halfway toward white
pub fn ghost_table(palette: &[Color; PALETTE_SIZE]) -> RemapTable {
    RemapTable::from_fn(|i| {
        let c = palette[i];
        let lighten = |v: u8| v + (255 - v) / 2;
        closest_color(palette, Color::new(lighten(c.r), lighten(c.g), lighten(c.b)), true)
    })
}

// ============================================================================
// RemapTables
// ============================================================================

/// Every standard table for one palette, rebuilt whenever the base palette
/// is replaced
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemapTables {
    pub identity: RemapTable,
    pub house: Vec<RemapTable>,
    pub shadow: RemapTable,
    pub fade: FadeTables,
    pub ghost: RemapTable,
}

impl RemapTables {
    pub fn generate(palette: &[Color; PALETTE_SIZE], shadow_intensity: f32) -> Self {
        Self {
            identity: RemapTable::identity(),
            house: HouseColor::ALL
                .iter()
                .map(|&h| house_remap(palette, h))
                .collect(),
            shadow: shadow_table(palette, shadow_intensity),
            fade: FadeTables::generate(palette),
            ghost: ghost_table(palette),
        }
    }

    pub fn house(&self, house: HouseColor) -> &RemapTable {
        self.house.get(house.index()).unwrap_or(&self.identity)
    }

    /// Remap for a player slot. Single player: 0 is gold, 1 is red, anyone
    /// else keeps their colors. Multiplayer: slot N uses house N.
    pub fn player(&self, player: usize, multiplayer: bool) -> &RemapTable {
        let house = if multiplayer {
            HouseColor::from_index(player)
        } else {
            match player {
                0 => Some(HouseColor::Gold),
                1 => Some(HouseColor::Red),
                _ => None,
            }
        };
        house.map_or(&self.identity, |h| self.house(h))
    }
}
