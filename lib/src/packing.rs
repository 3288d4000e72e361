//! Tile packing permutations: map a tile's corner or edge labels to its
//! linear index in the packed atlas grid.

use crate::Error;

// From Figure 9 of "An Alternative for Wang Tiles: Colored Edges versus
// Colored Corners". A tile is encoded as a base-4 number with 4 digits,
// C(NE) C(SE) C(SW) C(NW).
const REFERENCE_PACKING_TABLE: [u8; 16] = [
    0, 16, 68, 1, //
    64, 65, 81, 5, //
    17, 84, 85, 69, //
    4, 80, 21, 20,
];
const REFERENCE_PACKING_TABLE_SIZE: u32 = 4;

/// Corner-label packing, inverted from the reference table for a given
/// color count.
#[derive(Clone)]
pub(crate) struct CornerPacking {
    inv_table: [u16; 256],
    num_tiles: u32,
}

impl CornerPacking {
    pub fn new(num_colors: u32) -> Result<Self, Error> {
        let num_tiles = num_colors * num_colors;
        if REFERENCE_PACKING_TABLE_SIZE < num_tiles {
            return Err(Error::PackingTableTooSmall { num_colors });
        }
        let mut inv_table = [0u16; 256];
        for row in 0..num_tiles {
            for col in 0..num_tiles {
                let reference =
                    REFERENCE_PACKING_TABLE[(row * REFERENCE_PACKING_TABLE_SIZE + col) as usize];
                inv_table[reference as usize] = (row * num_tiles + col) as u16;
            }
        }
        Ok(Self {
            inv_table,
            num_tiles,
        })
    }

    pub fn num_tiles(&self) -> u32 {
        self.num_tiles
    }

    /// Linear tile index for the four corner labels.
    pub fn tile_index(&self, cne: u32, cse: u32, csw: u32, cnw: u32) -> u32 {
        u32::from(self.inv_table[((cne << 6) | (cse << 4) | (csw << 2) | cnw) as usize])
    }

    /// The corner labels packed at a given tile index, as (cne, cse, csw, cnw).
    pub fn labels_at(&self, tile_index: u32) -> (u32, u32, u32, u32) {
        let row = tile_index / self.num_tiles;
        let col = tile_index % self.num_tiles;
        let code = u32::from(
            REFERENCE_PACKING_TABLE[(row * REFERENCE_PACKING_TABLE_SIZE + col) as usize],
        );
        ((code >> 6) & 3, (code >> 4) & 3, (code >> 2) & 3, code & 3)
    }
}

/// Pair code over [0, num_colors)^2: a bijection onto [0, num_colors^2) that
/// groups identical-label pairs into a predictable prefix.
pub(crate) fn pair_index(a: u32, b: u32) -> u32 {
    if a == b {
        if b > 0 {
            (a + 1) * (a + 1) - 2
        } else {
            0
        }
    } else if a > b {
        if b > 0 {
            a * a + 2 * b - 1
        } else {
            (a + 1) * (a + 1) - 1
        }
    } else {
        2 * a + b * b
    }
}

/// Linear tile index for edge labels (north, east, south, west).
pub(crate) fn edge_tile_index(num_colors: u32, n: u32, e: u32, s: u32, w: u32) -> u32 {
    pair_index(s, n) * num_colors * num_colors + pair_index(w, e)
}
