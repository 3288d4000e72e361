//! Stochastic tile index maps: a grid of tile indices whose corner or edge
//! labels agree between neighbors and wrap around toroidally.

use image::{Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::packing::{self, CornerPacking};
use crate::Error;

/// Generates a resolution x resolution map whose red channel holds the tile
/// index for that cell. The seed fixes the whole label grid.
pub fn generate_index_map(
    resolution: u32,
    num_colors: u32,
    corner_tiles: bool,
    seed: u64,
) -> Result<RgbImage, Error> {
    if num_colors < 2 || num_colors > 4 {
        return Err(Error::InvalidNumColors(num_colors));
    }
    let mut rng = Pcg32::seed_from_u64(seed);
    if corner_tiles {
        corner_index_map(resolution, num_colors, &mut rng)
    } else {
        Ok(edge_index_map(resolution, num_colors, &mut rng))
    }
}

fn corner_index_map(
    resolution: u32,
    num_colors: u32,
    rng: &mut Pcg32,
) -> Result<RgbImage, Error> {
    let packing = CornerPacking::new(num_colors)?;
    let side = (resolution + 1) as usize;

    // corner labels on an (R+1)x(R+1) grid; the last row and column repeat
    // the first so the map tiles toroidally
    let mut corners = vec![0u32; side * side];
    for y in 0..resolution as usize {
        for x in 0..resolution as usize {
            corners[y * side + x] = rng.gen_range(0, num_colors);
        }
        corners[y * side + resolution as usize] = corners[y * side];
    }
    for x in 0..side {
        corners[resolution as usize * side + x] = corners[x];
    }

    let mut map = RgbImage::new(resolution, resolution);
    for y in 0..resolution as usize {
        for x in 0..resolution as usize {
            let cne = corners[(y + 1) * side + x + 1];
            let cse = corners[y * side + x + 1];
            let csw = corners[y * side + x];
            let cnw = corners[(y + 1) * side + x];
            let index = packing.tile_index(cne, cse, csw, cnw) as u8;
            map.put_pixel(x as u32, y as u32, Rgb([index, index, index]));
        }
    }
    Ok(map)
}

fn edge_index_map(resolution: u32, num_colors: u32, rng: &mut Pcg32) -> RgbImage {
    let mut map = RgbImage::new(resolution, resolution);

    // south labels of the current row; row 0's are remembered to close the
    // torus at the top
    let mut south = vec![0u32; resolution as usize];
    for label in south.iter_mut() {
        *label = rng.gen_range(0, num_colors);
    }
    let bottom = south.clone();

    for y in 0..resolution {
        let leftmost = rng.gen_range(0, num_colors);
        let mut west = leftmost;
        for x in 0..resolution {
            let north = if y == resolution - 1 {
                bottom[x as usize]
            } else {
                rng.gen_range(0, num_colors)
            };
            let east = if x == resolution - 1 {
                leftmost
            } else {
                rng.gen_range(0, num_colors)
            };
            let index =
                packing::edge_tile_index(num_colors, north, east, south[x as usize], west) as u8;
            map.put_pixel(x, y, Rgb([index, index, index]));
            south[x as usize] = north;
            west = east;
        }
    }
    map
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn corner_map_indices_stay_in_range_and_wrap() {
        let map = generate_index_map(4, 2, true, 5).unwrap();
        let packing = CornerPacking::new(2).unwrap();

        for pixel in map.pixels() {
            assert!(pixel[0] < 16);
        }

        // the shared corner label agrees at the four map corners by torus wrap
        let labels = |x: u32, y: u32| packing.labels_at(u32::from(map.get_pixel(x, y)[0]));
        let (_, _, csw, _) = labels(0, 0);
        let (_, cse, _, _) = labels(3, 0);
        let (_, _, _, cnw) = labels(0, 3);
        let (cne, _, _, _) = labels(3, 3);
        assert_eq!(csw, cse);
        assert_eq!(csw, cnw);
        assert_eq!(csw, cne);
    }

    #[test]
    fn corner_map_neighbors_share_corner_labels() {
        let map = generate_index_map(8, 2, true, 11).unwrap();
        let packing = CornerPacking::new(2).unwrap();
        let labels = |x: u32, y: u32| packing.labels_at(u32::from(map.get_pixel(x, y)[0]));

        for y in 0..8 {
            for x in 0..7 {
                let (cne, cse, _, _) = labels(x, y);
                let (_, _, right_csw, right_cnw) = labels(x + 1, y);
                assert_eq!(cne, right_cnw);
                assert_eq!(cse, right_csw);
            }
        }
    }

    #[test]
    fn edge_map_neighbors_share_edge_labels() {
        let num_colors = 3;
        let resolution = 6;
        let map = generate_index_map(resolution, num_colors, false, 23).unwrap();

        // recover (n, e, s, w) from a tile index through the pair code
        let mut decode = std::collections::HashMap::new();
        for n in 0..num_colors {
            for e in 0..num_colors {
                for s in 0..num_colors {
                    for w in 0..num_colors {
                        decode.insert(
                            packing::edge_tile_index(num_colors, n, e, s, w),
                            (n, e, s, w),
                        );
                    }
                }
            }
        }
        let labels = |x: u32, y: u32| decode[&u32::from(map.get_pixel(x, y)[0])];

        for y in 0..resolution {
            for x in 0..resolution {
                let (n, e, _, _) = labels(x, y);
                let (_, _, _, right_w) = labels((x + 1) % resolution, y);
                let (_, _, above_s, _) = labels(x, (y + 1) % resolution);
                assert_eq!(e, right_w, "east/west mismatch at ({}, {})", x, y);
                assert_eq!(n, above_s, "north/south mismatch at ({}, {})", x, y);
            }
        }
    }
}
