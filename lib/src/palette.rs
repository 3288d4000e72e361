//! Reference palette for edge-labeled tile sets: one flat-shaded tile per
//! label combination, for eyeballing which atlas tile carries which colors.

use image::{Rgb, RgbImage};

use crate::packing;
use crate::{img, Error};

/// Fixed reference colors, one per edge label.
const REFERENCE_COLORS: [Rgb<u8>; 4] = [
    Rgb([230, 70, 60]),
    Rgb([80, 180, 90]),
    Rgb([70, 115, 225]),
    Rgb([240, 210, 85]),
];

#[inline]
fn ease(t: f32) -> f32 {
    (1.0 - (std::f32::consts::PI * t).cos()) * 0.5
}

/// Renders the palette: per tile, west-east and south-north color
/// interpolants with a cosine ease, blended by distance to the nearest
/// edges so each edge shows its own reference color.
pub fn generate_palette(
    resolution: u32,
    num_colors: u32,
    corner_tiles: bool,
) -> Result<RgbImage, Error> {
    if corner_tiles {
        return Err(Error::CornerPaletteUnsupported);
    }
    if num_colors < 2 || num_colors > 4 {
        return Err(Error::InvalidNumColors(num_colors));
    }
    let num_tiles = num_colors * num_colors;
    if resolution % num_tiles != 0 {
        return Err(Error::ResolutionMismatch {
            resolution,
            num_tiles,
        });
    }
    let tile = resolution / num_tiles;
    let span = (tile - 1).max(1) as f32;

    let mut palette = RgbImage::new(resolution, resolution);
    for n in 0..num_colors {
        for e in 0..num_colors {
            for s in 0..num_colors {
                for w in 0..num_colors {
                    let index = packing::edge_tile_index(num_colors, n, e, s, w);
                    let ox = (index % num_tiles) * tile;
                    let oy = (index / num_tiles) * tile;

                    let north = img::to_vec3(REFERENCE_COLORS[n as usize]);
                    let east = img::to_vec3(REFERENCE_COLORS[e as usize]);
                    let south = img::to_vec3(REFERENCE_COLORS[s as usize]);
                    let west = img::to_vec3(REFERENCE_COLORS[w as usize]);

                    for y in 0..tile {
                        for x in 0..tile {
                            let horizontal = img::lerp3(west, east, ease(x as f32 / span));
                            let vertical = img::lerp3(south, north, ease(y as f32 / span));

                            let dx = x.min(tile - 1 - x) as f32;
                            let dy = y.min(tile - 1 - y) as f32;
                            let weight = if dx + dy > 0.0 { dx / (dx + dy) } else { 0.5 };

                            let color = img::lerp3(horizontal, vertical, weight);
                            palette.put_pixel(ox + x, oy + y, img::from_vec3(color));
                        }
                    }
                }
            }
        }
    }
    Ok(palette)
}

#[cfg(test)]
mod test {
    use super::*;

    fn channel_close(a: Rgb<u8>, b: Rgb<u8>) -> bool {
        a.0.iter().zip(&b.0).all(|(x, y)| (i16::from(*x) - i16::from(*y)).abs() <= 1)
    }

    #[test]
    fn corner_mode_is_unsupported() {
        assert!(matches!(
            generate_palette(128, 2, true),
            Err(Error::CornerPaletteUnsupported)
        ));
    }

    #[test]
    fn resolution_must_divide_into_tiles() {
        assert!(matches!(
            generate_palette(130, 2, false),
            Err(Error::ResolutionMismatch { .. })
        ));
    }

    #[test]
    fn all_zero_tile_is_uniform() {
        let palette = generate_palette(128, 2, false).unwrap();
        let tile = 128 / 4;
        let index = packing::edge_tile_index(2, 0, 0, 0, 0);
        let ox = (index % 4) * tile;
        let oy = (index / 4) * tile;
        for y in 0..tile {
            for x in 0..tile {
                assert_eq!(*palette.get_pixel(ox + x, oy + y), REFERENCE_COLORS[0]);
            }
        }
    }

    #[test]
    fn opposing_labels_show_a_horizontal_gradient() {
        let palette = generate_palette(128, 2, false).unwrap();
        let tile = 128 / 4;
        let index = packing::edge_tile_index(2, 1, 0, 0, 1);
        let ox = (index % 4) * tile;
        let oy = (index / 4) * tile;
        let mid = oy + tile / 2;

        // west edge carries color 1, east edge color 0
        assert!(channel_close(*palette.get_pixel(ox, mid), REFERENCE_COLORS[1]));
        assert!(channel_close(
            *palette.get_pixel(ox + tile - 1, mid),
            REFERENCE_COLORS[0]
        ));
        let center = *palette.get_pixel(ox + tile / 2, mid);
        assert!(center[0] > REFERENCE_COLORS[1][0] && center[0] < REFERENCE_COLORS[0][0]);
    }
}
