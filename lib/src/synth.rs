//! The tile synthesis generator: picks colored patches from the example,
//! composes the candidate atlas, and runs the per-tile graph cut at visual
//! scale to produce the seam mask and the blended tile set.

use std::sync::Mutex;

use image::{GrayImage, RgbImage};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::graphcut::{
    AlgoStats, GraphCut, CONSTRAINT_COLOR_FREE, CONSTRAINT_COLOR_SINK, CONSTRAINT_COLOR_SOURCE,
};
use crate::img_pyramid::ImagePyramid;
use crate::jobs::JobSystem;
use crate::packing::{self, CornerPacking};
use crate::unsync::{UnsyncGrayImage, UnsyncVec};
use crate::{img, Error, Patch};

/// The cut runs at this resolution per tile (clamped to the tile size).
const VISUAL_SCALE: u32 = 128;

const MAX_PLACEMENT_ATTEMPTS: u32 = 10_000;

#[derive(Debug)]
pub(crate) struct GeneratorParams {
    pub num_colors: u32,
    pub corner_tiles: bool,
    pub seed: u64,
    pub max_thread_count: Option<usize>,
    pub debug_tile: Option<usize>,
}

enum Mode {
    Corners(CornerPacking),
    Edges,
}

enum ColoredPatches {
    Corners(Vec<Patch>),
    Edges {
        horizontal: Vec<Patch>,
        vertical: Vec<Patch>,
    },
}

pub(crate) struct SynthesisOutput {
    pub atlas: RgbImage,
    pub candidates: RgbImage,
    pub mask: GrayImage,
    pub constraints: RgbImage,
    pub stats: Vec<AlgoStats>,
}

pub(crate) struct Generator {
    source: RgbImage,
    params: GeneratorParams,
    mode: Mode,
    resolution: u32,
    num_tiles: u32,
    tile_size: u32,
}

impl Generator {
    pub fn new(source: RgbImage, params: GeneratorParams) -> Result<Self, Error> {
        if params.num_colors < 2 || params.num_colors > 4 {
            return Err(Error::InvalidNumColors(params.num_colors));
        }
        let (width, height) = source.dimensions();
        if width != height {
            return Err(Error::NotSquare { width, height });
        }
        let num_tiles = params.num_colors * params.num_colors;
        if width % num_tiles != 0 {
            return Err(Error::ResolutionMismatch {
                resolution: width,
                num_tiles,
            });
        }
        let mode = if params.corner_tiles {
            Mode::Corners(CornerPacking::new(params.num_colors)?)
        } else {
            Mode::Edges
        };
        Ok(Self {
            resolution: width,
            tile_size: width / num_tiles,
            num_tiles,
            source,
            params,
            mode,
        })
    }

    /// Runs the full pipeline: patches, candidate atlas, per-tile cut,
    /// blended atlas.
    pub fn run(self) -> Result<SynthesisOutput, Error> {
        let mut rng = Pcg32::seed_from_u64(self.params.seed);
        let patches = self.pick_colored_patches(&mut rng)?;
        let candidates = self.compose_candidates(&patches);
        let (mask, constraints, stats) = self.cut_tiles(&candidates)?;
        let atlas = self.blend(&candidates, &mask);
        Ok(SynthesisOutput {
            atlas,
            candidates,
            mask,
            constraints,
            stats,
        })
    }

    fn pick_colored_patches(&self, rng: &mut Pcg32) -> Result<ColoredPatches, Error> {
        match self.mode {
            Mode::Corners(_) => Ok(ColoredPatches::Corners(pick_corner_patches(
                self.resolution,
                self.tile_size,
                self.params.num_colors,
            ))),
            Mode::Edges => {
                let mut accepted = Vec::new();
                let mut horizontal = Vec::new();
                let mut vertical = Vec::new();
                for _ in 0..self.params.num_colors {
                    horizontal.push(self.place_random_patch(&mut accepted, rng)?);
                }
                for _ in 0..self.params.num_colors {
                    vertical.push(self.place_random_patch(&mut accepted, rng)?);
                }
                Ok(ColoredPatches::Edges {
                    horizontal,
                    vertical,
                })
            }
        }
    }

    fn place_random_patch(
        &self,
        accepted: &mut Vec<Patch>,
        rng: &mut Pcg32,
    ) -> Result<Patch, Error> {
        let span = self.resolution - self.tile_size + 1;
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let candidate = Patch::new(
                rng.gen_range(0, span),
                rng.gen_range(0, span),
                self.tile_size,
            );
            if accepted.iter().all(|p| patches_separated(*p, candidate)) {
                accepted.push(candidate);
                return Ok(candidate);
            }
        }
        Err(Error::PatchPlacement {
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    fn compose_candidates(&self, patches: &ColoredPatches) -> RgbImage {
        match (patches, &self.mode) {
            (ColoredPatches::Corners(list), Mode::Corners(packing)) => {
                self.compose_corner_candidates(list, packing)
            }
            (
                ColoredPatches::Edges {
                    horizontal,
                    vertical,
                },
                Mode::Edges,
            ) => self.compose_edge_candidates(horizontal, vertical),
            _ => unreachable!("patch kind always matches the generator mode"),
        }
    }

    /// Every tile is four quadrants; each quadrant samples its corner patch
    /// reflected across the patch center, so tiles sharing a corner label
    /// show the same example region around that corner.
    fn compose_corner_candidates(&self, patches: &[Patch], packing: &CornerPacking) -> RgbImage {
        let num_colors = self.params.num_colors;
        let tile = self.tile_size;
        let half = tile / 2;
        let mut atlas = RgbImage::new(self.resolution, self.resolution);

        for cne in 0..num_colors {
            for cse in 0..num_colors {
                for csw in 0..num_colors {
                    for cnw in 0..num_colors {
                        let corners = [csw, cse, cnw, cne];
                        let index = packing.tile_index(cne, cse, csw, cnw);
                        let ox = (index % self.num_tiles) * tile;
                        let oy = (index / self.num_tiles) * tile;
                        for y in 0..tile {
                            for x in 0..tile {
                                let y_north = u32::from(y >= half);
                                let x_east = u32::from(x >= half);
                                let patch =
                                    patches[corners[((y_north << 1) | x_east) as usize] as usize];
                                let sample_x =
                                    patch.x + if x_east == 1 { x - half } else { x + half };
                                let sample_y =
                                    patch.y + if y_north == 1 { y - half } else { y + half };
                                atlas.put_pixel(
                                    ox + x,
                                    oy + y,
                                    *self.source.get_pixel(sample_x, sample_y),
                                );
                            }
                        }
                    }
                }
            }
        }
        atlas
    }

    /// Every tile is four diamond wedges, one per edge label. Wedges are
    /// accumulated in float with half weight on the diagonal cells, so the
    /// contributions sum to one everywhere; each wedge samples its patch
    /// shifted half a tile toward the matching edge.
    fn compose_edge_candidates(&self, horizontal: &[Patch], vertical: &[Patch]) -> RgbImage {
        let num_colors = self.params.num_colors;
        let tile = self.tile_size;
        let half = tile / 2;
        let mut atlas = RgbImage::new(self.resolution, self.resolution);
        let mut acc = vec![[0.0f32; 3]; (tile * tile) as usize];

        for n in 0..num_colors {
            for e in 0..num_colors {
                for s in 0..num_colors {
                    for w in 0..num_colors {
                        let index = packing::edge_tile_index(num_colors, n, e, s, w);
                        let ox = (index % self.num_tiles) * tile;
                        let oy = (index / self.num_tiles) * tile;

                        for cell in acc.iter_mut() {
                            *cell = [0.0; 3];
                        }
                        let north = horizontal[n as usize];
                        let south = horizontal[s as usize];
                        let east = vertical[e as usize];
                        let west = vertical[w as usize];
                        for r in 0..half {
                            for c in r..tile - r {
                                let weight = if c == r || c == tile - 1 - r { 0.5 } else { 1.0 };
                                self.splat(&mut acc, (c, r), south, (c, r + half), weight);
                                self.splat(
                                    &mut acc,
                                    (c, tile - 1 - r),
                                    north,
                                    (c, tile - 1 - r - half),
                                    weight,
                                );
                                self.splat(&mut acc, (r, c), west, (r + half, c), weight);
                                self.splat(
                                    &mut acc,
                                    (tile - 1 - r, c),
                                    east,
                                    (tile - 1 - r - half, c),
                                    weight,
                                );
                            }
                        }
                        for y in 0..tile {
                            for x in 0..tile {
                                atlas.put_pixel(
                                    ox + x,
                                    oy + y,
                                    img::from_vec3(acc[(y * tile + x) as usize]),
                                );
                            }
                        }
                    }
                }
            }
        }
        atlas
    }

    fn splat(
        &self,
        acc: &mut [[f32; 3]],
        (x, y): (u32, u32),
        patch: Patch,
        (px, py): (u32, u32),
        weight: f32,
    ) {
        let sample = img::to_vec3(*self.source.get_pixel(patch.x + px, patch.y + py));
        let cell = &mut acc[(y * self.tile_size + x) as usize];
        for (c, v) in cell.iter_mut().zip(&sample) {
            *c += v * weight;
        }
    }

    /// Builds both mip pyramids, cuts every tile at visual scale on the job
    /// system, and upsamples the joined mask back to full resolution.
    fn cut_tiles(&self, candidates: &RgbImage) -> Result<(GrayImage, RgbImage, Vec<AlgoStats>), Error> {
        let visual_scale = VISUAL_SCALE.min(self.tile_size);
        let source_mips = ImagePyramid::new(self.source.clone(), self.tile_size, visual_scale)?;
        let corners_mips = ImagePyramid::new(candidates.clone(), self.tile_size, visual_scale)?;
        let downsample_iterations = source_mips.downsample_iterations();
        let bottom_resolution = source_mips.bottom().width();
        if bottom_resolution != visual_scale * self.num_tiles {
            return Err(Error::PyramidMismatch {
                expected: visual_scale * self.num_tiles,
                actual: bottom_resolution,
            });
        }

        let constraints = fill_constraints(visual_scale, self.params.corner_tiles);
        let total_tiles = (self.num_tiles * self.num_tiles) as usize;
        let mask = UnsyncGrayImage::new(GrayImage::new(bottom_resolution, bottom_resolution));
        let stats = UnsyncVec::new(vec![AlgoStats::default(); total_tiles]);
        let failure: Mutex<Option<Error>> = Mutex::new(None);
        let diagnostics = Mutex::new(());

        let mut jobs = JobSystem::new();
        for row in 0..self.num_tiles {
            for col in 0..self.num_tiles {
                let tile_index = (row * self.num_tiles + col) as usize;
                if let Some(debug_tile) = self.params.debug_tile {
                    if tile_index != debug_tile {
                        continue;
                    }
                }
                let image_a = corners_mips.bottom();
                let image_b = source_mips.bottom();
                let constraints = &constraints;
                let mask = &mask;
                let stats = &stats;
                let failure = &failure;
                let diagnostics = &diagnostics;
                jobs.add_job(move || {
                    {
                        let _stdout = diagnostics.lock().unwrap();
                        println!("cutting tile {} of {}", tile_index, total_tiles);
                    }
                    let patch = Patch::new(col * visual_scale, row * visual_scale, visual_scale);
                    let result = GraphCut::new(image_a, patch, image_b, patch, constraints)
                        .and_then(|mut cut| cut.compute_cut_mask(mask, patch));
                    match result {
                        // tiles own disjoint mask patches and stats slots
                        Ok(stat) => unsafe { stats.assign_at(tile_index, stat) },
                        Err(err) => {
                            let mut failure = failure.lock().unwrap();
                            if failure.is_none() {
                                *failure = Some(err);
                            }
                        }
                    }
                });
            }
        }

        let worker_count = match self.params.max_thread_count {
            Some(count) => count.max(1),
            None => JobSystem::default_worker_count(jobs.job_count()),
        };
        jobs.run(worker_count);
        drop(jobs);

        if let Some(err) = failure.into_inner().unwrap() {
            return Err(err);
        }
        let stats = stats.into_inner();
        for (index, stat) in stats.iter().enumerate() {
            println!(
                "found max-flow for tile {} after {} iterations: {}",
                index, stat.iteration_count, stat.max_flow
            );
        }

        drop(source_mips);
        drop(corners_mips);
        let mut mask = mask.into_inner();
        for _ in 0..downsample_iterations {
            mask = img::upsample(&mask);
        }
        Ok((mask, constraints, stats))
    }

    /// alpha blend: mask 255 shows the candidate layer, 0 the example
    fn blend(&self, candidates: &RgbImage, mask: &GrayImage) -> RgbImage {
        let mut atlas = RgbImage::new(self.resolution, self.resolution);
        for y in 0..self.resolution {
            for x in 0..self.resolution {
                let alpha = f32::from(mask.get_pixel(x, y)[0]) / 255.0;
                let c0 = img::to_vec3(*self.source.get_pixel(x, y));
                let c1 = img::to_vec3(*candidates.get_pixel(x, y));
                let color = [
                    c0[0] * (1.0 - alpha) + c1[0] * alpha,
                    c0[1] * (1.0 - alpha) + c1[1] * alpha,
                    c0[2] * (1.0 - alpha) + c1[2] * alpha,
                ];
                atlas.put_pixel(x, y, img::from_vec3(color));
            }
        }
        atlas
    }
}

fn pick_corner_patches(resolution: u32, tile_size: u32, num_colors: u32) -> Vec<Patch> {
    let far = resolution - tile_size;
    let mut patches = vec![
        Patch::new(0, 0, tile_size),
        Patch::new(far, far, tile_size),
    ];
    if num_colors > 2 {
        patches.push(Patch::new(0, far, tile_size));
    }
    if num_colors > 3 {
        patches.push(Patch::new(far, 0, tile_size));
    }
    patches
}

/// Non-overlap test: the bounding box of both patches must span at least the
/// sum of their sizes on one axis.
fn patches_separated(a: Patch, b: Patch) -> bool {
    let span_x = (a.x + a.size).max(b.x + b.size) - a.x.min(b.x);
    let span_y = (a.y + a.size).max(b.y + b.size) - a.y.min(b.y);
    span_x.max(span_y) >= a.size + b.size
}

/// The constraint image shared by every tile: SOURCE on the perimeter (the
/// candidate layer must survive there so seams align with the atlas grid),
/// SINK on the inner cross or diagonals and on a padded center square (the
/// tile interior keeps the example statistics).
pub(crate) fn fill_constraints(tile_size: u32, corner_tiles: bool) -> RgbImage {
    let half = tile_size / 2;
    let mut constraints =
        RgbImage::from_pixel(tile_size, tile_size, CONSTRAINT_COLOR_FREE);

    for p in 0..tile_size {
        constraints.put_pixel(p, 0, CONSTRAINT_COLOR_SOURCE);
        constraints.put_pixel(p, tile_size - 1, CONSTRAINT_COLOR_SOURCE);
        if p == 0 || p == tile_size - 1 {
            continue;
        }
        constraints.put_pixel(0, p, CONSTRAINT_COLOR_SOURCE);
        constraints.put_pixel(tile_size - 1, p, CONSTRAINT_COLOR_SOURCE);

        if corner_tiles {
            constraints.put_pixel(p, half - 1, CONSTRAINT_COLOR_SINK);
            constraints.put_pixel(p, half, CONSTRAINT_COLOR_SINK);
            if p == half - 1 || p == half {
                continue;
            }
            constraints.put_pixel(half - 1, p, CONSTRAINT_COLOR_SINK);
            constraints.put_pixel(half, p, CONSTRAINT_COLOR_SINK);
        } else {
            constraints.put_pixel(p, p, CONSTRAINT_COLOR_SINK);
            constraints.put_pixel(p, tile_size - 1 - p, CONSTRAINT_COLOR_SINK);
        }
    }

    let padding = tile_size / 7;
    for y in padding..tile_size - padding {
        for x in padding..tile_size - padding {
            constraints.put_pixel(x, y, CONSTRAINT_COLOR_SINK);
        }
    }
    constraints
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;

    fn params(num_colors: u32, corner_tiles: bool) -> GeneratorParams {
        GeneratorParams {
            num_colors,
            corner_tiles,
            seed: 7,
            max_thread_count: Some(1),
            debug_tile: None,
        }
    }

    #[test]
    fn corner_patches_sit_at_the_extrema() {
        let patches = pick_corner_patches(64, 16, 4);
        assert_eq!(patches.len(), 4);
        assert_eq!((patches[0].x, patches[0].y), (0, 0));
        assert_eq!((patches[1].x, patches[1].y), (48, 48));
        assert_eq!((patches[2].x, patches[2].y), (0, 48));
        assert_eq!((patches[3].x, patches[3].y), (48, 0));
        assert_eq!(pick_corner_patches(64, 16, 2).len(), 2);
    }

    #[test]
    fn separation_test_rejects_overlap() {
        let a = Patch::new(10, 10, 8);
        assert!(!patches_separated(a, Patch::new(12, 40, 8)));
        assert!(!patches_separated(a, Patch::new(17, 17, 8)));
        assert!(patches_separated(a, Patch::new(18, 40, 8)));
        assert!(patches_separated(a, Patch::new(40, 10, 8)));
    }

    #[test]
    fn random_patches_never_overlap() {
        let generator = Generator::new(RgbImage::new(72, 72), params(3, false)).unwrap();
        let mut rng = Pcg32::seed_from_u64(99);
        let patches = generator.pick_colored_patches(&mut rng).unwrap();
        let all: Vec<Patch> = match patches {
            ColoredPatches::Edges {
                horizontal,
                vertical,
            } => horizontal.into_iter().chain(vertical).collect(),
            ColoredPatches::Corners(_) => unreachable!(),
        };
        assert_eq!(all.len(), 6);
        for i in 0..all.len() {
            for j in i + 1..all.len() {
                assert!(patches_separated(all[i], all[j]));
            }
        }
    }

    #[test]
    fn corner_tiles_sample_their_corner_patch() {
        // paint the two corner patch regions in flat colors
        let mut source = RgbImage::from_pixel(32, 32, Rgb([9, 9, 9]));
        for y in 0..8 {
            for x in 0..8 {
                source.put_pixel(x, y, Rgb([200, 0, 0]));
                source.put_pixel(x + 24, y + 24, Rgb([0, 0, 200]));
            }
        }
        let generator = Generator::new(source, params(2, true)).unwrap();
        let packing = CornerPacking::new(2).unwrap();
        let patches = pick_corner_patches(32, 8, 2);
        let atlas = generator.compose_corner_candidates(&patches, &packing);

        let all_zero = packing.tile_index(0, 0, 0, 0);
        let all_one = packing.tile_index(1, 1, 1, 1);
        for &(index, expected) in &[(all_zero, Rgb([200, 0, 0])), (all_one, Rgb([0, 0, 200]))] {
            let ox = (index % 4) * 8;
            let oy = (index / 4) * 8;
            for y in 0..8 {
                for x in 0..8 {
                    assert_eq!(*atlas.get_pixel(ox + x, oy + y), expected);
                }
            }
        }
    }

    #[test]
    fn edge_wedge_weights_cover_every_cell_once() {
        let tile = 16u32;
        let half = tile / 2;
        let mut weights = vec![0.0f32; (tile * tile) as usize];
        for r in 0..half {
            for c in r..tile - r {
                let w = if c == r || c == tile - 1 - r { 0.5 } else { 1.0 };
                for &(x, y) in &[
                    (c, r),
                    (c, tile - 1 - r),
                    (r, c),
                    (tile - 1 - r, c),
                ] {
                    weights[(y * tile + x) as usize] += w;
                }
            }
        }
        assert!(weights.iter().all(|w| (w - 1.0).abs() < 1e-6));
    }

    #[test]
    fn uniform_example_composes_to_itself() {
        let source = RgbImage::from_pixel(64, 64, Rgb([77, 77, 77]));
        let generator = Generator::new(source.clone(), params(2, false)).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let patches = generator.pick_colored_patches(&mut rng).unwrap();
        let atlas = generator.compose_candidates(&patches);
        assert!(source.pixels().zip(atlas.pixels()).all(|(a, b)| a == b));
    }

    #[test]
    fn constraints_keep_perimeter_on_the_candidate_layer() {
        for &corner_tiles in &[true, false] {
            let tile = 32;
            let constraints = fill_constraints(tile, corner_tiles);
            for p in 0..tile {
                assert_eq!(*constraints.get_pixel(p, 0), CONSTRAINT_COLOR_SOURCE);
                assert_eq!(*constraints.get_pixel(p, tile - 1), CONSTRAINT_COLOR_SOURCE);
                assert_eq!(*constraints.get_pixel(0, p), CONSTRAINT_COLOR_SOURCE);
                assert_eq!(*constraints.get_pixel(tile - 1, p), CONSTRAINT_COLOR_SOURCE);
            }
            // padded center square
            for y in tile / 7..tile - tile / 7 {
                for x in tile / 7..tile - tile / 7 {
                    assert_eq!(*constraints.get_pixel(x, y), CONSTRAINT_COLOR_SINK);
                }
            }
        }
    }

    #[test]
    fn edge_constraints_sink_the_diagonals() {
        let tile = 32;
        let constraints = fill_constraints(tile, false);
        for p in 1..tile - 1 {
            assert_eq!(*constraints.get_pixel(p, p), CONSTRAINT_COLOR_SINK);
            assert_eq!(*constraints.get_pixel(p, tile - 1 - p), CONSTRAINT_COLOR_SINK);
        }
    }

    #[test]
    fn corner_constraints_sink_the_inner_cross() {
        let tile = 32;
        let half = tile / 2;
        let constraints = fill_constraints(tile, true);
        for p in 1..tile - 1 {
            assert_eq!(*constraints.get_pixel(p, half - 1), CONSTRAINT_COLOR_SINK);
            assert_eq!(*constraints.get_pixel(p, half), CONSTRAINT_COLOR_SINK);
            assert_eq!(*constraints.get_pixel(half - 1, p), CONSTRAINT_COLOR_SINK);
            assert_eq!(*constraints.get_pixel(half, p), CONSTRAINT_COLOR_SINK);
        }
    }

    #[test]
    fn blend_follows_the_mask() {
        let source = RgbImage::from_pixel(16, 16, Rgb([0, 0, 0]));
        let generator = Generator::new(source, params(2, true)).unwrap();
        let candidates = RgbImage::from_pixel(16, 16, Rgb([200, 100, 50]));
        let mut mask = GrayImage::new(16, 16);
        mask.put_pixel(3, 3, image::Luma([255]));
        mask.put_pixel(5, 5, image::Luma([128]));

        let blended = generator.blend(&candidates, &mask);
        assert_eq!(*blended.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*blended.get_pixel(3, 3), Rgb([200, 100, 50]));
        // 128/255 of the candidate layer, truncated on store
        assert_eq!(*blended.get_pixel(5, 5), Rgb([100, 50, 25]));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            Generator::new(RgbImage::new(64, 64), params(5, false)),
            Err(Error::InvalidNumColors(5))
        ));
        assert!(matches!(
            Generator::new(RgbImage::new(64, 32), params(2, false)),
            Err(Error::NotSquare { .. })
        ));
        assert!(matches!(
            Generator::new(RgbImage::new(66, 66), params(2, false)),
            Err(Error::ResolutionMismatch { .. })
        ));
        assert!(matches!(
            Generator::new(RgbImage::new(81, 81), params(3, true)),
            Err(Error::PackingTableTooSmall { .. })
        ));
    }
}
