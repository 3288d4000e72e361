#![warn(
    clippy::all,
    clippy::doc_markdown,
    clippy::dbg_macro,
    clippy::todo,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::mem_forget,
    clippy::use_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style
)]

//! `wang-tiles` synthesizes a Wang tile or corner tile texture set from a
//! single square example image. Every tile in the packed atlas is a seamless
//! composition of sub-patches of the example; tiles whose shared edge (or
//! corner) carries the same color label can be juxtaposed without visible
//! seams.
//!
//! Seams are optimized per tile with a min-cut over the pixel adjacency
//! graph: the candidate atlas is layered over the example, the tile
//! perimeter is constrained to the candidate layer, the interior to the
//! example, and a max-flow solver picks the cheapest transition between the
//! two. Cuts run at a bounded visual scale on a mip pyramid and fan out over
//! a worker pool, one tile per job.
//!
//! You build a `Session` via a `SessionBuilder`; calling `build` validates
//! the configuration against the example image. `Session::run()` produces a
//! `GeneratedTiles` with the blended atlas, the raw candidate atlas, the
//! seam mask and the constraint image.
//!
//! ```no_run
//! let example = wang_tiles::utils::load_raw_rgb("example.img", 256).unwrap();
//!
//! let tiles = wang_tiles::Session::builder()
//!     .example(example)
//!     .num_colors(2)
//!     .corner_tiles(true)
//!     .seed(10)
//!     .build()
//!     .expect("failed to build session")
//!     .run()
//!     .expect("synthesis failed");
//!
//! wang_tiles::utils::save_raw_rgba("tiles.img", tiles.candidates(), tiles.mask()).unwrap();
//! ```
//!
//! The stochastic index map (`generate_index_map`) and the edge-color
//! palette (`generate_palette`) are standalone utilities sharing only the
//! packing permutation with the synthesis pipeline.

mod errors;
mod graphcut;
mod img;
mod img_pyramid;
mod indexmap;
mod jobs;
mod packing;
mod palette;
mod synth;
mod unsync;
pub mod utils;

pub use image;

pub use errors::Error;
pub use graphcut::{
    AlgoStats, CONSTRAINT_COLOR_FREE, CONSTRAINT_COLOR_SINK, CONSTRAINT_COLOR_SOURCE,
};
pub use img::{wrap_pixel, Patch};
pub use indexmap::generate_index_map;
pub use palette::generate_palette;

use image::{GrayImage, RgbImage};
use std::path::Path;

/// Builds a session by setting parameters and the example image; `build`
/// checks the inputs so synthesis cannot fail on a precondition later.
pub struct SessionBuilder {
    example: Option<RgbImage>,
    num_colors: u32,
    corner_tiles: bool,
    seed: u64,
    max_thread_count: Option<usize>,
    debug_tile: Option<usize>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            example: None,
            num_colors: 2,
            corner_tiles: true,
            seed: 0,
            max_thread_count: None,
            debug_tile: None,
        }
    }
}

impl SessionBuilder {
    /// Creates a new `SessionBuilder`, can also be created via
    /// `Session::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// The square example texture to synthesize tiles from. Its resolution
    /// must be a multiple of `num_colors`^2.
    pub fn example(mut self, example: RgbImage) -> Self {
        self.example = Some(example);
        self
    }

    /// Number of colors per tile side (or corner), 2 to 4.
    ///
    /// Default: 2
    pub fn num_colors(mut self, count: u32) -> Self {
        self.num_colors = count;
        self
    }

    /// Label corners instead of edges.
    ///
    /// Default: true
    pub fn corner_tiles(mut self, corner_tiles: bool) -> Self {
        self.corner_tiles = corner_tiles;
        self
    }

    /// Seed for edge-mode patch placement. Identical seeds give identical
    /// tile sets regardless of the worker count.
    ///
    /// Default: 0
    pub fn seed(mut self, value: u64) -> Self {
        self.seed = value;
        self
    }

    /// Caps the number of worker threads used for the per-tile cuts.
    ///
    /// Default: half the logical cores on this system.
    pub fn max_thread_count(mut self, count: usize) -> Self {
        self.max_thread_count = Some(count);
        self
    }

    /// Restricts the cut to a single tile index, leaving the rest of the
    /// seam mask empty. Meant for debugging one seam at a time.
    pub fn debug_tile(mut self, tile_index: usize) -> Self {
        self.debug_tile = Some(tile_index);
        self
    }

    /// Creates a `Session`, or returns an error if invalid parameters or an
    /// invalid example image were specified.
    pub fn build(self) -> Result<Session, Error> {
        let example = self.example.ok_or(Error::NoExample)?;
        let generator = synth::Generator::new(
            example,
            synth::GeneratorParams {
                num_colors: self.num_colors,
                corner_tiles: self.corner_tiles,
                seed: self.seed,
                max_thread_count: self.max_thread_count,
                debug_tile: self.debug_tile,
            },
        )?;
        Ok(Session { generator })
    }
}

/// Tile synthesis session. Calling `run()` consumes the session and returns
/// the generated tile set.
pub struct Session {
    generator: synth::Generator,
}

impl Session {
    /// Creates a new session with default parameters.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Picks the colored patches, composes the candidate atlas, cuts every
    /// tile and blends the final atlas.
    pub fn run(self) -> Result<GeneratedTiles, Error> {
        let output = self.generator.run()?;
        Ok(GeneratedTiles { output })
    }
}

/// A tile set generated by `Session::run()`
pub struct GeneratedTiles {
    output: synth::SynthesisOutput,
}

impl GeneratedTiles {
    /// The packed atlas with seams already blended in.
    pub fn atlas(&self) -> &RgbImage {
        &self.output.atlas
    }

    /// The candidate atlas before seam optimization.
    pub fn candidates(&self) -> &RgbImage {
        &self.output.candidates
    }

    /// The per-pixel compositing mask: 255 keeps the candidate layer, 0
    /// shows the example through.
    pub fn mask(&self) -> &GrayImage {
        &self.output.mask
    }

    /// The constraint image the cuts ran with, at visual scale.
    pub fn constraints(&self) -> &RgbImage {
        &self.output.constraints
    }

    /// Per-tile solver statistics, indexed by tile.
    pub fn stats(&self) -> &[AlgoStats] {
        &self.output.stats
    }

    pub fn into_atlas(self) -> RgbImage {
        self.output.atlas
    }

    /// Saves the atlas and the intermediate maps as PNGs for inspection.
    pub fn save_png<P: AsRef<Path>>(&self, dir: P) -> Result<(), Error> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.output.atlas.save(dir.join("atlas.png"))?;
        self.output.candidates.save(dir.join("candidates.png"))?;
        self.output.mask.save(dir.join("mask.png"))?;
        self.output.constraints.save(dir.join("constraints.png"))?;
        Ok(())
    }
}
