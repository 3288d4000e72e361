use std::path::PathBuf;
use std::process::exit;

use rand::Rng;
use structopt::StructOpt;
use wang_tiles::{utils, Error, Session};

// Build-time configuration of this driver.
const NUM_COLORS: u32 = 2;
const CORNER_TILES: bool = true;

#[derive(StructOpt)]
#[structopt(name = "wang-tiles", rename_all = "kebab-case")]
enum Opt {
    /// Synthesize the packed tile atlas from a raw RGB example image
    Tiles {
        /// Atlas resolution; must be a power of two
        resolution: u32,
        /// Path to the raw RGB example of the given resolution
        input: PathBuf,
        /// Output path for the raw RGBA candidate atlas with the seam mask
        /// in the alpha channel
        output_rgba: PathBuf,
        /// Output path for the raw RGB constraints image at visual scale
        output_constraints: PathBuf,
        /// Restrict the cut to a single tile index
        debug_tile: Option<usize>,
    },
    /// Generate a stochastic tile index map; the red channel carries the
    /// tile index per cell
    Index {
        resolution: u32,
        output: PathBuf,
    },
    /// Render the edge-color reference palette
    Palette {
        resolution: u32,
        output: PathBuf,
    },
}

fn main() {
    // keep the historical `--tiles` / `--index` / `--palette` invocations
    // working alongside the plain subcommand names
    let args = std::env::args().map(|arg| match arg.as_str() {
        "--tiles" => "tiles".to_owned(),
        "--index" => "index".to_owned(),
        "--palette" => "palette".to_owned(),
        _ => arg,
    });

    let opt = Opt::from_iter_safe(args).unwrap_or_else(|e| {
        use structopt::clap::ErrorKind;
        match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => {
                eprintln!("{}", e.message);
                exit(-1);
            }
        }
    });

    if let Err(err) = run(opt) {
        eprintln!("{}", err);
        exit(-1);
    }
}

fn run(opt: Opt) -> Result<(), Error> {
    match opt {
        Opt::Tiles {
            resolution,
            input,
            output_rgba,
            output_constraints,
            debug_tile,
        } => {
            if resolution == 0 || !resolution.is_power_of_two() {
                eprintln!("resolution is invalid, must be a power of two");
                exit(-1);
            }

            let example = utils::load_raw_rgb(&input, resolution).map_err(|e| {
                eprintln!("unable to read example '{}'", input.display());
                e
            })?;

            let mut builder = Session::builder()
                .example(example)
                .num_colors(NUM_COLORS)
                .corner_tiles(CORNER_TILES)
                .seed(rand::thread_rng().gen::<u64>());
            if let Some(tile_index) = debug_tile {
                builder = builder.debug_tile(tile_index);
            }
            let tiles = builder.build()?.run()?;

            utils::save_raw_rgba(&output_rgba, tiles.candidates(), tiles.mask()).map_err(|e| {
                eprintln!("unable to write atlas '{}'", output_rgba.display());
                e
            })?;
            utils::save_raw_rgb(&output_constraints, tiles.constraints()).map_err(|e| {
                eprintln!(
                    "unable to write constraints '{}'",
                    output_constraints.display()
                );
                e
            })?;
            Ok(())
        }
        Opt::Index { resolution, output } => {
            if resolution == 0 {
                eprintln!("resolution is invalid");
                exit(-1);
            }
            let map = wang_tiles::generate_index_map(
                resolution,
                NUM_COLORS,
                CORNER_TILES,
                rand::thread_rng().gen::<u64>(),
            )?;
            utils::save_raw_rgb(&output, &map).map_err(|e| {
                eprintln!("unable to write index map '{}'", output.display());
                e
            })?;
            Ok(())
        }
        Opt::Palette { resolution, output } => {
            let palette = wang_tiles::generate_palette(resolution, NUM_COLORS, CORNER_TILES)?;
            utils::save_raw_rgb(&output, &palette).map_err(|e| {
                eprintln!("unable to write palette '{}'", output.display());
                e
            })?;
            Ok(())
        }
    }
}
