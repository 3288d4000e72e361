use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// An error in the image library occurred, eg failed to encode a debug PNG
    Image(image::ImageError),
    /// Open/read/write failure on a raw image file
    Io(std::io::Error),
    /// No example image was provided to the session builder
    NoExample,
    /// num_colors must be 2, 3 or 4
    InvalidNumColors(u32),
    /// The example image must be square
    NotSquare { width: u32, height: u32 },
    /// The example resolution must be a multiple of num_colors^2
    ResolutionMismatch { resolution: u32, num_tiles: u32 },
    /// A resolution that must be even (for 2x downsampling) was odd
    OddResolution(u32),
    /// Graph-cut patches must have equal sizes of at least 2
    InvalidPatchSize { a: u32, b: u32 },
    /// The constraints image cannot produce a valid cut
    MalformedConstraints(&'static str),
    /// The reference corner packing table only covers num_colors^2 <= 4
    PackingTableTooSmall { num_colors: u32 },
    /// The mip pyramid bottomed out at an unexpected resolution
    PyramidMismatch { expected: u32, actual: u32 },
    /// Random patch placement failed to find a non-overlapping spot
    PatchPlacement { attempts: u32 },
    /// The palette is only defined for edge-labeled tiles
    CornerPaletteUnsupported,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(ie) => write!(f, "{}", ie),
            Self::Io(io) => write!(f, "{}", io),
            Self::NoExample => {
                write!(f, "an example image must be provided before building")
            }
            Self::InvalidNumColors(n) => {
                write!(f, "num_colors must be 2, 3, or 4, but {} was given", n)
            }
            Self::NotSquare { width, height } => write!(
                f,
                "the example image must be square, got {}x{}",
                width, height
            ),
            Self::ResolutionMismatch {
                resolution,
                num_tiles,
            } => write!(
                f,
                "resolution {} is not a multiple of the per-side tile count {}",
                resolution, num_tiles
            ),
            Self::OddResolution(r) => {
                write!(f, "resolution {} must be even to downsample", r)
            }
            Self::InvalidPatchSize { a, b } => write!(
                f,
                "invalid patch sizes {} and {}; sizes must match and be >= 2",
                a, b
            ),
            Self::MalformedConstraints(why) => write!(f, "malformed constraints: {}", why),
            Self::PackingTableTooSmall { num_colors } => write!(
                f,
                "reference packing table is too small for {} colors",
                num_colors
            ),
            Self::PyramidMismatch { expected, actual } => write!(
                f,
                "pyramid bottom resolution {} does not match the expected {}",
                actual, expected
            ),
            Self::PatchPlacement { attempts } => write!(
                f,
                "could not place a non-overlapping patch after {} attempts",
                attempts
            ),
            Self::CornerPaletteUnsupported => {
                write!(f, "the palette is not implemented for corner tiles")
            }
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(ie: image::ImageError) -> Self {
        Self::Image(ie)
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::Io(io)
    }
}
