use crate::{img, Error};

/// Mip pyramid built by repeated 2x downsampling, coarsest level last.
#[derive(Clone)]
pub(crate) struct ImagePyramid {
    pub pyramid: Vec<image::RgbImage>,
}

impl ImagePyramid {
    /// Downsamples `in_img` until a tile of `tile_size` in level 0 shrinks
    /// to at most `visual_scale` pixels per side.
    pub fn new(in_img: image::RgbImage, tile_size: u32, visual_scale: u32) -> Result<Self, Error> {
        let mut pyramid = vec![in_img];
        let mut level = 0;
        while (tile_size >> level) > visual_scale {
            let next = img::downsample(pyramid.last().unwrap())?;
            pyramid.push(next);
            level += 1;
        }
        Ok(Self { pyramid })
    }

    /// Number of downsampling steps (levels beyond the original image).
    pub fn downsample_iterations(&self) -> u32 {
        (self.pyramid.len() - 1) as u32
    }

    pub fn bottom(&self) -> &image::RgbImage {
        &self.pyramid[self.pyramid.len() - 1]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stops_at_visual_scale() {
        let img = image::RgbImage::new(64, 64);
        // 4 tiles per side of 16 pixels, capped at a visual scale of 4
        let pyramid = ImagePyramid::new(img, 16, 4).unwrap();
        assert_eq!(pyramid.downsample_iterations(), 2);
        assert_eq!(pyramid.bottom().width(), 16);
    }

    #[test]
    fn no_levels_when_tile_fits() {
        let img = image::RgbImage::new(64, 64);
        let pyramid = ImagePyramid::new(img, 16, 128).unwrap();
        assert_eq!(pyramid.downsample_iterations(), 0);
        assert_eq!(pyramid.bottom().width(), 64);
    }
}
