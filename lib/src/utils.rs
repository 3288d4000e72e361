//! Raw image file I/O. Files are headerless row-major byte dumps; the row
//! order on disk is reversed relative to memory (bottom row written first)
//! so the files line up with tools that treat the first row as the top of
//! the picture.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use image::{GrayImage, RgbImage};

use crate::Error;

/// Reads a square raw RGB file of the given resolution.
pub fn load_raw_rgb<P: AsRef<Path>>(path: P, resolution: u32) -> Result<RgbImage, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let stride = (resolution * 3) as usize;
    let mut buffer = vec![0u8; stride * resolution as usize];
    for y in (0..resolution as usize).rev() {
        reader.read_exact(&mut buffer[y * stride..(y + 1) * stride])?;
    }
    Ok(RgbImage::from_raw(resolution, resolution, buffer).unwrap())
}

/// Writes a square RGB image as a raw file, bottom row first.
pub fn save_raw_rgb<P: AsRef<Path>>(path: P, img: &RgbImage) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    let stride = (img.width() * 3) as usize;
    let raw = img.as_raw();
    for y in (0..img.height() as usize).rev() {
        writer.write_all(&raw[y * stride..(y + 1) * stride])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes an RGB image and a single-channel alpha mask as one interleaved
/// raw RGBA file, bottom row first.
pub fn save_raw_rgba<P: AsRef<Path>>(path: P, img: &RgbImage, alpha: &GrayImage) -> Result<(), Error> {
    let resolution = img.width();
    let mut writer = BufWriter::new(File::create(path)?);
    let mut row = vec![0u8; (resolution * 4) as usize];
    for y in (0..resolution).rev() {
        for x in 0..resolution {
            let rgb = img.get_pixel(x, y);
            let cell = &mut row[(x * 4) as usize..(x * 4 + 4) as usize];
            cell[..3].copy_from_slice(&rgb.0);
            cell[3] = alpha.get_pixel(x, y)[0];
        }
        writer.write_all(&row)?;
    }
    writer.flush()?;
    Ok(())
}
