//! Square image helpers shared by the composer, the cut pipeline and the
//! generators: float color math, wrapping access and 2x resampling.

use crate::Error;
use image::{ImageBuffer, Pixel, Rgb};

/// An axis-aligned square subregion of an image.
#[derive(Copy, Clone, Debug)]
pub struct Patch {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl Patch {
    pub fn new(x: u32, y: u32, size: u32) -> Self {
        Self { x, y, size }
    }
}

#[inline]
pub(crate) fn modulo(a: i32, b: i32) -> i32 {
    let result = a % b;
    if result < 0 {
        result + b
    } else {
        result
    }
}

/// Access with coordinates reduced modulo the image dimensions, negative
/// safe. Handy for addressing toroidal maps like the index map.
#[inline]
pub fn wrap_pixel<P>(img: &ImageBuffer<P, Vec<u8>>, x: i32, y: i32) -> P
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let w = img.width() as i32;
    let h = img.height() as i32;
    *img.get_pixel(modulo(x, w) as u32, modulo(y, h) as u32)
}

#[inline]
pub(crate) fn to_vec3(c: Rgb<u8>) -> [f32; 3] {
    [
        f32::from(c[0]) / 255.0,
        f32::from(c[1]) / 255.0,
        f32::from(c[2]) / 255.0,
    ]
}

// clamps to [0, 1] and truncates toward zero
#[inline]
pub(crate) fn unit_to_byte(v: f32) -> u8 {
    (v.max(0.0).min(1.0) * 255.0) as u8
}

#[inline]
pub(crate) fn from_vec3(v: [f32; 3]) -> Rgb<u8> {
    Rgb([unit_to_byte(v[0]), unit_to_byte(v[1]), unit_to_byte(v[2])])
}

#[inline]
pub(crate) fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[inline]
pub(crate) fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Halve the resolution; each output pixel is the linear-float mean of the
/// matching 2x2 source block. Works on RGB images and single-channel masks.
pub(crate) fn downsample<P>(input: &ImageBuffer<P, Vec<u8>>) -> Result<ImageBuffer<P, Vec<u8>>, Error>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let resolution = input.width();
    if resolution % 2 != 0 {
        return Err(Error::OddResolution(resolution));
    }
    let channels = P::CHANNEL_COUNT as usize;
    debug_assert!(channels <= 4);

    let half = resolution / 2;
    let mut output: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(half, half);
    for y in 0..half {
        for x in 0..half {
            let mut acc = [0.0f32; 4];
            for &(dx, dy) in &[(0, 0), (1, 0), (0, 1), (1, 1)] {
                let p = input.get_pixel(x * 2 + dx, y * 2 + dy);
                for (a, ch) in acc.iter_mut().zip(p.channels()) {
                    *a += f32::from(*ch) / 255.0;
                }
            }
            let mut bytes = [0u8; 4];
            for c in 0..channels {
                bytes[c] = unit_to_byte(acc[c] * 0.25);
            }
            output.put_pixel(x, y, *P::from_slice(&bytes[..channels]));
        }
    }
    Ok(output)
}

/// Nearest-neighbor 2x replication.
pub(crate) fn upsample<P>(input: &ImageBuffer<P, Vec<u8>>) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let resolution = input.width();
    let mut output: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(resolution * 2, resolution * 2);
    for y in 0..resolution {
        for x in 0..resolution {
            let c = *input.get_pixel(x, y);
            output.put_pixel(x * 2, y * 2, c);
            output.put_pixel(x * 2 + 1, y * 2, c);
            output.put_pixel(x * 2, y * 2 + 1, c);
            output.put_pixel(x * 2 + 1, y * 2 + 1, c);
        }
    }
    output
}
