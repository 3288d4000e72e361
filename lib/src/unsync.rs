//! Unsynchronized plain old data vector and mask image for fast access from
//! multiple threads. Callers guarantee writes land at disjoint indices.

use std::cell::UnsafeCell;

pub(crate) struct UnsyncVec<T: Copy>(UnsafeCell<Vec<T>>);
pub(crate) struct UnsyncGrayImage(UnsafeCell<image::GrayImage>);

impl<T: Copy> UnsyncVec<T> {
    pub fn new(v: Vec<T>) -> Self {
        Self(UnsafeCell::new(v))
    }

    /// Safety: no two threads may assign the same index, and no reads may
    /// overlap the writes.
    pub unsafe fn assign_at(&self, idx: usize, value: T) {
        self.0.get().as_mut().unwrap()[idx] = value;
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0.into_inner()
    }
}

impl UnsyncGrayImage {
    pub fn new(img: image::GrayImage) -> Self {
        Self(UnsafeCell::new(img))
    }

    pub fn as_ref(&self) -> &image::GrayImage {
        unsafe { self.0.get().as_ref() }.unwrap()
    }

    pub fn into_inner(self) -> image::GrayImage {
        self.0.into_inner()
    }

    /// Safety: concurrent callers must write disjoint pixel patches.
    pub fn put_pixel(&self, x: u32, y: u32, pixel: image::Luma<u8>) {
        unsafe { self.0.get().as_mut() }
            .unwrap()
            .put_pixel(x, y, pixel)
    }
}

unsafe impl<T: Copy> Sync for UnsyncVec<T> {}
unsafe impl Sync for UnsyncGrayImage {}
