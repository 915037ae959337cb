//! The shared memory pixels we hand to the compositor every frame
//!
//! Every present creates a brand new file, pool and buffer. That is wasteful, but it keeps the
//! lifecycle trivial: the previous buffer is destroyed as soon as the new one is committed, and
//! there is never more than one mapping alive in this process.

use common::mmap::Mmap;

use super::Window;
use crate::wayland::{
    interfaces::{wl_buffer, wl_shm, wl_shm_pool, wl_surface},
    WlDynObj,
};
use crate::Error;

/// Bytes per pixel in `XRGB8888`
const CHANNELS: u32 = 4;

#[derive(Debug)]
pub(super) struct PixelBuffer {
    width: u32,
    height: u32,
    stride: u32,
    map: Option<Mmap>,
    /// the grey level of the next frame
    shade: u8,
}

impl PixelBuffer {
    pub(super) fn new(width: u32, height: u32) -> Result<Self, Error> {
        let mut buffer = Self {
            width: 0,
            height: 0,
            stride: 0,
            map: None,
            shade: 0,
        };
        buffer.resize(width, height)?;
        Ok(buffer)
    }

    /// Takes on the new dimensions, unless a pool of that size could not be created
    pub(super) fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        let too_large = Error::BufferTooLarge { width, height };
        let stride = width.checked_mul(CHANNELS).ok_or(too_large)?;
        (stride as usize)
            .checked_mul(height as usize)
            .and_then(|len| i32::try_from(len).ok())
            .ok_or(Error::BufferTooLarge { width, height })?;
        self.stride = stride;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub(super) const fn width(&self) -> u32 {
        self.width
    }

    pub(super) const fn height(&self) -> u32 {
        self.height
    }

    pub(super) const fn stride(&self) -> u32 {
        self.stride
    }

    pub(super) fn pixels(&self) -> Option<&[u8]> {
        self.map.as_ref().map(Mmap::slice)
    }

    /// Size of the pool for the current dimensions, as `wl_shm.create_pool` wants it
    fn pool_len(&self) -> Result<i32, Error> {
        let too_large = Error::BufferTooLarge {
            width: self.width,
            height: self.height,
        };
        (self.stride as usize)
            .checked_mul(self.height as usize)
            .and_then(|len| i32::try_from(len).ok())
            .ok_or(too_large)
    }

    /// Drops the current mapping and maps a new file of `len` bytes in its place
    fn remap(&mut self, len: usize) -> Result<&mut Mmap, Error> {
        self.map = None;
        Ok(self.map.insert(Mmap::create(len)?))
    }

    /// Paints the whole mapping with the current shade, then moves on to the next one
    fn fill(&mut self) {
        let pixel = u32::from_be_bytes([0xFF, self.shade, self.shade, self.shade]).to_le_bytes();
        if let Some(map) = self.map.as_mut() {
            for chunk in map.slice_mut().chunks_exact_mut(CHANNELS as usize) {
                chunk.copy_from_slice(&pixel);
            }
        }
        self.shade = self.shade.wrapping_add(1);
    }
}

impl Window {
    /// Allocates a fresh buffer, paints it and commits it to the surface
    ///
    /// The first present also asks for a frame callback. Later ones come from the callback
    /// handler, which has already asked for the next one.
    pub(super) fn present(&mut self, first: bool) -> Result<(), Error> {
        let shm = self.objects.require(WlDynObj::Shm)?;
        let surface = self.objects.require(WlDynObj::Surface)?;

        let pool_len = self.pixels.pool_len()?;
        // pool_len fits in an i32, and so does everything it is a multiple of
        let width = self.pixels.width() as i32;
        let height = self.pixels.height() as i32;
        let stride = self.pixels.stride() as i32;

        let map = self.pixels.remap(pool_len as usize)?;
        let pool = self.objects.bind(WlDynObj::ShmPool);
        wl_shm::req::create_pool(&mut self.conn, shm, pool, map.fd(), pool_len)?;

        let previous = self.objects.get(WlDynObj::Buffer);
        let buffer = self.objects.bind(WlDynObj::Buffer);
        wl_shm_pool::req::create_buffer(
            &mut self.conn,
            pool,
            buffer,
            0,
            width,
            height,
            stride,
            wl_shm::format::XRGB8888,
        )?;
        // the buffer keeps the memory alive on the compositor's side
        wl_shm_pool::req::destroy(&mut self.conn, pool)?;

        self.pixels.fill();

        wl_surface::req::attach(&mut self.conn, surface, Some(buffer), 0, 0)?;
        wl_surface::req::damage(&mut self.conn, surface, 0, 0, width, height)?;
        if first {
            let callback = self.objects.bind(WlDynObj::Callback);
            wl_surface::req::frame(&mut self.conn, surface, callback)?;
        }
        wl_surface::req::commit(&mut self.conn, surface)?;

        if let Some(previous) = previous {
            wl_buffer::req::destroy(&mut self.conn, previous)?;
        }
        Ok(())
    }
}
