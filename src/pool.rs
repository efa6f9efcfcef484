// Copyright 2020 Shin Yoshida
//
// "LGPL-3.0-or-later OR Apache-2.0"
//
// This is part of rust-chunk-pool
//
//  rust-chunk-pool is free software: you can redistribute it and/or modify
//  it under the terms of the GNU Lesser General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  rust-chunk-pool is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU Lesser General Public License for more details.
//
//  You should have received a copy of the GNU Lesser General Public License
//  along with rust-chunk-pool.  If not, see <http://www.gnu.org/licenses/>.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::chunk::{Chunk, Chunks, Geometry};
use crate::{PoolConfig, PoolError};
use core::alloc::GlobalAlloc;
use core::fmt;
use core::ptr::NonNull;
use std::alloc::System;
use tracing::{debug, trace, warn};

/// `Pool` caches memory blocks of one fixed size.
///
/// Memory is acquired from the backend allocator as a chunk, which holds `elements_per_chunk`
/// blocks, and the blocks are dispatched one by one. A chunk is created only when every chunk is
/// exhausted. Method `release` caches the passed pointer again; i.e. the memory will not be freed
/// then. It is when the instance is dropped to deallocate all the chunks.
///
/// # Warnings
///
/// All the pointers allocated via `Pool` will be invalid after the instance is dropped. Accessing
/// such a pointer may lead memory unsafety even if the pointer itself is not released.
///
/// The returned memory is not initialized.
///
/// # Thread safety
///
/// All the mutable methods are thread unsafe. `Pool` can be moved to another thread if the
/// backend can, however, it can not be shared.
///
/// # Examples
///
/// ```
/// use chunk_pool::Pool;
///
/// let mut pool = Pool::new(8, 4).unwrap();
///
/// let ptr = pool.allocate().unwrap();
/// unsafe {
///     ptr.cast::<u64>().as_ptr().write(42);
///     assert_eq!(42, ptr.cast::<u64>().as_ptr().read());
///
///     pool.release(ptr);
/// }
/// assert_eq!(Some(ptr), pool.allocate());
/// ```
pub struct Pool<B = System>
where
    B: GlobalAlloc,
{
    geometry: Geometry,
    // The newest chunk is the head.
    chunks: Option<Chunk>,
    // Owner of the last released pointer.
    recent: Option<Chunk>,
    chunk_count: usize,
    allocated: usize,
    backend: B,
}

unsafe impl<B> Send for Pool<B> where B: Send + GlobalAlloc {}

impl<B> Drop for Pool<B>
where
    B: GlobalAlloc,
{
    fn drop(&mut self) {
        debug!(
            chunks = self.chunk_count,
            allocated = self.allocated,
            "releasing memory pool"
        );

        self.recent = None;
        let mut next = self.chunks.take();
        while let Some(chunk) = next {
            next = chunk.next();
            unsafe { chunk.release(&self.backend, &self.geometry) };
        }
    }
}

impl Pool<System> {
    /// Creates a new instance without any chunk.
    ///
    /// `element_size` is raised to the size of a pointer if it is smaller, and rounded up to the
    /// alignment of a pointer.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroElementsPerChunk`] if `elements_per_chunk` is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::{Pool, PoolError};
    /// use std::mem::size_of;
    ///
    /// let pool = Pool::new(1, 16).unwrap();
    /// assert_eq!(size_of::<usize>(), pool.element_size());
    ///
    /// assert_eq!(PoolError::ZeroElementsPerChunk, Pool::new(8, 0).unwrap_err());
    /// ```
    pub fn new(element_size: usize, elements_per_chunk: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::new(element_size, elements_per_chunk))
    }

    /// Creates a new instance whose elements can hold `T` .
    pub fn for_type<T>(elements_per_chunk: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::for_type::<T>(elements_per_chunk))
    }

    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_backend(config, System)
    }
}

impl<B> Pool<B>
where
    B: GlobalAlloc,
{
    /// Creates a new instance to acquire chunks from `backend` .
    ///
    /// `backend` is also used to deallocate the chunks on the drop.
    pub fn with_backend(config: PoolConfig, backend: B) -> Result<Self, PoolError> {
        let geometry = config.geometry()?;

        Ok(Self {
            geometry,
            chunks: None,
            recent: None,
            chunk_count: 0,
            allocated: 0,
            backend,
        })
    }

    /// Dispatches a cached element. If no chunk has a free element, acquires a new chunk from
    /// the backend at first.
    ///
    /// The element is `element_size` bytes and aligned to `element_align` . Its content is
    /// undefined.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::OutOfMemory`] if the backend fails to allocate a new chunk.
    pub fn try_allocate(&mut self) -> Result<NonNull<u8>, PoolError> {
        let chunk = match self.recent.filter(Chunk::has_free) {
            Some(chunk) => Some(chunk),
            None => self.find_free_chunk(),
        };

        let mut chunk = match chunk {
            Some(chunk) => chunk,
            None => self.grow()?,
        };

        // A chunk is never created empty.
        let ptr = chunk.pop().ok_or(PoolError::OutOfMemory {
            layout: self.geometry.chunk(),
        })?;
        self.allocated += 1;

        Ok(ptr)
    }

    /// Same to `try_allocate` except for returning `None` on failure.
    pub fn allocate(&mut self) -> Option<NonNull<u8>> {
        self.try_allocate().ok()
    }

    /// Caches `ptr` to the chunk which owns it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ForeignPointer`] if no chunk owns `ptr` , or
    /// [`PoolError::MisalignedPointer`] if `ptr` is not the start of an element. Nothing is changed
    /// in both cases.
    ///
    /// # Safety
    ///
    /// If `ptr` is owned by `self` , it must have been returned by `allocate` or `try_allocate`
    /// and must not have been released since then. Releasing the same pointer twice breaks the
    /// cache.
    pub unsafe fn try_release(&mut self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        let addr = ptr.as_ptr() as usize;
        let mut chunk = self
            .find_owner(addr)
            .ok_or(PoolError::ForeignPointer { addr })?;

        let offset = chunk.slot_offset(&self.geometry, addr);
        if offset != 0 {
            return Err(PoolError::MisalignedPointer { addr, offset });
        }

        chunk.push(ptr);
        self.recent = Some(chunk);
        self.allocated = self.allocated.saturating_sub(1);

        Ok(())
    }

    /// Same to `try_release` except for ignoring the errors.
    ///
    /// # Safety
    ///
    /// See `try_release` .
    pub unsafe fn release(&mut self, ptr: NonNull<u8>) {
        if let Err(err) = self.try_release(ptr) {
            trace!(%err, "ignored release");
        }
    }

    /// Returns true if `ptr` is in an element of a chunk.
    pub fn owns(&self, ptr: *const u8) -> bool {
        self.find_owner(ptr as usize).is_some()
    }

    /// The size of each element, after being raised and padded.
    pub fn element_size(&self) -> usize {
        self.geometry.element_size()
    }

    pub fn element_align(&self) -> usize {
        self.geometry.element_align()
    }

    pub fn elements_per_chunk(&self) -> usize {
        self.geometry.elements_per_chunk()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// The number of elements of all the chunks.
    pub fn capacity(&self) -> usize {
        self.chunk_count * self.geometry.elements_per_chunk()
    }

    /// The number of elements dispatched and not released yet.
    pub fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Counts the cached elements by walking every free stack.
    pub fn free_count(&self) -> usize {
        self.chunks().map(|chunk| chunk.free_len()).sum()
    }

    /// Provides a reference to the backend allocator.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn chunks(&self) -> Chunks<'_> {
        Chunks::new(self.chunks)
    }

    /// The first chunk with a free element, from the newest.
    fn find_free_chunk(&self) -> Option<Chunk> {
        self.chunks().find(Chunk::has_free)
    }

    fn find_owner(&self, addr: usize) -> Option<Chunk> {
        let geometry = &self.geometry;
        self.chunks().find(|chunk| chunk.owns(geometry, addr))
    }

    fn grow(&mut self) -> Result<Chunk, PoolError> {
        let layout = self.geometry.chunk();

        let mut chunk = match Chunk::create(&self.backend, &self.geometry) {
            Some(chunk) => chunk,
            None => {
                warn!(
                    size = layout.size(),
                    align = layout.align(),
                    "backend failed to allocate a chunk"
                );
                return Err(PoolError::OutOfMemory { layout });
            }
        };

        chunk.set_next(self.chunks);
        self.chunks = Some(chunk);
        self.chunk_count += 1;

        debug!(
            chunks = self.chunk_count,
            element_size = self.geometry.element_size(),
            elements_per_chunk = self.geometry.elements_per_chunk(),
            "created chunk"
        );

        Ok(chunk)
    }
}

impl<B> fmt::Debug for Pool<B>
where
    B: GlobalAlloc,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("element_size", &self.element_size())
            .field("element_align", &self.element_align())
            .field("elements_per_chunk", &self.elements_per_chunk())
            .field("chunk_count", &self.chunk_count)
            .field("allocated", &self.allocated)
            .finish()
    }
}
