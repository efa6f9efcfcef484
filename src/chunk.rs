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

use crate::free_stack::{FreeStack, Node};
use crate::PoolError;
use core::alloc::{GlobalAlloc, Layout};
use core::marker::PhantomData;
use core::mem::{align_of, size_of};
use core::ptr::NonNull;

/// Placed at the first position of every chunk, followed by the slab.
///
/// ```text
/// [ next | free_stack ][ padding ][ slot 0 ][ slot 1 ] ... [ slot n-1 ]
///  ^ chunk start                   ^ slab start
/// ```
#[repr(C)]
pub struct ChunkHeader {
    next: Option<NonNull<ChunkHeader>>,
    free_stack: FreeStack,
}

/// Memory layout shared by every chunk of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    element: Layout,
    elements_per_chunk: usize,
    slab_offset: usize,
    chunk: Layout,
}

impl Geometry {
    /// Calculates the slot and chunk layouts.
    ///
    /// The slot is raised to hold at least one `Node` and padded to its alignment, so that every
    /// slot of the slab is aligned as well as the first one.
    pub fn new(element: Layout, elements_per_chunk: usize) -> Result<Self, PoolError> {
        if elements_per_chunk == 0 {
            return Err(PoolError::ZeroElementsPerChunk);
        }

        let size = usize::max(element.size(), size_of::<Node>());
        let align = usize::max(element.align(), align_of::<Node>());
        let element = Layout::from_size_align(size, align)?.pad_to_align();

        let slab_size = element
            .size()
            .checked_mul(elements_per_chunk)
            .ok_or(PoolError::CapacityOverflow)?;
        let slab = Layout::from_size_align(slab_size, element.align())
            .map_err(|_| PoolError::CapacityOverflow)?;
        let (chunk, slab_offset) = Layout::new::<ChunkHeader>()
            .extend(slab)
            .map_err(|_| PoolError::CapacityOverflow)?;

        Ok(Self {
            element,
            elements_per_chunk,
            slab_offset,
            chunk: chunk.pad_to_align(),
        })
    }

    pub fn element_size(&self) -> usize {
        self.element.size()
    }

    pub fn element_align(&self) -> usize {
        self.element.align()
    }

    pub fn elements_per_chunk(&self) -> usize {
        self.elements_per_chunk
    }

    /// Layout of the whole allocation requested from the backend.
    pub fn chunk(&self) -> Layout {
        self.chunk
    }

    #[cfg(test)]
    pub fn slab_offset(&self) -> usize {
        self.slab_offset
    }

    /// Byte length of the slots of one chunk, excluding the header.
    pub fn slab_len(&self) -> usize {
        self.element.size() * self.elements_per_chunk
    }
}

/// Handle to a chunk allocated from the backend.
///
/// `Chunk` is a copy of the pointer; it owns nothing. The pool owning the list is responsible for
/// calling `release` exactly once for each chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    header: NonNull<ChunkHeader>,
}

impl Chunk {
    /// Allocates one chunk from `backend` and pushes every slot to its free stack in ascending
    /// address order. (The last slot is popped first.)
    ///
    /// Returns `None` if `backend` fails to allocate.
    pub fn create<B>(backend: &B, geometry: &Geometry) -> Option<Self>
    where
        B: GlobalAlloc,
    {
        let ptr = unsafe { backend.alloc(geometry.chunk) };
        let header = NonNull::new(ptr)?.cast::<ChunkHeader>();

        unsafe {
            header.as_ptr().write(ChunkHeader {
                next: None,
                free_stack: FreeStack::new(),
            });
        }

        let mut chunk = Self { header };
        let start = chunk.slab_start(geometry);
        let stride = geometry.element_size();

        for i in 0..geometry.elements_per_chunk {
            unsafe {
                let slot = NonNull::new_unchecked(start.add(i * stride));
                chunk.header_mut().free_stack.push(slot);
            }
        }

        Some(chunk)
    }

    /// Returns the memory to `backend` .
    ///
    /// # Safety
    ///
    /// `self` must have been created by `create` with the same `backend` and `geometry` , and
    /// must not be used after this call.
    pub unsafe fn release<B>(self, backend: &B, geometry: &Geometry)
    where
        B: GlobalAlloc,
    {
        backend.dealloc(self.header.as_ptr().cast::<u8>(), geometry.chunk);
    }

    fn header(&self) -> &ChunkHeader {
        unsafe { self.header.as_ref() }
    }

    fn header_mut(&mut self) -> &mut ChunkHeader {
        unsafe { self.header.as_mut() }
    }

    pub fn next(&self) -> Option<Chunk> {
        self.header().next.map(|header| Self { header })
    }

    pub fn set_next(&mut self, next: Option<Chunk>) {
        self.header_mut().next = next.map(|chunk| chunk.header);
    }

    /// Address of the first slot.
    pub fn slab_start(&self, geometry: &Geometry) -> *mut u8 {
        unsafe { self.header.as_ptr().cast::<u8>().add(geometry.slab_offset) }
    }

    /// Address one past the last slot.
    #[cfg(test)]
    pub fn slab_end(&self, geometry: &Geometry) -> *mut u8 {
        unsafe { self.slab_start(geometry).add(geometry.slab_len()) }
    }

    /// Returns true if `addr` is in `[slab_start, slab_end)` .
    pub fn owns(&self, geometry: &Geometry, addr: usize) -> bool {
        let start = self.slab_start(geometry) as usize;
        start <= addr && addr - start < geometry.slab_len()
    }

    /// Distance from the start of the slot containing `addr` .
    /// `addr` must be owned by `self` .
    pub fn slot_offset(&self, geometry: &Geometry, addr: usize) -> usize {
        debug_assert!(self.owns(geometry, addr));
        let start = self.slab_start(geometry) as usize;
        (addr - start) % geometry.element_size()
    }

    pub fn has_free(&self) -> bool {
        !self.header().free_stack.is_empty()
    }

    pub fn free_len(&self) -> usize {
        self.header().free_stack.len()
    }

    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        self.header_mut().free_stack.pop()
    }

    /// # Safety
    ///
    /// `slot` must be a slot boundary of this chunk which is not in the free stack.
    pub unsafe fn push(&mut self, slot: NonNull<u8>) {
        self.header_mut().free_stack.push(slot);
    }
}

/// Iterator over an intrusive chunk list, from the head.
pub struct Chunks<'a> {
    next: Option<Chunk>,
    _marker: PhantomData<&'a ChunkHeader>,
}

impl<'a> Chunks<'a> {
    pub fn new(head: Option<Chunk>) -> Self {
        Self {
            next: head,
            _marker: PhantomData,
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let current = self.next?;
        self.next = current.next();
        Some(current)
    }
}
