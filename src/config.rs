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

use crate::chunk::Geometry;
use crate::PoolError;
use core::alloc::Layout;
use core::mem::{align_of, size_of};

/// Parameters of a `Pool` , fixed at the creation.
///
/// # Examples
///
/// ```
/// use chunk_pool::{Pool, PoolConfig};
///
/// let config = PoolConfig::new(24, 128).with_align(16);
/// let pool = Pool::with_config(config).unwrap();
///
/// assert_eq!(32, pool.element_size());
/// assert_eq!(16, pool.element_align());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolConfig {
    element_size: usize,
    elements_per_chunk: usize,
    align: usize,
}

impl PoolConfig {
    /// Creates a new instance aligned for `usize` .
    pub fn new(element_size: usize, elements_per_chunk: usize) -> Self {
        Self {
            element_size,
            elements_per_chunk,
            align: align_of::<usize>(),
        }
    }

    /// Creates a new instance whose elements can hold `T` .
    pub fn for_type<T>(elements_per_chunk: usize) -> Self {
        Self::new(size_of::<T>(), elements_per_chunk).with_align(align_of::<T>())
    }

    /// Creates a new instance whose elements fit `layout` .
    pub fn from_layout(layout: Layout, elements_per_chunk: usize) -> Self {
        Self::new(layout.size(), elements_per_chunk).with_align(layout.align())
    }

    /// Sets the alignment of the elements.
    /// The pool never aligns the elements less strictly than a pointer.
    pub fn with_align(self, align: usize) -> Self {
        Self { align, ..self }
    }

    /// The element size as requested, before being raised or padded.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn elements_per_chunk(&self) -> usize {
        self.elements_per_chunk
    }

    pub fn align(&self) -> usize {
        self.align
    }

    pub(crate) fn geometry(&self) -> Result<Geometry, PoolError> {
        if self.elements_per_chunk == 0 {
            return Err(PoolError::ZeroElementsPerChunk);
        }

        let layout = Layout::from_size_align(self.element_size, self.align)?;
        Geometry::new(layout, self.elements_per_chunk)
    }
}

impl From<Layout> for PoolConfig {
    /// Uses one page worth of elements per chunk, or at least one element.
    fn from(layout: Layout) -> Self {
        const PAGE_SIZE: usize = 4096;
        let count = usize::max(1, PAGE_SIZE / usize::max(1, layout.size()));
        Self::from_layout(layout, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new() {
        let config = PoolConfig::new(3, 7);
        assert_eq!(3, config.element_size());
        assert_eq!(7, config.elements_per_chunk());
        assert_eq!(align_of::<usize>(), config.align());
    }

    #[test]
    fn for_type() {
        #[repr(align(32))]
        struct Aligned([u8; 40]);

        let config = PoolConfig::for_type::<Aligned>(5);
        assert_eq!(64, config.element_size());
        assert_eq!(32, config.align());

        let g = config.geometry().unwrap();
        assert_eq!(64, g.element_size());
        assert_eq!(32, g.element_align());
    }

    #[test]
    fn from_layout() {
        let layout = Layout::from_size_align(100, 4).unwrap();
        let config = PoolConfig::from(layout);
        assert_eq!(100, config.element_size());
        assert_eq!(40, config.elements_per_chunk());
        assert_eq!(4, config.align());

        let layout = Layout::from_size_align(8192, 8).unwrap();
        assert_eq!(1, PoolConfig::from(layout).elements_per_chunk());

        let layout = Layout::from_size_align(0, 1).unwrap();
        assert_eq!(4096, PoolConfig::from(layout).elements_per_chunk());
    }

    #[test]
    fn geometry_errors() {
        assert_eq!(
            Err(PoolError::ZeroElementsPerChunk),
            PoolConfig::new(8, 0).geometry()
        );
        // Zero elements is reported before a broken alignment.
        assert_eq!(
            Err(PoolError::ZeroElementsPerChunk),
            PoolConfig::new(8, 0).with_align(3).geometry()
        );
        assert!(matches!(
            PoolConfig::new(8, 4).with_align(3).geometry(),
            Err(PoolError::InvalidLayout(_))
        ));
        assert!(matches!(
            PoolConfig::new(8, 4).with_align(0).geometry(),
            Err(PoolError::InvalidLayout(_))
        ));
        assert_eq!(
            Err(PoolError::CapacityOverflow),
            PoolConfig::new(isize::MAX as usize / 2, 4).geometry()
        );
    }
}
