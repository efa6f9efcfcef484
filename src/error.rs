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

use core::alloc::{Layout, LayoutError};
use thiserror::Error;

/// Error type of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A chunk must hold at least one element.
    #[error("elements per chunk must be greater than zero")]
    ZeroElementsPerChunk,

    /// The requested element size and alignment do not form a valid `Layout` .
    #[error("invalid element layout: {0}")]
    InvalidLayout(#[from] LayoutError),

    /// The chunk size does not fit in `isize` .
    #[error("chunk size overflows")]
    CapacityOverflow,

    /// The backend allocator returned null for a new chunk.
    #[error("failed to allocate a chunk of {} bytes", .layout.size())]
    OutOfMemory { layout: Layout },

    /// No chunk of the pool contains the pointer.
    #[error("pointer {addr:#x} is not owned by the pool")]
    ForeignPointer { addr: usize },

    /// The pointer is in a slab but not at the start of a slot.
    #[error("pointer {addr:#x} is {offset} bytes past the start of its slot")]
    MisalignedPointer { addr: usize, offset: usize },
}
