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

#![doc = include_str!("../README.md")]

mod chunk;
mod config;
mod error;
pub mod ffi;
mod free_stack;
mod pool;

pub use crate::config::PoolConfig;
pub use crate::error::PoolError;
pub use crate::pool::Pool;
use core::mem::size_of;

/// The minimum element size. A free element holds a link to the next free element.
pub const MIN_ELEMENT_SIZE: usize = size_of::<free_stack::Node>();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_element_size() {
        assert_eq!(size_of::<*mut u8>(), MIN_ELEMENT_SIZE);
        assert_eq!(MIN_ELEMENT_SIZE, Pool::new(0, 1).unwrap().element_size());
    }
}
