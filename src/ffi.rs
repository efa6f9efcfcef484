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

//! C ABI over [`Pool`] .
//!
//! Every function accepts a null handle. `pool_new` returns null on failure, and the other
//! functions do nothing (or return null) when passed null.
//!
//! [`Pool`]: ../struct.Pool.html

use crate::Pool;
use core::alloc::{GlobalAlloc, Layout};
use core::ffi::c_void;
use core::ptr::{self, NonNull};
use std::alloc::System;
use tracing::debug;

/// Creates a pool and returns the handle.
///
/// Returns null if `elements_per_chunk` is 0 or if the handle can not be allocated.
/// The handle must be passed to `pool_delete` to release the memory.
#[no_mangle]
pub extern "C" fn pool_new(element_size: usize, elements_per_chunk: usize) -> *mut Pool {
    let pool = match Pool::new(element_size, elements_per_chunk) {
        Ok(pool) => pool,
        Err(err) => {
            debug!(%err, element_size, elements_per_chunk, "pool_new failed");
            return ptr::null_mut();
        }
    };

    unsafe {
        let handle = System.alloc(Layout::new::<Pool>()).cast::<Pool>();
        if handle.is_null() {
            return handle;
        }

        handle.write(pool);
        handle
    }
}

/// Returns an element of `pool` , or null if `pool` is null or out of memory.
///
/// # Safety
///
/// `pool` must be null or a handle returned by `pool_new` which is not deleted yet.
#[no_mangle]
pub unsafe extern "C" fn pool_malloc(pool: *mut Pool) -> *mut c_void {
    match pool.as_mut().and_then(Pool::allocate) {
        Some(ptr) => ptr.as_ptr().cast::<c_void>(),
        None => ptr::null_mut(),
    }
}

/// Caches `ptr` to `pool` again.
///
/// Nothing is done if `pool` or `ptr` is null, or if `ptr` is not owned by `pool` .
///
/// # Safety
///
/// `pool` must be null or a handle returned by `pool_new` which is not deleted yet.
/// If `ptr` is owned by `pool` , it must have been returned by `pool_malloc` and must not have
/// been freed since then.
#[no_mangle]
pub unsafe extern "C" fn pool_free(pool: *mut Pool, ptr: *mut c_void) {
    if let (Some(pool), Some(ptr)) = (pool.as_mut(), NonNull::new(ptr.cast::<u8>())) {
        pool.release(ptr);
    }
}

/// Releases every chunk of `pool` and the handle itself.
///
/// # Safety
///
/// `pool` must be null or a handle returned by `pool_new` which is not deleted yet.
/// Neither `pool` nor the pointers returned by `pool_malloc` are valid after this call.
#[no_mangle]
pub unsafe extern "C" fn pool_delete(pool: *mut Pool) {
    if pool.is_null() {
        return;
    }

    ptr::drop_in_place(pool);
    System.dealloc(pool.cast::<u8>(), Layout::new::<Pool>());
}
