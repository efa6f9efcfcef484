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

use core::ptr::NonNull;

/// Forward link stored in the first word of a free slot.
///
/// A `Node` is never constructed by the pool itself. It exists only as a view over the memory of
/// a slot while the slot is free, and the caller overwrites it as soon as the slot is allocated.
#[repr(C)]
pub struct Node {
    next: Option<NonNull<Node>>,
}

/// LIFO stack of free slots, threaded through the slots' own bytes.
pub struct FreeStack {
    head: Option<NonNull<Node>>,
}

impl Default for FreeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeStack {
    /// Creates an empty stack.
    pub const fn new() -> Self {
        Self { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Detaches the most recently pushed slot and returns it.
    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        self.head.map(|node| unsafe {
            self.head = node.as_ref().next;
            node.cast::<u8>()
        })
    }

    /// Prepends `slot` .
    ///
    /// # Safety
    ///
    /// `slot` must be writable for `size_of::<Node>()` bytes, aligned for `Node` , and must not be
    /// used by anyone else until it is popped again.
    pub unsafe fn push(&mut self, slot: NonNull<u8>) {
        let mut node = slot.cast::<Node>();
        node.as_mut().next = self.head;
        self.head = Some(node);
    }

    /// Counts the slots by walking the links.
    pub fn len(&self) -> usize {
        let mut next = self.head;
        let mut ret = 0;
        while let Some(node) = next {
            next = unsafe { node.as_ref().next };
            ret += 1;
        }

        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node { next: None }
    }

    #[test]
    fn pop_and_push() {
        let mut head = FreeStack::new();
        let mut fst = node();
        let mut snd = node();

        let fst = NonNull::new(&mut fst).unwrap().cast::<u8>();
        let snd = NonNull::new(&mut snd).unwrap().cast::<u8>();

        {
            assert_eq!(None, head.pop());
            assert!(head.is_empty());
        }

        unsafe {
            head.push(fst);
            assert_eq!(1, head.len());
            assert_eq!(Some(fst), head.pop());
            assert_eq!(None, head.pop());
        }

        unsafe {
            head.push(fst);
            head.push(snd);
            assert_eq!(2, head.len());
            assert_eq!(Some(snd), head.pop());
            assert_eq!(Some(fst), head.pop());
            assert_eq!(None, head.pop());
            assert!(head.is_empty());
        }
    }

    #[test]
    fn push_only_touches_first_word() {
        let mut slots = [[0xabu8; 32]; 2];
        let mut head = FreeStack::new();

        unsafe {
            let (fst, snd) = slots.split_at_mut(1);
            let fst = NonNull::new(fst[0].as_mut_ptr()).unwrap();
            let snd = NonNull::new(snd[0].as_mut_ptr()).unwrap();

            // Align the slots for Node .
            let fst = NonNull::new(align_up(fst.as_ptr())).unwrap();
            let snd = NonNull::new(align_up(snd.as_ptr())).unwrap();

            head.push(fst);
            head.push(snd);
        }

        let link = core::mem::size_of::<Node>();
        for slot in &slots {
            // At most one link (plus the alignment gap) has been written.
            assert!(slot.iter().rev().take(32 - 2 * link).all(|&b| b == 0xab));
        }
    }

    fn align_up(ptr: *mut u8) -> *mut u8 {
        let align = core::mem::align_of::<Node>();
        let addr = ptr as usize;
        let offset = (align - addr % align) % align;
        unsafe { ptr.add(offset) }
    }
}
