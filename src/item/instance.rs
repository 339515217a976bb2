// Copyright 2023 The Dockbar Authors.
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

use std::rc::Rc;

use kurbo::Rect;

use super::Item;
use crate::counter::Counter;

/// The double-buffered surface an item instance presents into.
///
/// Slots are `0` and `1`. Dropping the surface releases both buffers.
pub trait ItemSurface {
    /// Move the surface relative to its bar.
    fn set_position(&mut self, x: i32, y: i32);

    /// Pixel memory of `slot`, sized for `width`x`height` buffer pixels, or
    /// `None` while the compositor still holds the previous submission of it.
    fn acquire(&mut self, slot: usize, width: u32, height: u32) -> Option<&mut [u8]>;

    /// Damage the whole buffer, attach `slot` at `scale` and commit.
    fn present(&mut self, slot: usize, scale: u32);

    /// Remove any presented content.
    fn detach(&mut self);
}

/// One occurrence of an [`Item`] on a bar.
pub struct ItemInstance {
    pub(crate) item: Rc<Item>,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) hover: Counter,
    pub(crate) press: Counter,
    /// Number of toplevels matching the item's app id. Not rendered.
    pub(crate) toplevel_exists: Counter,
    /// Number of activated toplevels matching the item's app id. Not rendered.
    pub(crate) toplevel_activated: Counter,
    pub(crate) dirty: bool,
    pub(crate) surface: Box<dyn ItemSurface>,
    pub(crate) current_buffer: Option<usize>,
}

impl ItemInstance {
    pub fn new(
        item: Rc<Item>,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        mut surface: Box<dyn ItemSurface>,
    ) -> Self {
        surface.set_position(x, y);
        Self {
            item,
            x,
            y,
            width,
            height,
            hover: Counter::ZERO,
            press: Counter::ZERO,
            toplevel_exists: Counter::ZERO,
            toplevel_activated: Counter::ZERO,
            dirty: true,
            surface,
            current_buffer: None,
        }
    }

    pub fn item(&self) -> &Rc<Item> {
        &self.item
    }

    /// Logical rectangle of the instance inside its bar.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(
            (self.x as f64, self.y as f64),
            (self.width as f64, self.height as f64),
        )
    }

    /// Half-open containment: the right and bottom edges belong to the next
    /// instance.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let r = self.rect();
        x >= r.x0 && x < r.x1 && y >= r.y0 && y < r.y1
    }

    pub fn hover(&self) -> u32 {
        self.hover.get()
    }

    pub fn press(&self) -> u32 {
        self.press.get()
    }

    pub fn toplevel_exists(&self) -> u32 {
        self.toplevel_exists.get()
    }

    pub fn toplevel_activated(&self) -> u32 {
        self.toplevel_activated.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Enter the instance with a pointer or touch: one more hover and `depth`
    /// more presses.
    pub(crate) fn enter(&mut self, depth: u32) {
        self.hover.increment();
        self.press.add(depth);
        self.dirty = true;
    }

    /// Undo [`enter`](Self::enter).
    pub(crate) fn leave(&mut self, depth: u32) {
        self.hover.decrement();
        self.press.subtract(depth);
        self.dirty = true;
    }

    pub(crate) fn set_toplevel_state(&mut self, exists: u32, activated: u32) {
        self.toplevel_exists.set(exists);
        self.toplevel_activated.set(activated);
    }
}

impl std::fmt::Debug for ItemInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ItemInstance")
            .field("kind", &self.item.kind())
            .field("rect", &self.rect())
            .field("hover", &self.hover)
            .field("press", &self.press)
            .field("dirty", &self.dirty)
            .field("current_buffer", &self.current_buffer)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_surface {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Default)]
    struct Inner {
        buffers: [Option<(u32, u32, Vec<u8>)>; 2],
        held: [bool; 2],
        presented: Vec<(usize, u32)>,
        detached: usize,
        position: (i32, i32),
    }

    /// An [`ItemSurface`] backed by plain memory. Presented buffers stay held
    /// until [`release`](Self::release) is called, like a compositor would.
    #[derive(Clone, Default)]
    pub(crate) struct MemorySurface(Rc<RefCell<Inner>>);

    impl MemorySurface {
        pub fn release(&self, slot: usize) {
            self.0.borrow_mut().held[slot] = false;
        }

        pub fn presented(&self) -> Vec<(usize, u32)> {
            self.0.borrow().presented.clone()
        }

        pub fn detached(&self) -> usize {
            self.0.borrow().detached
        }

        pub fn position(&self) -> (i32, i32) {
            self.0.borrow().position
        }

        pub fn buffer_size(&self, slot: usize) -> Option<(u32, u32)> {
            self.0.borrow().buffers[slot]
                .as_ref()
                .map(|(w, h, _)| (*w, *h))
        }

        pub fn pixel(&self, slot: usize, x: u32, y: u32) -> [u8; 4] {
            let inner = self.0.borrow();
            let (w, _, data) = inner.buffers[slot].as_ref().unwrap();
            let i = ((y * w + x) * 4) as usize;
            [data[i], data[i + 1], data[i + 2], data[i + 3]]
        }
    }

    /// Owns the memory the instance paints into; shares it with the
    /// [`MemorySurface`] handle kept by the test.
    struct Backing {
        shared: MemorySurface,
        scratch: Vec<u8>,
    }

    impl ItemSurface for Backing {
        fn set_position(&mut self, x: i32, y: i32) {
            self.shared.0.borrow_mut().position = (x, y);
        }

        fn acquire(&mut self, slot: usize, width: u32, height: u32) -> Option<&mut [u8]> {
            if self.shared.0.borrow().held[slot] {
                return None;
            }
            self.scratch.clear();
            self.scratch.resize((width * height * 4) as usize, 0xaa);
            self.shared.0.borrow_mut().buffers[slot] = Some((width, height, Vec::new()));
            Some(self.scratch.as_mut_slice())
        }

        fn present(&mut self, slot: usize, scale: u32) {
            let mut inner = self.shared.0.borrow_mut();
            if let Some((_, _, data)) = inner.buffers[slot].as_mut() {
                data.clone_from(&self.scratch);
            }
            inner.held[slot] = true;
            inner.presented.push((slot, scale));
        }

        fn detach(&mut self) {
            self.shared.0.borrow_mut().detached += 1;
        }
    }

    impl ItemInstance {
        pub(crate) fn new_with_memory(
            item: Rc<Item>,
            width: u32,
            height: u32,
        ) -> (Self, MemorySurface) {
            let shared = MemorySurface::default();
            let backing = Backing {
                shared: shared.clone(),
                scratch: Vec::new(),
            };
            let instance = ItemInstance::new(item, 0, 0, width, height, Box::new(backing));
            (instance, shared)
        }
    }

    pub(crate) fn memory_surface() -> (Box<dyn ItemSurface>, MemorySurface) {
        let shared = MemorySurface::default();
        let backing = Backing {
            shared: shared.clone(),
            scratch: Vec::new(),
        };
        (Box::new(backing), shared)
    }
}
