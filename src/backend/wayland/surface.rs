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

use smithay_client_toolkit::{
    reexports::client::protocol::{
        wl_shm, wl_subsurface::WlSubsurface, wl_surface::WlSurface,
    },
    shm::slot::{Buffer, SlotPool},
};

use crate::ItemSurface;

/// A `wl_shm` backed item surface: a synchronised subsurface of the bar with
/// its own two-slot buffer pool.
pub(super) struct ShmItemSurface {
    surface: WlSurface,
    subsurface: WlSubsurface,
    pool: SlotPool,
    /// Buffers with their pixel size.
    buffers: [Option<(Buffer, u32, u32)>; 2],
}

impl ShmItemSurface {
    pub(super) fn new(surface: WlSurface, subsurface: WlSubsurface, pool: SlotPool) -> Self {
        Self {
            surface,
            subsurface,
            pool,
            buffers: [None, None],
        }
    }
}

impl ItemSurface for ShmItemSurface {
    fn set_position(&mut self, x: i32, y: i32) {
        self.subsurface.set_position(x, y);
    }

    fn acquire(&mut self, slot: usize, width: u32, height: u32) -> Option<&mut [u8]> {
        let fits = matches!(&self.buffers[slot], Some((_, w, h)) if *w == width && *h == height);
        if !fits {
            let (buffer, canvas) = match self.pool.create_buffer(
                width as i32,
                height as i32,
                width as i32 * 4,
                wl_shm::Format::Argb8888,
            ) {
                Ok(created) => created,
                Err(e) => {
                    tracing::error!("failed to allocate a {width}x{height} buffer: {e}");
                    return None;
                }
            };
            self.buffers[slot] = Some((buffer, width, height));
            return Some(canvas);
        }

        let (buffer, _, _) = self.buffers[slot].as_ref()?;
        buffer.canvas(&mut self.pool)
    }

    fn present(&mut self, slot: usize, scale: u32) {
        let Some((buffer, _, _)) = self.buffers[slot].as_ref() else {
            return;
        };
        if let Err(e) = buffer.attach_to(&self.surface) {
            tracing::warn!("failed to attach buffer: {e}");
            return;
        }
        self.surface.set_buffer_scale(scale as i32);
        self.surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
        self.surface.commit();
    }

    fn detach(&mut self) {
        self.surface.attach(None, 0, 0);
        self.surface.commit();
    }
}

impl Drop for ShmItemSurface {
    fn drop(&mut self) {
        self.subsurface.destroy();
        self.surface.destroy();
    }
}
