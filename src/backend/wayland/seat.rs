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
    reexports::client::{
        protocol::{
            wl_keyboard::WlKeyboard, wl_pointer::WlPointer, wl_seat::WlSeat,
            wl_surface::WlSurface, wl_touch::WlTouch,
        },
        Connection, Proxy, QueueHandle,
    },
    seat::{Capability, SeatHandler, SeatState},
};

use crate::{
    seat::{CursorRequest, Seat},
    SeatId,
};

use super::{
    application::Data, keyboard::KeyboardData, pointer::BarPointerData, touch::TouchData,
};

pub(super) fn seat_id(seat: &WlSeat) -> SeatId {
    SeatId(seat.id().protocol_id())
}

/// A seat together with the protocol objects bound on it.
#[derive(Debug)]
pub(super) struct SeatGlue {
    pub(super) seat: Seat,
    pub(super) wl_seat: WlSeat,
    pub(super) keyboard: Option<WlKeyboard>,
    pub(super) pointer: Option<WlPointer>,
    pub(super) touch: Option<WlTouch>,
    pub(super) cursor_surface: WlSurface,
    /// The cursor last set for this seat.
    pub(super) cursor: Option<CursorRequest>,
}

impl SeatGlue {
    /// Drop the keyboard, as when its keymap cannot be used.
    pub(super) fn release_keyboard(&mut self) {
        self.seat.release_keyboard();
        if let Some(keyboard) = self.keyboard.take() {
            if keyboard.version() >= 3 {
                keyboard.release();
            }
        }
    }
}

impl Data {
    fn bind_capability(&mut self, qh: &QueueHandle<Self>, id: SeatId, capability: Capability) {
        let Some(glue) = self.seats.get_mut(&id) else {
            return;
        };
        let needs = self.config.needs;
        match capability {
            Capability::Keyboard if needs.keyboard && glue.keyboard.is_none() => {
                let keyboard = glue
                    .wl_seat
                    .get_keyboard(qh, KeyboardData::new(glue.wl_seat.clone()));
                glue.keyboard = Some(keyboard);
                glue.seat.bind_keyboard();
            }
            Capability::Pointer if needs.pointer && glue.pointer.is_none() => {
                let data = BarPointerData::new(glue.wl_seat.clone());
                match self.seat_state.get_pointer_with_data(qh, &glue.wl_seat, data) {
                    Ok(pointer) => {
                        tracing::debug!(seat = %id, "binding pointer");
                        glue.pointer = Some(pointer);
                    }
                    Err(e) => tracing::warn!(seat = %id, "failed to bind pointer: {e}"),
                }
            }
            Capability::Touch if needs.touch && glue.touch.is_none() => {
                tracing::debug!(seat = %id, "binding touch");
                let touch = glue
                    .wl_seat
                    .get_touch(qh, TouchData::new(glue.wl_seat.clone()));
                glue.touch = Some(touch);
            }
            _ => {}
        }
    }

    fn release_capability(&mut self, id: SeatId, capability: Capability) {
        let Some(glue) = self.seats.get_mut(&id) else {
            return;
        };
        match capability {
            Capability::Keyboard => glue.release_keyboard(),
            Capability::Pointer => {
                glue.seat.release_pointer(&mut self.bars);
                glue.cursor = None;
                if let Some(pointer) = glue.pointer.take() {
                    if pointer.version() >= 3 {
                        pointer.release();
                    }
                }
            }
            Capability::Touch => {
                glue.seat.release_touch(&mut self.bars);
                if let Some(touch) = glue.touch.take() {
                    if touch.version() >= 3 {
                        touch.release();
                    }
                }
            }
            _ => {}
        }
    }

    /// Bind what the current configuration needs and release what it doesn't.
    pub(super) fn sync_capabilities(&mut self, qh: &QueueHandle<Self>) {
        let needs = self.config.needs;
        let ids: Vec<_> = self.seats.keys().copied().collect();
        for id in ids {
            let Some(info) = self
                .seats
                .get(&id)
                .and_then(|glue| self.seat_state.info(&glue.wl_seat))
            else {
                continue;
            };
            for (capability, present, needed) in [
                (Capability::Keyboard, info.has_keyboard, needs.keyboard),
                (Capability::Pointer, info.has_pointer, needs.pointer),
                (Capability::Touch, info.has_touch, needs.touch),
            ] {
                if present && needed {
                    self.bind_capability(qh, id, capability);
                } else {
                    self.release_capability(id, capability);
                }
            }
        }
    }
}

impl SeatHandler for Data {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _: &Connection, qh: &QueueHandle<Self>, seat: WlSeat) {
        let id = seat_id(&seat);
        tracing::debug!(seat = %id, "new seat");
        self.host.wl_seats.insert(id, seat.clone());
        self.seats.insert(
            id,
            SeatGlue {
                seat: Seat::new(id),
                wl_seat: seat,
                keyboard: None,
                pointer: None,
                touch: None,
                cursor_surface: self.compositor.create_surface(qh),
                cursor: None,
            },
        );
    }

    fn new_capability(
        &mut self,
        _: &Connection,
        qh: &QueueHandle<Self>,
        seat: WlSeat,
        capability: Capability,
    ) {
        self.bind_capability(qh, seat_id(&seat), capability);
    }

    fn remove_capability(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        seat: WlSeat,
        capability: Capability,
    ) {
        self.release_capability(seat_id(&seat), capability);
    }

    fn remove_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, seat: WlSeat) {
        let id = seat_id(&seat);
        for capability in [Capability::Keyboard, Capability::Pointer, Capability::Touch] {
            self.release_capability(id, capability);
        }
        if let Some(mut glue) = self.seats.remove(&id) {
            glue.seat.release(&mut self.bars);
            glue.cursor_surface.destroy();
        }
        self.host.wl_seats.remove(&id);
    }
}
