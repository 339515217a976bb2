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

use std::collections::hash_map::Entry;

use smithay_client_toolkit::{
    reexports::client::{
        delegate_dispatch,
        protocol::{wl_pointer::WlPointer, wl_seat::WlSeat},
        Connection, QueueHandle,
    },
    seat::{
        pointer::{
            PointerData, PointerDataExt, PointerEvent as WlPointerEvent, PointerEventKind,
            PointerHandler,
        },
        SeatState,
    },
};
use wayland_client::Proxy;
use wayland_cursor::CursorTheme;

use crate::{
    seat::{CursorImage, CursorRequest},
    PointerEvent, SeatId,
};

use super::{application::Data, seat::seat_id};

#[derive(Debug)]
pub(super) struct BarPointerData {
    /// The data required by the sctk.
    sctk_data: PointerData,
}

impl BarPointerData {
    pub fn new(seat: WlSeat) -> Self {
        Self {
            sctk_data: PointerData::new(seat),
        }
    }

    /// Seat associated with this pointer.
    pub fn seat(&self) -> &WlSeat {
        self.sctk_data.seat()
    }
}

impl PointerDataExt for BarPointerData {
    fn pointer_data(&self) -> &PointerData {
        &self.sctk_data
    }
}

impl Data {
    /// Translate one sctk pointer event. Axis events can carry both a
    /// continuous and a discrete part.
    fn translate_pointer_event(&self, event: &WlPointerEvent, out: &mut Vec<PointerEvent>) {
        let (x, y) = event.position;
        match event.kind {
            PointerEventKind::Enter { serial } => match self.bar_for_surface(&event.surface) {
                Some(bar) => out.push(PointerEvent::Enter { bar, serial, x, y }),
                None => tracing::warn!("pointer entered an unknown surface"),
            },
            PointerEventKind::Leave { .. } => out.push(PointerEvent::Leave),
            PointerEventKind::Motion { .. } => out.push(PointerEvent::Motion { x, y }),
            PointerEventKind::Press { button, .. } => out.push(PointerEvent::Button {
                code: button,
                pressed: true,
            }),
            PointerEventKind::Release { button, .. } => out.push(PointerEvent::Button {
                code: button,
                pressed: false,
            }),
            PointerEventKind::Axis { time, vertical, .. } => {
                if vertical.discrete != 0 {
                    out.push(PointerEvent::AxisDiscrete {
                        steps: vertical.discrete,
                    });
                }
                if vertical.absolute != 0. {
                    out.push(PointerEvent::Axis {
                        time,
                        value: vertical.absolute,
                    });
                }
            }
        }
    }

    /// Attach the cursor image the seat's pointer state asks for.
    fn update_cursor(&mut self, conn: &Connection, id: SeatId) {
        let Some(glue) = self.seats.get_mut(&id) else {
            return;
        };
        let wanted = glue.seat.pointer().cursor_request();
        if wanted == glue.cursor {
            return;
        }
        glue.cursor = wanted;

        let (Some(CursorRequest { image, serial }), Some(pointer)) =
            (wanted, glue.pointer.as_ref())
        else {
            return;
        };
        let scale = glue
            .seat
            .pointer()
            .bar()
            .and_then(|bar| self.bars.get(bar))
            .map_or(1, |bar| bar.output().scale);

        let config = &self.config.bar;
        let name = match image {
            CursorImage::Default => &config.cursor_name_default,
            CursorImage::Pointer => &config.cursor_name_hover,
        };
        let Some(size) = config.cursor_size.checked_mul(scale) else {
            tracing::error!(size = config.cursor_size, scale, "cursor too large");
            return;
        };
        let theme = match self.cursor_themes.entry(size) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match CursorTheme::load(conn, self.shm.wl_shm().clone(), size) {
                Ok(theme) => entry.insert(theme),
                Err(e) => {
                    tracing::error!("failed to load cursor theme: {e}");
                    return;
                }
            },
        };
        let Some(cursor) = theme.get_cursor(name) else {
            tracing::error!(name = %name, "cursor not found in theme");
            return;
        };

        let buffer = &cursor[0];
        let (hotspot_x, hotspot_y) = buffer.hotspot();
        let surface = &glue.cursor_surface;
        surface.set_buffer_scale(scale as i32);
        surface.attach(Some(&**buffer), 0, 0);
        surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
        surface.commit();
        pointer.set_cursor(
            serial,
            Some(surface),
            (hotspot_x / scale) as i32,
            (hotspot_y / scale) as i32,
        );
    }
}

impl PointerHandler for Data {
    fn pointer_frame(
        &mut self,
        conn: &Connection,
        _: &QueueHandle<Self>,
        pointer: &WlPointer,
        events: &[WlPointerEvent],
    ) {
        let Some(data) = pointer.data::<BarPointerData>() else {
            return;
        };
        let id = seat_id(data.seat());

        let mut translated = Vec::with_capacity(events.len() + 1);
        for event in events {
            self.translate_pointer_event(event, &mut translated);
        }
        translated.push(PointerEvent::Frame);

        let Some(glue) = self.seats.get_mut(&id) else {
            return;
        };
        for event in translated {
            glue.seat
                .on_pointer_event(event, &mut self.bars, &mut self.host);
        }
        self.update_cursor(conn, id);
    }
}

delegate_dispatch!(Data: [ WlPointer: BarPointerData] => SeatState);
