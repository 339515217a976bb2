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

use smithay_client_toolkit::reexports::client::{
    protocol::{
        wl_seat::WlSeat,
        wl_touch::{self, WlTouch},
    },
    Connection, Dispatch, Proxy, QueueHandle,
};

use crate::TouchEvent;

use super::{application::Data, seat::seat_id};

#[derive(Debug)]
pub(super) struct TouchData {
    seat: WlSeat,
}

impl TouchData {
    pub fn new(seat: WlSeat) -> Self {
        Self { seat }
    }
}

impl Dispatch<WlTouch, TouchData, Data> for Data {
    fn event(
        app_state: &mut Data,
        _: &WlTouch,
        event: <WlTouch as Proxy>::Event,
        data: &TouchData,
        _: &Connection,
        _: &QueueHandle<Data>,
    ) {
        let event = match event {
            wl_touch::Event::Down {
                surface, id, x, y, ..
            } => match app_state.bar_for_surface(&surface) {
                Some(bar) => TouchEvent::Down { bar, id, x, y },
                None => {
                    tracing::warn!(id, "touch down on an unknown surface");
                    return;
                }
            },
            wl_touch::Event::Up { id, .. } => TouchEvent::Up { id },
            wl_touch::Event::Motion { id, x, y, .. } => TouchEvent::Motion { id, x, y },
            wl_touch::Event::Cancel => TouchEvent::Cancel,
            _ => return,
        };

        if let Some(glue) = app_state.seats.get_mut(&seat_id(&data.seat)) {
            glue.seat
                .on_touch_event(event, &mut app_state.bars, &mut app_state.host);
        }
    }
}
