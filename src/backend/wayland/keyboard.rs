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

use std::{fs::File, os::unix::fs::FileExt};

use smithay_client_toolkit::reexports::client::{
    protocol::{
        wl_keyboard::{self, KeymapFormat, WlKeyboard},
        wl_seat::WlSeat,
    },
    Connection, Dispatch, Proxy, QueueHandle, WEnum,
};

use crate::{seat::KeyboardError, KeyboardEvent};

use super::{application::Data, seat::seat_id};

#[derive(Debug)]
pub(super) struct KeyboardData {
    seat: WlSeat,
}

impl KeyboardData {
    pub fn new(seat: WlSeat) -> Self {
        Self { seat }
    }
}

/// Read the xkb keymap the compositor shared. The fd may be shared with other
/// clients, so it is read without touching the file offset.
fn read_keymap(fd: impl Into<File>, size: u32) -> Result<String, KeyboardError> {
    let file = fd.into();
    let mut keymap = vec![0; size as usize];
    file.read_exact_at(&mut keymap, 0)
        .map_err(|e| KeyboardError::Read(e.to_string()))?;
    // keymap data is '\0' terminated.
    if let Some(end) = keymap.iter().position(|&b| b == 0) {
        keymap.truncate(end);
    }
    String::from_utf8(keymap).map_err(|e| KeyboardError::Read(e.to_string()))
}

impl Dispatch<WlKeyboard, KeyboardData, Data> for Data {
    fn event(
        app_state: &mut Data,
        _: &WlKeyboard,
        event: <WlKeyboard as Proxy>::Event,
        data: &KeyboardData,
        _: &Connection,
        _: &QueueHandle<Data>,
    ) {
        let id = seat_id(&data.seat);
        let glue = match app_state.seats.get_mut(&id) {
            Some(glue) => glue,
            None => return,
        };

        let event = match event {
            wl_keyboard::Event::Keymap { format, fd, size } => match format {
                WEnum::Value(KeymapFormat::XkbV1) => match read_keymap(fd, size) {
                    Ok(keymap) => KeyboardEvent::Keymap(keymap),
                    Err(e) => {
                        tracing::error!(seat = %id, "{e}, releasing keyboard");
                        glue.release_keyboard();
                        return;
                    }
                },
                WEnum::Value(format) => {
                    tracing::warn!(seat = %id, "unsupported keymap format {format:?}, releasing keyboard");
                    glue.release_keyboard();
                    return;
                }
                WEnum::Unknown(value) => {
                    tracing::warn!(seat = %id, "unknown keymap format 0x{value:x}, releasing keyboard");
                    glue.release_keyboard();
                    return;
                }
            },
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => KeyboardEvent::Modifiers {
                depressed: mods_depressed,
                latched: mods_latched,
                locked: mods_locked,
                group,
            },
            // Keys and focus are of no interest to the panel.
            _ => return,
        };

        if glue.seat.on_keyboard_modifier_event(event).is_err() {
            glue.release_keyboard();
        }
    }
}
