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

//! Foreign toplevel tracking through `zwlr_foreign_toplevel_manager_v1`.

use std::collections::HashMap;

use smithay_client_toolkit::reexports::client::{
    event_created_child, protocol::wl_seat::WlSeat, Connection, Dispatch, Proxy, QueueHandle,
};
use wayland_protocols_wlr::foreign_toplevel::v1::client::{
    zwlr_foreign_toplevel_handle_v1::{self, ZwlrForeignToplevelHandleV1},
    zwlr_foreign_toplevel_manager_v1::{self, ZwlrForeignToplevelManagerV1},
};

use crate::{exec, Host, Lifecycle, OutputInfo, SeatId};

use super::application::Data;

/// What the compositor told us about a toplevel.
#[derive(Debug, Clone, Default)]
struct ToplevelInfo {
    app_id: Option<String>,
    activated: bool,
}

#[derive(Debug)]
struct Toplevel {
    handle: ZwlrForeignToplevelHandleV1,
    pending: ToplevelInfo,
    /// State as of the last `done`; `None` before the first one.
    current: Option<ToplevelInfo>,
}

/// Every toplevel the compositor announced and has not closed yet.
#[derive(Debug, Default)]
pub(super) struct Toplevels {
    toplevels: Vec<Toplevel>,
}

impl Toplevels {
    fn get_mut(&mut self, handle: &ZwlrForeignToplevelHandleV1) -> Option<&mut Toplevel> {
        self.toplevels.iter_mut().find(|t| &t.handle == handle)
    }

    fn committed(&self) -> impl Iterator<Item = (&ZwlrForeignToplevelHandleV1, &ToplevelInfo)> {
        self.toplevels
            .iter()
            .filter_map(|t| Some((&t.handle, t.current.as_ref()?)))
    }

    pub(super) fn find_by_app_id(&self, app_id: &str) -> Option<&ZwlrForeignToplevelHandleV1> {
        self.committed()
            .find(|(_, info)| info.app_id.as_deref() == Some(app_id))
            .map(|(handle, _)| handle)
    }

    /// The number of toplevels with `app_id`, and how many of them are activated.
    pub(super) fn count(&self, app_id: &str) -> (u32, u32) {
        self.committed()
            .filter(|(_, info)| info.app_id.as_deref() == Some(app_id))
            .fold((0, 0), |(exists, activated), (_, info)| {
                (exists + 1, activated + info.activated as u32)
            })
    }
}

/// The [`Host`] interactions run against.
#[derive(Debug, Default)]
pub(super) struct WaylandHost {
    pub(super) toplevels: Toplevels,
    pub(super) wl_seats: HashMap<SeatId, WlSeat>,
    pub(super) lifecycle: Lifecycle,
}

impl Host for WaylandHost {
    type Toplevel = ZwlrForeignToplevelHandleV1;

    fn find_toplevel(&self, app_id: &str) -> Option<Self::Toplevel> {
        self.toplevels.find_by_app_id(app_id).cloned()
    }

    fn activate_toplevel(&mut self, toplevel: &Self::Toplevel, seat: SeatId) {
        match self.wl_seats.get(&seat) {
            Some(wl_seat) => toplevel.activate(wl_seat),
            None => tracing::warn!(%seat, "cannot activate toplevel for an unknown seat"),
        }
    }

    fn close_toplevel(&mut self, toplevel: &Self::Toplevel) {
        toplevel.close();
    }

    fn run_command(&mut self, command: &str, output: &OutputInfo) {
        exec::run(command, output);
    }

    fn lifecycle(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

impl Data {
    /// Refresh the toplevel counters of every item instance.
    fn toplevels_changed(&mut self) {
        let toplevels = &self.host.toplevels;
        for bar in self.bars.iter_mut() {
            bar.update_toplevel_state(|app_id| toplevels.count(app_id));
        }
    }
}

impl Dispatch<ZwlrForeignToplevelManagerV1, ()> for Data {
    fn event(
        state: &mut Data,
        _: &ZwlrForeignToplevelManagerV1,
        event: zwlr_foreign_toplevel_manager_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Data>,
    ) {
        match event {
            zwlr_foreign_toplevel_manager_v1::Event::Toplevel { toplevel } => {
                state.host.toplevels.toplevels.push(Toplevel {
                    handle: toplevel,
                    pending: ToplevelInfo::default(),
                    current: None,
                });
            }
            zwlr_foreign_toplevel_manager_v1::Event::Finished => {
                tracing::debug!("foreign toplevel manager finished");
            }
            _ => {}
        }
    }

    event_created_child!(Data, ZwlrForeignToplevelManagerV1, [
        zwlr_foreign_toplevel_manager_v1::EVT_TOPLEVEL_OPCODE => (ZwlrForeignToplevelHandleV1, ())
    ]);
}

impl Dispatch<ZwlrForeignToplevelHandleV1, ()> for Data {
    fn event(
        state: &mut Data,
        handle: &ZwlrForeignToplevelHandleV1,
        event: zwlr_foreign_toplevel_handle_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Data>,
    ) {
        match event {
            zwlr_foreign_toplevel_handle_v1::Event::AppId { app_id } => {
                if let Some(toplevel) = state.host.toplevels.get_mut(handle) {
                    toplevel.pending.app_id = Some(app_id);
                }
            }
            zwlr_foreign_toplevel_handle_v1::Event::State { state: flags } => {
                let activated = flags
                    .chunks_exact(4)
                    .filter_map(|chunk| chunk.try_into().ok())
                    .map(u32::from_ne_bytes)
                    .any(|s| s == zwlr_foreign_toplevel_handle_v1::State::Activated as u32);
                if let Some(toplevel) = state.host.toplevels.get_mut(handle) {
                    toplevel.pending.activated = activated;
                }
            }
            zwlr_foreign_toplevel_handle_v1::Event::Done => {
                if let Some(toplevel) = state.host.toplevels.get_mut(handle) {
                    toplevel.current = Some(toplevel.pending.clone());
                    tracing::trace!(id = %handle.id(), info = ?toplevel.current, "toplevel");
                }
                state.toplevels_changed();
            }
            zwlr_foreign_toplevel_handle_v1::Event::Closed => {
                state.host.toplevels.toplevels.retain(|t| &t.handle != handle);
                handle.destroy();
                state.toplevels_changed();
            }
            _ => {}
        }
    }
}
