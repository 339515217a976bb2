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

//! The wayland event loop.

use std::collections::HashMap;

use calloop::{
    signals::{Signal, Signals},
    EventLoop,
};
use smithay_client_toolkit::{
    compositor::CompositorState,
    delegate_compositor, delegate_layer, delegate_output, delegate_registry, delegate_seat,
    delegate_shm,
    output::{OutputHandler, OutputState},
    reexports::client::{
        delegate_noop,
        globals::registry_queue_init,
        protocol::{
            wl_output::WlOutput, wl_region::WlRegion, wl_subcompositor::WlSubcompositor,
            wl_subsurface::WlSubsurface,
        },
        Connection, QueueHandle, WaylandSource,
    },
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::SeatState,
    shell::wlr_layer::LayerShell,
    shm::{Shm, ShmHandler},
};
use wayland_cursor::CursorTheme;
use wayland_protocols_wlr::foreign_toplevel::v1::client::zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1;

use crate::{BarId, Bars, Config, Host, SeatId};

use super::{bar::Panel, error::Error, seat::SeatGlue, toplevel::WaylandHost};

pub(super) struct Data {
    pub(super) registry_state: RegistryState,
    pub(super) seat_state: SeatState,
    pub(super) output_state: OutputState,
    pub(super) compositor: CompositorState,
    pub(super) subcompositor: WlSubcompositor,
    pub(super) shm: Shm,
    pub(super) layer_shell: LayerShell,
    /// Kept alive so toplevel events keep arriving.
    pub(super) toplevel_manager: Option<ZwlrForeignToplevelManagerV1>,

    pub(super) config: Config,
    pub(super) bars: Bars,
    pub(super) panels: HashMap<BarId, Panel>,
    pub(super) seats: HashMap<SeatId, SeatGlue>,
    pub(super) host: WaylandHost,
    /// Cursor themes by pixel size.
    pub(super) cursor_themes: HashMap<u32, CursorTheme>,
}

impl Data {
    /// Read the configuration again and rebuild every bar from it. A file
    /// that fails to load is reported and the current bars stay up.
    fn reload(&mut self, qh: &QueueHandle<Self>) {
        tracing::info!(path = %self.config.path.display(), "reloading");
        self.host.lifecycle().restart();
        let config = match self.config.reload() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("keeping the current configuration: {e}");
                return;
            }
        };
        self.destroy_bars();
        self.config = config;
        self.sync_capabilities(qh);
        for output in self.output_state.outputs() {
            self.create_bar(qh, output);
        }
    }
}

/// Connect to the compositor and run the panel until it is asked to exit.
pub fn run(config: Config) -> Result<(), Error> {
    let conn = Connection::connect_to_env()?;
    let (globals, event_queue) = registry_queue_init::<Data>(&conn)?;
    let qh = event_queue.handle();

    let mut event_loop: EventLoop<Data> = EventLoop::try_new().map_err(Error::event_loop)?;
    let handle = event_loop.handle();
    WaylandSource::new(event_queue)
        .map_err(Error::event_loop)?
        .insert(handle.clone())
        .map_err(|e| Error::event_loop(e.error))?;

    let signals = Signals::new(&[Signal::SIGUSR1, Signal::SIGINT, Signal::SIGTERM])
        .map_err(Error::event_loop)?;
    handle
        .insert_source(signals, |event, _, data| match event.signal() {
            Signal::SIGUSR1 => {
                tracing::info!("received SIGUSR1, reloading");
                data.host.lifecycle().request_reload();
            }
            signal => {
                tracing::info!(?signal, "exiting");
                data.host.lifecycle().request_exit();
            }
        })
        .map_err(|e| Error::event_loop(e.error))?;

    let compositor =
        CompositorState::bind(&globals, &qh).map_err(|e| Error::bind("wl_compositor", e))?;
    let subcompositor = globals
        .bind::<WlSubcompositor, _, _>(&qh, 1..=1, ())
        .map_err(|e| Error::bind("wl_subcompositor", e))?;
    let shm = Shm::bind(&globals, &qh).map_err(|e| Error::bind("wl_shm", e))?;
    let layer_shell =
        LayerShell::bind(&globals, &qh).map_err(|e| Error::bind("zwlr_layer_shell_v1", e))?;
    let toplevel_manager = globals
        .bind::<ZwlrForeignToplevelManagerV1, _, _>(&qh, 1..=3, ())
        .map_err(|e| tracing::warn!("toplevel meta-actions are unavailable: {e}"))
        .ok();

    let mut data = Data {
        registry_state: RegistryState::new(&globals),
        seat_state: SeatState::new(&globals, &qh),
        output_state: OutputState::new(&globals, &qh),
        compositor,
        subcompositor,
        shm,
        layer_shell,
        toplevel_manager,
        config,
        bars: Bars::new(),
        panels: HashMap::new(),
        seats: HashMap::new(),
        host: WaylandHost::default(),
        cursor_themes: HashMap::new(),
    };

    loop {
        while data.host.lifecycle.is_running() {
            event_loop
                .dispatch(None, &mut data)
                .map_err(Error::event_loop)?;
            data.flush_frames(&qh);
            if let Err(e) = conn.flush() {
                tracing::warn!("failed to flush the connection: {e}");
            }
        }
        if !data.host.lifecycle.wants_reload() {
            break;
        }
        data.reload(&qh);
    }

    data.destroy_bars();
    if let Some(manager) = data.toplevel_manager.take() {
        manager.stop();
    }
    let _ = conn.flush();
    Ok(())
}

impl ProvidesRegistryState for Data {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

impl OutputHandler for Data {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(&mut self, _: &Connection, qh: &QueueHandle<Self>, output: WlOutput) {
        self.create_bar(qh, output);
    }

    fn update_output(&mut self, _: &Connection, _: &QueueHandle<Self>, output: WlOutput) {
        self.output_scale_changed(&output);
    }

    fn output_destroyed(&mut self, _: &Connection, _: &QueueHandle<Self>, output: WlOutput) {
        self.output_removed(&output);
    }
}

impl ShmHandler for Data {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

delegate_compositor!(Data);
delegate_output!(Data);
delegate_shm!(Data);
delegate_seat!(Data);
delegate_layer!(Data);
delegate_registry!(Data);
delegate_noop!(Data: WlSubcompositor);
delegate_noop!(Data: WlSubsurface);
delegate_noop!(Data: WlRegion);
