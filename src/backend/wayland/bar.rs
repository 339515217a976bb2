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

//! Layer surfaces: the wayland side of a bar instance.

use std::error::Error as StdError;

use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    reexports::client::{
        protocol::{
            wl_output::WlOutput, wl_shm, wl_subcompositor::WlSubcompositor,
            wl_surface::WlSurface,
        },
        Connection, QueueHandle,
    },
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm,
    },
};

use crate::{
    bar::{BarId, BarInstance, OutputInfo},
    config::{self, Position},
    render::{self, Color},
    Item, ItemSurface,
};

use super::{application::Data, surface::ShmItemSurface};

/// The layer surface a bar is drawn on. Item instances are subsurfaces of it.
pub(super) struct Panel {
    pub(super) output: WlOutput,
    pub(super) layer: LayerSurface,
    pool: SlotPool,
    background: Color,
    /// The background buffer and the `(width, height, scale, hidden)` it was
    /// painted for.
    painted: Option<(Buffer, (u32, u32, u32, bool))>,
    configured: bool,
    frame_pending: bool,
}

impl Panel {
    fn surface(&self) -> &WlSurface {
        self.layer.wl_surface()
    }

    /// Repaint the background if the bar changed size or scale, render every
    /// dirty item instance and commit.
    fn draw(&mut self, bar: &mut BarInstance) {
        let (width, height) = bar.dimensions();
        let scale = bar.output().scale;
        let hidden = bar.is_hidden();
        let wanted = (width, height, scale, hidden);

        if self.painted.as_ref().map(|(_, painted)| *painted) != Some(wanted) {
            self.paint_background(bar, wanted);
        }

        bar.take_frame_request();
        let presented = bar.render_dirty();
        tracing::trace!(bar = %bar.id(), presented, "drew bar");
        if bar.has_dirty() {
            bar.schedule_frame();
        }
        self.surface().commit();
    }

    fn paint_background(&mut self, bar: &BarInstance, key: (u32, u32, u32, bool)) {
        let (width, height, scale, hidden) = key;
        let Some((w, h)) = render::buffer_size(width, height, scale) else {
            tracing::error!(bar = %bar.id(), width, height, scale, "bar too large to draw");
            return;
        };
        let background = if hidden {
            Color::TRANSPARENT
        } else {
            self.background
        };
        let (buffer, data) = match self.pool.create_buffer(
            w as i32,
            h as i32,
            w as i32 * 4,
            wl_shm::Format::Argb8888,
        ) {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(bar = %bar.id(), "failed to allocate background: {e}");
                return;
            }
        };
        render::paint_argb8888(data, w, h, |pixmap| render::fill(pixmap, background));

        let surface = self.layer.wl_surface();
        match buffer.attach_to(surface) {
            Ok(()) => {
                surface.set_buffer_scale(scale as i32);
                surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
                self.painted = Some((buffer, key));
            }
            Err(e) => tracing::warn!(bar = %bar.id(), "failed to attach background: {e}"),
        }
    }

    fn request_frame(&mut self, qh: &QueueHandle<Data>) {
        let surface = self.surface();
        surface.frame(qh, surface.clone());
        surface.commit();
        self.frame_pending = true;
    }
}

fn layer(layer: config::Layer) -> Layer {
    match layer {
        config::Layer::Background => Layer::Background,
        config::Layer::Bottom => Layer::Bottom,
        config::Layer::Top => Layer::Top,
        config::Layer::Overlay => Layer::Overlay,
    }
}

fn anchor(position: Position) -> Anchor {
    match position {
        Position::Top => Anchor::TOP,
        Position::Bottom => Anchor::BOTTOM,
        Position::Left => Anchor::LEFT,
        Position::Right => Anchor::RIGHT,
    }
}

/// Create the subsurface and buffer pool of one item instance.
fn item_surface(
    compositor: &CompositorState,
    subcompositor: &WlSubcompositor,
    shm: &Shm,
    qh: &QueueHandle<Data>,
    parent: &WlSurface,
    side: u32,
    item: &Item,
) -> Result<Box<dyn ItemSurface>, Box<dyn StdError>> {
    let len = if item.is_button() {
        render::buffer_len(side, side)
            .and_then(|len| len.checked_mul(2))
            .ok_or("item buffer too large")?
    } else {
        4096
    };
    let pool = SlotPool::new(len, shm)?;

    let surface = compositor.create_surface(qh);
    let subsurface = subcompositor.get_subsurface(&surface, parent, qh, ());
    subsurface.set_sync();
    let region = compositor.wl_compositor().create_region(qh, ());
    surface.set_input_region(Some(&region));
    region.destroy();

    Ok(Box::new(ShmItemSurface::new(surface, subsurface, pool)))
}

impl Data {
    pub(super) fn create_bar(&mut self, qh: &QueueHandle<Self>, output: WlOutput) {
        let Some(info) = self.output_state.info(&output) else {
            tracing::warn!("ignoring output without information");
            return;
        };
        let name = info
            .name
            .clone()
            .unwrap_or_else(|| format!("output-{}", info.id));
        let scale = info.scale_factor.max(1) as u32;

        let config = &self.config.bar;
        let Some(side) = config.size.checked_mul(scale) else {
            tracing::error!(output = %name, size = config.size, scale, "bar too large");
            return;
        };
        let Some(len) = render::buffer_len(side, side) else {
            tracing::error!(output = %name, size = config.size, scale, "bar too large");
            return;
        };
        let pool = match SlotPool::new(len, &self.shm) {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!(output = %name, "failed to create a buffer pool: {e}");
                return;
            }
        };
        let surface = self.compositor.create_surface(qh);

        let (compositor, subcompositor, shm) = (&self.compositor, &self.subcompositor, &self.shm);
        let output_info = OutputInfo::new(name.clone(), scale);
        let built = self.bars.try_insert_with(|id| {
            BarInstance::try_new(
                id,
                output_info,
                config.position.orientation(),
                config.size,
                config.style(),
                &self.config.items,
                |item| item_surface(compositor, subcompositor, shm, qh, &surface, side, item),
            )
        });
        let id = match built {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(output = %name, "failed to create bar: {e}");
                surface.destroy();
                return;
            }
        };

        let layer_surface = self.layer_shell.create_layer_surface(
            qh,
            surface,
            layer(config.layer),
            Some(config.namespace.clone()),
            Some(&output),
        );
        let (width, height) = match self.bars.get_mut(id) {
            Some(bar) => {
                bar.set_hidden_mode(config.hidden_mode);
                bar.dimensions()
            }
            None => (0, 0),
        };
        layer_surface.set_anchor(anchor(config.position));
        layer_surface.set_size(width, height);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::None);
        if config.exclusive_zone {
            layer_surface.set_exclusive_zone(config.size as i32);
        }
        layer_surface.commit();

        tracing::debug!(bar = %id, output = %name, width, height, "created bar");
        self.panels.insert(
            id,
            Panel {
                output,
                layer: layer_surface,
                pool,
                background: config.background_colour,
                painted: None,
                configured: false,
                frame_pending: false,
            },
        );
    }

    /// Remove a bar after every seat has let go of it.
    pub(super) fn destroy_bar(&mut self, id: BarId) {
        for glue in self.seats.values_mut() {
            glue.seat.forget_bar(&mut self.bars, id);
        }
        // Item subsurfaces go before their parent.
        self.bars.remove(id);
        self.panels.remove(&id);
        tracing::debug!(bar = %id, "destroyed bar");
    }

    pub(super) fn destroy_bars(&mut self) {
        for id in self.bars.ids() {
            self.destroy_bar(id);
        }
    }

    pub(super) fn bar_for_surface(&self, surface: &WlSurface) -> Option<BarId> {
        self.panels
            .iter()
            .find(|(_, panel)| panel.surface() == surface)
            .map(|(id, _)| *id)
    }

    fn bar_for_output(&self, output: &WlOutput) -> Option<BarId> {
        self.panels
            .iter()
            .find(|(_, panel)| &panel.output == output)
            .map(|(id, _)| *id)
    }

    fn draw(&mut self, id: BarId) {
        if let (Some(panel), Some(bar)) = (self.panels.get_mut(&id), self.bars.get_mut(id)) {
            panel.draw(bar);
        }
    }

    /// Turn the frame requests of configured bars into frame callbacks.
    pub(super) fn flush_frames(&mut self, qh: &QueueHandle<Self>) {
        for (id, panel) in &mut self.panels {
            let Some(bar) = self.bars.get_mut(*id) else {
                continue;
            };
            if panel.configured && !panel.frame_pending && bar.take_frame_request() {
                panel.request_frame(qh);
            }
        }
    }

    pub(super) fn output_scale_changed(&mut self, output: &WlOutput) {
        let Some(id) = self.bar_for_output(output) else {
            return;
        };
        let Some(info) = self.output_state.info(output) else {
            return;
        };
        if let Some(bar) = self.bars.get_mut(id) {
            bar.set_scale(info.scale_factor.max(1) as u32);
        }
    }

    pub(super) fn output_removed(&mut self, output: &WlOutput) {
        if let Some(id) = self.bar_for_output(output) {
            self.destroy_bar(id);
        }
    }
}

impl CompositorHandler for Data {
    fn scale_factor_changed(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &WlSurface,
        _: i32,
    ) {
        // Scale follows the output the bar was created for.
    }

    fn frame(&mut self, _: &Connection, _: &QueueHandle<Self>, surface: &WlSurface, _: u32) {
        let Some(id) = self.bar_for_surface(surface) else {
            return;
        };
        if let Some(panel) = self.panels.get_mut(&id) {
            panel.frame_pending = false;
        }
        self.draw(id);
    }
}

impl LayerShellHandler for Data {
    fn closed(&mut self, _: &Connection, _: &QueueHandle<Self>, layer: &LayerSurface) {
        if let Some(id) = self.bar_for_surface(layer.wl_surface()) {
            tracing::info!(bar = %id, "layer surface closed by the compositor");
            self.destroy_bar(id);
        }
    }

    fn configure(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _: u32,
    ) {
        let Some(id) = self.bar_for_surface(layer.wl_surface()) else {
            return;
        };
        tracing::trace!(bar = %id, size = ?configure.new_size, "configure");
        if let Some(panel) = self.panels.get_mut(&id) {
            panel.configured = true;
        }
        self.draw(id);
    }
}
