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

//! Software painting into shared-memory buffers, and the per-instance render
//! pass that keeps indicators in sync with input state.
//!
//! Painting goes through [`tiny_skia`]. Its pixmaps are premultiplied RGBA,
//! while `wl_shm` ARGB8888 memory is laid out as B, G, R, A on little endian,
//! so [`paint_argb8888`] swaps the red and blue channels once drawing is done.

use std::{fmt, str::FromStr};

use kurbo::{PathEl, Rect, RoundedRect, RoundedRectRadii, Shape};
use serde::Deserialize;
use tiny_skia::{FillRule, Paint, PathBuilder, PixmapMut, Shader, Transform};

use crate::item::instance::ItemInstance;

/// Flattening tolerance for curved shapes, in buffer pixels.
const TOLERANCE: f64 = 0.1;

/// A straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    fn paint(self) -> Paint<'static> {
        Paint {
            shader: Shader::SolidColor(tiny_skia::Color::from_rgba8(
                self.r, self.g, self.b, self.a,
            )),
            anti_alias: true,
            ..Paint::default()
        }
    }
}

impl FromStr for Color {
    type Err = ColorError;

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ColorError(s.to_owned()))?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(ColorError(s.to_owned()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError(s.to_owned()))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorError(String);

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "not a colour: {:?} (expected #RRGGBB or #RRGGBBAA)", self.0)
    }
}

impl std::error::Error for ColorError {}

/// Byte length of a `width`x`height` ARGB8888 buffer, or `None` if `wl_shm`
/// cannot address it.
pub fn buffer_len(width: u32, height: u32) -> Option<usize> {
    let len = width.checked_mul(4)?.checked_mul(height)?;
    i32::try_from(len).ok()?;
    usize::try_from(len).ok()
}

/// Buffer pixel size of a `width`x`height` logical area at `scale`.
pub fn buffer_size(width: u32, height: u32, scale: u32) -> Option<(u32, u32)> {
    let width = width.checked_mul(scale)?;
    let height = height.checked_mul(scale)?;
    buffer_len(width, height)?;
    Some((width, height))
}

/// Clear `data`, let `draw` paint into it and convert the result to
/// ARGB8888. Returns `false` if `data` cannot hold `width`x`height` pixels.
pub fn paint_argb8888(
    data: &mut [u8],
    width: u32,
    height: u32,
    draw: impl FnOnce(&mut PixmapMut<'_>),
) -> bool {
    let Some(data) = buffer_len(width, height).and_then(|len| data.get_mut(..len)) else {
        return false;
    };
    data.fill(0);
    let Some(mut pixmap) = PixmapMut::from_bytes(data, width, height) else {
        return false;
    };
    draw(&mut pixmap);
    for px in data.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    true
}

/// Cover the whole pixmap with `color`.
pub fn fill(pixmap: &mut PixmapMut<'_>, color: Color) {
    let (width, height) = (pixmap.width() as f32, pixmap.height() as f32);
    if let Some(rect) = tiny_skia::Rect::from_xywh(0., 0., width, height) {
        pixmap.fill_rect(rect, &color.paint(), Transform::identity(), None);
    }
}

/// Fill `shape`, given in buffer pixels, with `color`.
pub fn fill_shape(pixmap: &mut PixmapMut<'_>, shape: &impl Shape, color: Color) {
    let mut builder = PathBuilder::new();
    for el in shape.path_elements(TOLERANCE) {
        match el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => {
                builder.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32)
            }
            PathEl::CurveTo(p1, p2, p3) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    // Empty or degenerate shapes have no path.
    let Some(path) = builder.finish() else {
        return;
    };
    pixmap.fill_path(
        &path,
        &color.paint(),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
}

/// Per-corner radii in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Radii {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
}

impl Radii {
    pub fn uniform(radius: f64) -> Self {
        Self {
            top_left: radius,
            top_right: radius,
            bottom_right: radius,
            bottom_left: radius,
        }
    }

    pub fn scaled(&self, scale: f64) -> RoundedRectRadii {
        RoundedRectRadii::new(
            self.top_left * scale,
            self.top_right * scale,
            self.bottom_right * scale,
            self.bottom_left * scale,
        )
    }
}

/// How item instances of a bar are painted.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub icon_padding: u32,
    pub indicator_padding: u32,
    pub radii: Radii,
    pub indicator_hover: Color,
    pub indicator_active: Color,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            icon_padding: 4,
            indicator_padding: 0,
            radii: Radii::uniform(5.),
            indicator_hover: Color::rgba(0x40, 0x40, 0x40, 0xff),
            indicator_active: Color::rgba(0x60, 0x60, 0x60, 0xff),
        }
    }
}

/// The bar-level state an instance is rendered against.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub hidden: bool,
    pub scale: u32,
    pub style: &'a Style,
}

/// What a render pass did with an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Spacers draw nothing; the dirty flag was cleared.
    Skipped,
    /// The bar is hidden; presented content was detached. Showing the bar
    /// again marks the instance dirty.
    Hidden,
    /// Both buffers are still held by the compositor; the instance stays dirty.
    Busy,
    /// The buffer would be too large for `wl_shm`; nothing was drawn.
    Oversized,
    /// A buffer was painted and submitted.
    Presented { slot: usize },
}

/// Inset `rect` by `padding` on every side, never going negative.
fn inset(width: u32, height: u32, padding: u32) -> Rect {
    let w = width.saturating_sub(padding.saturating_mul(2)) as f64;
    let h = height.saturating_sub(padding.saturating_mul(2)) as f64;
    Rect::from_origin_size((padding as f64, padding as f64), (w, h))
}

impl ItemInstance {
    /// Paint the instance's current indicator state and icon and submit it.
    pub fn render(&mut self, ctx: RenderContext<'_>) -> RenderOutcome {
        if !self.item.is_button() {
            self.dirty = false;
            return RenderOutcome::Skipped;
        }

        if ctx.hidden {
            self.surface.detach();
            self.current_buffer = None;
            self.dirty = false;
            return RenderOutcome::Hidden;
        }

        let scale = ctx.scale.max(1);
        let Some((width, height)) = buffer_size(self.width, self.height, scale) else {
            tracing::error!(
                width = self.width,
                height = self.height,
                scale,
                "item is too large to render"
            );
            self.dirty = false;
            return RenderOutcome::Oversized;
        };
        let order = match self.current_buffer {
            Some(current) => [1 - current, current],
            None => [0, 1],
        };

        let indicator = if self.press.is_active() {
            Some(ctx.style.indicator_active)
        } else if self.hover.is_active() {
            Some(ctx.style.indicator_hover)
        } else {
            None
        };
        let icon = self.item.icon();

        let mut presented = None;
        for slot in order {
            let Some(data) = self.surface.acquire(slot, width, height) else {
                continue;
            };
            let painted = paint_argb8888(data, width, height, |pixmap| {
                if let Some(color) = indicator {
                    let area = inset(self.width, self.height, ctx.style.indicator_padding)
                        .scale_from_origin(scale as f64);
                    let radii = ctx.style.radii.scaled(scale as f64);
                    fill_shape(pixmap, &RoundedRect::from_rect(area, radii), color);
                }
                if let Some(icon) = icon {
                    let area = inset(self.width, self.height, ctx.style.icon_padding)
                        .scale_from_origin(scale as f64);
                    icon.paint(pixmap, area);
                }
            });
            if !painted {
                tracing::error!(slot, width, height, "item buffer has the wrong size");
                continue;
            }

            presented = Some(slot);
            break;
        }

        match presented {
            Some(slot) => {
                self.dirty = false;
                self.current_buffer = Some(slot);
                self.surface.present(slot, scale);
                RenderOutcome::Presented { slot }
            }
            None => {
                tracing::trace!("both item buffers are in flight, deferring render");
                RenderOutcome::Busy
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::item::Item;

    fn style() -> Style {
        Style {
            icon_padding: 0,
            indicator_padding: 0,
            radii: Radii::default(),
            indicator_hover: Color::rgba(0, 0, 255, 255),
            indicator_active: Color::rgba(255, 0, 0, 255),
        }
    }

    fn ctx(style: &Style) -> RenderContext<'_> {
        RenderContext {
            hidden: false,
            scale: 1,
            style,
        }
    }

    #[test]
    fn colour_parsing() {
        assert_eq!("#ff8000".parse(), Ok(Color::rgba(255, 128, 0, 255)));
        assert_eq!("#ff800080".parse(), Ok(Color::rgba(255, 128, 0, 128)));
        assert!("ff8000".parse::<Color>().is_err());
        assert!("#ff80".parse::<Color>().is_err());
        assert!("#gg8000".parse::<Color>().is_err());
    }

    fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }

    #[test]
    fn fill_rounded_rect_leaves_corners_clear() {
        let mut data = vec![0xaau8; 20 * 20 * 4];
        let shape = RoundedRect::new(0., 0., 20., 20., 8.);
        assert!(paint_argb8888(&mut data, 20, 20, |pixmap| {
            fill_shape(pixmap, &shape, Color::rgba(255, 255, 255, 255));
        }));
        assert_eq!(pixel(&data, 20, 10, 10), [255, 255, 255, 255]);
        assert_eq!(pixel(&data, 20, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&data, 20, 19, 19), [0, 0, 0, 0]);
    }

    #[test]
    fn output_is_argb8888() {
        let mut data = vec![0u8; 2 * 2 * 4];
        assert!(paint_argb8888(&mut data, 2, 2, |pixmap| {
            fill(pixmap, Color::rgba(255, 128, 0, 255));
        }));
        // Blue, green, red, alpha in memory.
        assert_eq!(pixel(&data, 2, 1, 1), [0, 128, 255, 255]);
    }

    #[test]
    fn undersized_memory_is_refused() {
        let mut data = vec![0u8; 15];
        assert!(!paint_argb8888(&mut data, 2, 2, |_| unreachable!()));
    }

    #[test]
    fn buffer_sizes_stay_addressable() {
        assert_eq!(buffer_size(48, 48, 2), Some((96, 96)));
        assert_eq!(buffer_len(96, 96), Some(96 * 96 * 4));
        assert_eq!(buffer_size(u32::MAX / 2, 1, 3), None);
        assert_eq!(buffer_size(40_000, 40_000, 1), None);
    }

    #[test]
    fn pressed_indicator_wins_over_hover() {
        let style = style();
        let (mut instance, surface) =
            ItemInstance::new_with_memory(Rc::new(Item::button()), 10, 10);
        instance.hover.increment();
        instance.press.increment();
        assert_eq!(
            instance.render(ctx(&style)),
            RenderOutcome::Presented { slot: 0 }
        );
        assert!(!instance.is_dirty());
        assert_eq!(surface.pixel(0, 5, 5), [0, 0, 255, 255]);

        instance.press.decrement();
        instance.mark_dirty();
        assert_eq!(
            instance.render(ctx(&style)),
            RenderOutcome::Presented { slot: 1 }
        );
        assert_eq!(surface.pixel(1, 5, 5), [255, 0, 0, 255]);
    }

    #[test]
    fn alternates_buffers_and_waits_for_release() {
        let style = style();
        let (mut instance, surface) =
            ItemInstance::new_with_memory(Rc::new(Item::button()), 4, 4);

        assert_eq!(
            instance.render(ctx(&style)),
            RenderOutcome::Presented { slot: 0 }
        );
        // The compositor still holds buffer 0, so the next frame uses 1.
        instance.mark_dirty();
        assert_eq!(
            instance.render(ctx(&style)),
            RenderOutcome::Presented { slot: 1 }
        );
        // Both held: the render is deferred and the instance stays dirty.
        instance.mark_dirty();
        assert_eq!(instance.render(ctx(&style)), RenderOutcome::Busy);
        assert!(instance.is_dirty());

        surface.release(0);
        assert_eq!(
            instance.render(ctx(&style)),
            RenderOutcome::Presented { slot: 0 }
        );
        assert_eq!(surface.presented(), vec![(0, 1), (1, 1), (0, 1)]);
    }

    #[test]
    fn spacer_only_clears_dirty() {
        let style = style();
        let (mut instance, surface) =
            ItemInstance::new_with_memory(Rc::new(Item::spacer(10)), 10, 10);
        assert!(instance.is_dirty());
        assert_eq!(instance.render(ctx(&style)), RenderOutcome::Skipped);
        assert!(!instance.is_dirty());
        assert!(surface.presented().is_empty());
    }

    #[test]
    fn hidden_bar_detaches_without_painting() {
        let style = style();
        let (mut instance, surface) =
            ItemInstance::new_with_memory(Rc::new(Item::button()), 10, 10);
        let hidden = RenderContext {
            hidden: true,
            ..ctx(&style)
        };
        assert_eq!(instance.render(hidden), RenderOutcome::Hidden);
        assert!(!instance.is_dirty());
        assert_eq!(surface.detached(), 1);
        assert!(surface.presented().is_empty());
    }

    #[test]
    fn scale_multiplies_buffer_size() {
        let style = style();
        let (mut instance, surface) =
            ItemInstance::new_with_memory(Rc::new(Item::button()), 10, 6);
        let scaled = RenderContext {
            scale: 2,
            ..ctx(&style)
        };
        instance.render(scaled);
        assert_eq!(surface.buffer_size(0), Some((20, 12)));
        assert_eq!(surface.presented(), vec![(0, 2)]);
    }

    #[test]
    fn oversized_render_gives_up() {
        let style = style();
        let (mut instance, surface) =
            ItemInstance::new_with_memory(Rc::new(Item::button()), 30_000, 30_000);
        let huge = RenderContext {
            scale: 4,
            ..ctx(&style)
        };
        assert_eq!(instance.render(huge), RenderOutcome::Oversized);
        assert!(!instance.is_dirty());
        assert!(surface.presented().is_empty());
    }
}
