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

use crate::{
    bar::{BarId, Bars, InstanceRef},
    counter::Counter,
    item::command::{SCROLL_DOWN, SCROLL_UP},
};

/// Continuous scroll needed for one virtual scroll step, in 1/256 surface units.
pub const SCROLL_THRESHOLD: f64 = 10000.;

/// Milliseconds after which a continuous scroll value is considered stale.
pub const SCROLL_TIMEOUT: u32 = 1000;

/// Axis values arrive in surface units; the accumulator works in `wl_fixed`
/// units.
const FIXED_SCALE: f64 = 256.;

/// The cursor image a seat should show over a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorImage {
    Default,
    Pointer,
}

/// A cursor image to set for the pointer entered with `serial`.
///
/// Every enter needs its own `set_cursor` request, so two requests for the
/// same image differ when they belong to different enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorRequest {
    pub image: CursorImage,
    pub serial: u32,
}

/// Scroll steps a frame produced for the hovered instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scroll {
    pub at: InstanceRef,
    pub direction: u32,
    pub steps: u32,
}

/// What the pointer of a seat is doing.
#[derive(Debug, Default)]
pub struct PointerState {
    bar: Option<BarId>,
    /// Serial of the enter event that put the pointer on `bar`.
    serial: Option<u32>,
    x: f64,
    y: f64,
    hovered: Option<usize>,
    /// Buttons currently held down.
    depth: Counter,
    scroll_value: f64,
    scroll_steps: u32,
    last_scroll: u32,
    cursor: Option<CursorImage>,
}

impl PointerState {
    pub fn bar(&self) -> Option<BarId> {
        self.bar
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn hovered(&self) -> Option<InstanceRef> {
        Some(InstanceRef {
            bar: self.bar?,
            index: self.hovered?,
        })
    }

    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    /// Accumulated continuous scroll, in 1/256 surface units.
    pub fn scroll_value(&self) -> f64 {
        self.scroll_value
    }

    pub fn scroll_steps(&self) -> u32 {
        self.scroll_steps
    }

    /// The cursor to show, `None` when the pointer is not over a bar.
    pub fn cursor(&self) -> Option<CursorImage> {
        self.cursor
    }

    /// What the compositor needs to be told to show, `None` when the pointer
    /// is not over a bar.
    pub fn cursor_request(&self) -> Option<CursorRequest> {
        Some(CursorRequest {
            image: self.cursor?,
            serial: self.serial?,
        })
    }

    pub(crate) fn enter(&mut self, bars: &mut Bars, bar: BarId, serial: u32, x: f64, y: f64) {
        if bars.get(bar).is_none() {
            tracing::warn!(%bar, "pointer entered an unknown surface");
            return;
        }
        if self.bar.is_some() {
            self.leave(bars);
        }
        if let Some(instance) = bars.get_mut(bar) {
            instance.pointer_enter();
        }
        tracing::debug!(%bar, x, y, "pointer entered bar");
        self.bar = Some(bar);
        self.serial = Some(serial);
        self.hovered = None;
        self.x = x;
        self.y = y;
        self.process_motion(bars);
    }

    pub(crate) fn motion(&mut self, bars: &mut Bars, x: f64, y: f64) {
        if self.bar.is_none() {
            return;
        }
        self.x = x;
        self.y = y;
        self.process_motion(bars);
    }

    /// Move hover and press indicators to whatever is under the pointer now.
    fn process_motion(&mut self, bars: &mut Bars) {
        let Some(bar) = self.bar.and_then(|id| bars.get_mut(id)) else {
            return;
        };
        let old = self.hovered;
        let new = bar.item_instance_at(self.x, self.y);
        if old.is_some() && old == new {
            return;
        }
        self.hovered = new;

        let depth = self.depth.get();
        let mut need_frame = false;
        if let Some(instance) = old.and_then(|i| bar.instance_mut(i)) {
            instance.leave(depth);
            need_frame = true;
        }

        self.cursor = Some(CursorImage::Default);
        if let Some(instance) = new.and_then(|i| bar.instance_mut(i)) {
            if instance.item().is_button() {
                self.cursor = Some(CursorImage::Pointer);
            }
            instance.enter(depth);
            need_frame = true;
        }

        if need_frame {
            bar.schedule_frame();
        }
    }

    /// Returns the instance a released button clicked.
    pub(crate) fn button(
        &mut self,
        bars: &mut Bars,
        code: u32,
        pressed: bool,
    ) -> Option<InstanceRef> {
        let Some(bar) = self.bar.and_then(|id| bars.get_mut(id)) else {
            tracing::warn!(code, "button event on unexpected surface");
            return None;
        };

        let hovered = self.hovered;
        if pressed {
            self.depth.increment();
        } else {
            self.depth.decrement();
        }
        tracing::debug!(code, pressed, depth = self.depth.get(), "pointer button");
        bar.schedule_frame();

        let instance = hovered.and_then(|i| bar.instance_mut(i))?;
        if pressed {
            instance.press.increment();
            instance.mark_dirty();
            None
        } else {
            instance.press.decrement();
            instance.mark_dirty();
            Some(InstanceRef {
                bar: bar.id(),
                index: hovered?,
            })
        }
    }

    /// Accumulate vertical continuous scroll of `value` surface units.
    pub(crate) fn axis(&mut self, time: u32, value: f64) {
        if self.bar.is_none() {
            tracing::warn!("scrolling on unexpected surface");
            return;
        }
        if self.scroll_steps == 0 && time.wrapping_sub(self.last_scroll) > SCROLL_TIMEOUT {
            self.scroll_value = 0.;
        }
        self.scroll_value += value * FIXED_SCALE;
        self.last_scroll = time;
    }

    pub(crate) fn axis_discrete(&mut self, steps: i32) {
        if self.bar.is_none() {
            tracing::warn!("scrolling on unexpected surface");
            return;
        }
        self.scroll_steps = self.scroll_steps.saturating_add(steps.unsigned_abs());
    }

    /// Turn the axis data accumulated since the last frame into scroll steps.
    pub(crate) fn frame(&mut self) -> Option<Scroll> {
        let bar = self.bar?;
        let Some(index) = self.hovered else {
            self.scroll_steps = 0;
            self.scroll_value = 0.;
            return None;
        };

        let (direction, change) = if self.scroll_value > 0. {
            (SCROLL_DOWN, -SCROLL_THRESHOLD)
        } else {
            (SCROLL_UP, SCROLL_THRESHOLD)
        };

        let steps = if self.scroll_steps > 0 {
            let steps = self.scroll_steps;
            self.scroll_steps = 0;
            self.scroll_value = 0.;
            steps
        } else {
            let mut steps = 0;
            while self.scroll_value.abs() > SCROLL_THRESHOLD {
                self.scroll_value += change;
                steps += 1;
            }
            steps
        };

        (steps > 0).then_some(Scroll {
            at: InstanceRef { bar, index },
            direction,
            steps,
        })
    }

    /// Drop the hovered instance's indicators and reset to idle.
    pub(crate) fn leave(&mut self, bars: &mut Bars) {
        if let Some(bar) = self.bar.and_then(|id| bars.get_mut(id)) {
            tracing::debug!(bar = %bar.id(), "pointer left bar");
            if let Some(instance) = self.hovered.and_then(|i| bar.instance_mut(i)) {
                instance.leave(self.depth.get());
            }
            bar.pointer_leave();
            bar.schedule_frame();
        }

        self.bar = None;
        self.serial = None;
        self.x = 0.;
        self.y = 0.;
        self.hovered = None;
        self.depth = Counter::ZERO;
        self.cursor = None;
    }

    /// Forget everything, as when the pointer capability goes away.
    pub(crate) fn release(&mut self, bars: &mut Bars) {
        self.leave(bars);
        self.scroll_value = 0.;
        self.scroll_steps = 0;
        self.last_scroll = 0;
    }
}
