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

//! Per-seat input state.
//!
//! A [`Seat`] turns the raw pointer, touch and keyboard events of one
//! compositor seat into item interactions. Events are fed in the order the
//! compositor delivered them; every method runs to completion before the next
//! event is looked at.

use std::fmt;

use crate::{
    bar::{BarId, Bars, InstanceRef},
    interaction::{self, Host},
    item::command::{Interaction, InteractionKind},
    Modifiers,
};

pub mod keyboard;
pub mod pointer;
pub mod touch;

pub use keyboard::{KeyboardError, ModifierSource, ModifierTracker};
pub use pointer::{
    CursorImage, CursorRequest, PointerState, Scroll, SCROLL_THRESHOLD, SCROLL_TIMEOUT,
};
pub use touch::{TouchPoint, TouchTracker};

/// Identifies a seat, taken from the `wl_seat` protocol id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatId(pub u32);

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "seat#{}", self.0)
    }
}

/// `wl_pointer` events, with surface coordinates already mapped to a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Enter { bar: BarId, serial: u32, x: f64, y: f64 },
    Leave,
    Motion { x: f64, y: f64 },
    Button { code: u32, pressed: bool },
    /// Vertical scroll in surface units.
    Axis { time: u32, value: f64 },
    /// Vertical scroll in wheel clicks.
    AxisDiscrete { steps: i32 },
    Frame,
}

/// `wl_touch` events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Down { bar: BarId, id: i32, x: f64, y: f64 },
    Up { id: i32 },
    Motion { id: i32, x: f64, y: f64 },
    Cancel,
}

/// `wl_keyboard` events the panel cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardEvent {
    Keymap(String),
    Modifiers {
        depressed: u32,
        latched: u32,
        locked: u32,
        group: u32,
    },
}

#[derive(Debug)]
pub struct Seat {
    id: SeatId,
    keyboard: Option<ModifierTracker>,
    modifiers: Modifiers,
    pointer: PointerState,
    touch: TouchTracker,
}

impl Seat {
    pub fn new(id: SeatId) -> Self {
        Self {
            id,
            keyboard: None,
            modifiers: Modifiers::empty(),
            pointer: PointerState::default(),
            touch: TouchTracker::default(),
        }
    }

    pub fn id(&self) -> SeatId {
        self.id
    }

    /// The modifiers currently held on this seat's keyboard.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn touch(&self) -> &TouchTracker {
        &self.touch
    }

    pub fn has_keyboard(&self) -> bool {
        self.keyboard.is_some()
    }

    /// Every item instance this seat holds on to.
    pub fn references(&self) -> impl Iterator<Item = InstanceRef> + '_ {
        self.pointer
            .hovered()
            .into_iter()
            .chain(self.touch.points().iter().map(|p| p.at))
    }

    /// Whether this seat still refers to `bar` in any way.
    pub fn refers_to(&self, bar: BarId) -> bool {
        self.pointer.bar() == Some(bar) || self.references().any(|r| r.bar == bar)
    }

    pub fn on_pointer_event<H: Host>(&mut self, event: PointerEvent, bars: &mut Bars, host: &mut H) {
        tracing::trace!(seat = %self.id, ?event, "pointer event");
        match event {
            PointerEvent::Enter { bar, serial, x, y } => {
                self.pointer.enter(bars, bar, serial, x, y)
            }
            PointerEvent::Leave => self.pointer.leave(bars),
            PointerEvent::Motion { x, y } => self.pointer.motion(bars, x, y),
            PointerEvent::Button { code, pressed } => {
                if let Some(at) = self.pointer.button(bars, code, pressed) {
                    self.dispatch(bars, at, InteractionKind::MouseButton, code, host);
                }
            }
            PointerEvent::Axis { time, value } => self.pointer.axis(time, value),
            PointerEvent::AxisDiscrete { steps } => self.pointer.axis_discrete(steps),
            PointerEvent::Frame => {
                if let Some(scroll) = self.pointer.frame() {
                    for _ in 0..scroll.steps {
                        self.dispatch(
                            bars,
                            scroll.at,
                            InteractionKind::MouseScroll,
                            scroll.direction,
                            host,
                        );
                    }
                }
            }
        }
    }

    pub fn on_touch_event<H: Host>(&mut self, event: TouchEvent, bars: &mut Bars, host: &mut H) {
        tracing::trace!(seat = %self.id, ?event, "touch event");
        match event {
            TouchEvent::Down { bar, id, x, y } => self.touch.down(bars, bar, id, x, y),
            TouchEvent::Motion { id, x, y } => self.touch.motion(bars, id, x, y),
            TouchEvent::Up { id } => {
                let Some(point) = self.touch.get(id).copied() else {
                    return;
                };
                tracing::debug!(id, "touch up");
                self.dispatch(bars, point.at, InteractionKind::Touch, 0, host);
                self.touch.destroy(bars, id);
            }
            TouchEvent::Cancel => self.touch.cancel(bars),
        }
    }

    /// Apply a keyboard event.
    ///
    /// A keymap that cannot be used releases the keyboard: the error is
    /// returned so the caller can drop the protocol object as well.
    pub fn on_keyboard_modifier_event(&mut self, event: KeyboardEvent) -> Result<(), KeyboardError> {
        let Some(tracker) = self.keyboard.as_mut() else {
            return Ok(());
        };
        match event {
            KeyboardEvent::Keymap(keymap) => {
                if let Err(e) = tracker.set_keymap(keymap) {
                    tracing::error!(seat = %self.id, "{e}, releasing keyboard");
                    self.release_keyboard();
                    return Err(e);
                }
            }
            KeyboardEvent::Modifiers {
                depressed,
                latched,
                locked,
                group,
            } => {
                self.modifiers = tracker.update_mask(depressed, latched, locked, group);
                tracing::trace!(seat = %self.id, modifiers = ?self.modifiers, "modifiers");
            }
        }
        Ok(())
    }

    fn dispatch<H: Host>(
        &self,
        bars: &Bars,
        at: InstanceRef,
        kind: InteractionKind,
        code: u32,
        host: &mut H,
    ) {
        let Some(bar) = bars.get(at.bar) else {
            return;
        };
        let Some(instance) = bar.instance(at.index) else {
            return;
        };
        let interaction = Interaction::new(kind, self.modifiers, code);
        interaction::dispatch(instance.item(), bar.output(), self.id, interaction, host);
    }

    pub fn bind_keyboard(&mut self) {
        if self.keyboard.is_none() {
            tracing::debug!(seat = %self.id, "binding keyboard");
            self.keyboard = Some(ModifierTracker::new());
        }
    }

    pub fn release_keyboard(&mut self) {
        self.keyboard = None;
        self.modifiers = Modifiers::empty();
    }

    pub fn release_pointer(&mut self, bars: &mut Bars) {
        self.pointer.release(bars);
    }

    pub fn release_touch(&mut self, bars: &mut Bars) {
        self.touch.cancel(bars);
    }

    /// Release all capabilities, as when the seat goes away.
    pub fn release(&mut self, bars: &mut Bars) {
        tracing::debug!(seat = %self.id, "releasing seat");
        self.release_keyboard();
        self.release_touch(bars);
        self.release_pointer(bars);
    }

    /// Drop every reference into `bar`, unwinding the indicators they hold.
    ///
    /// Must run before the bar is removed from `bars`.
    pub fn forget_bar(&mut self, bars: &mut Bars, bar: BarId) {
        if self.pointer.bar() == Some(bar) {
            self.pointer.leave(bars);
        }
        self.touch.forget_bar(bars, bar);
    }
}
