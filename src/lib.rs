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

//! A launcher panel for Wayland compositors.
//!
//! The panel shows a row of buttons on an edge of every output. Pointer
//! clicks, scrolling and touch taps on a button run the command bound to that
//! interaction, or one of the built-in meta-actions.
//!
//! The input handling ([`seat`]), command resolution ([`item::command`],
//! [`interaction`]) and redraw scheduling ([`bar`], [`render`]) are plain
//! state machines that never talk to the compositor themselves; the
//! `wayland` backend feeds them protocol events and provides the surfaces
//! they draw into.

pub use keyboard_types::Modifiers;

pub mod bar;
pub mod config;
pub mod counter;
pub mod exec;
pub mod icon;
pub mod interaction;
pub mod item;
pub mod render;
pub mod seat;

#[cfg(all(
    feature = "wayland",
    any(target_os = "freebsd", target_os = "linux", target_os = "openbsd")
))]
pub mod backend;

pub use bar::{BarId, BarInstance, Bars, HiddenMode, InstanceRef, OutputInfo};
pub use config::{Config, ConfigError};
pub use interaction::{dispatch, Host, Lifecycle};
pub use item::{instance::ItemInstance, instance::ItemSurface, Item};
pub use seat::{KeyboardEvent, PointerEvent, Seat, SeatId, TouchEvent};
