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

//! wayland platform support.
//!
//! The panel is a `wlr-layer-shell` surface per output with one synchronised
//! subsurface per item instance. Input, output and toplevel events are
//! translated into calls on the platform independent state in the crate
//! root.

mod application;
mod bar;
pub mod error;
mod keyboard;
mod pointer;
mod seat;
mod surface;
mod toplevel;
mod touch;

pub use application::run;
pub use error::Error;
