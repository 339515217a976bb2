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

//! Keyboard modifier tracking.
//!
//! Only the modifier state is of interest; keys themselves are ignored.

use std::{error::Error as StdError, fmt};

use xkbcommon::xkb;

use crate::Modifiers;

/// Anything that can tell whether a named xkb modifier is in effect.
pub trait ModifierSource {
    fn is_active(&self, name: &str) -> bool;
}

impl ModifierSource for xkb::State {
    fn is_active(&self, name: &str) -> bool {
        self.mod_name_is_active(name, xkb::STATE_MODS_EFFECTIVE)
    }
}

struct ModMap(&'static str, Modifiers);

impl ModMap {
    fn merge(&self, m: Modifiers, source: &impl ModifierSource) -> Modifiers {
        if source.is_active(self.0) {
            m | self.1
        } else {
            m
        }
    }
}

const MOD_ALT: ModMap = ModMap(xkb::MOD_NAME_ALT, Modifiers::ALT);
const MOD_CAPS: ModMap = ModMap(xkb::MOD_NAME_CAPS, Modifiers::CAPS_LOCK);
const MOD_CTRL: ModMap = ModMap(xkb::MOD_NAME_CTRL, Modifiers::CONTROL);
const MOD_LOGO: ModMap = ModMap(xkb::MOD_NAME_LOGO, Modifiers::META);
const MOD_NUM: ModMap = ModMap(xkb::MOD_NAME_NUM, Modifiers::NUM_LOCK);
const MOD_SHIFT: ModMap = ModMap(xkb::MOD_NAME_SHIFT, Modifiers::SHIFT);

/// Compute the modifier mask from scratch.
pub fn modifiers_from(source: &impl ModifierSource) -> Modifiers {
    let mods = Modifiers::empty();
    let mods = MOD_ALT.merge(mods, source);
    let mods = MOD_CAPS.merge(mods, source);
    let mods = MOD_CTRL.merge(mods, source);
    let mods = MOD_LOGO.merge(mods, source);
    let mods = MOD_NUM.merge(mods, source);

    MOD_SHIFT.merge(mods, source)
}

/// The xkb objects of one seat's keyboard.
pub struct ModifierTracker {
    xkb_context: xkb::Context,
    xkb_keymap: Option<xkb::Keymap>,
    xkb_state: Option<xkb::State>,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self {
            xkb_context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            xkb_keymap: None,
            xkb_state: None,
        }
    }

    /// Replace the keymap with one compiled from its text form.
    ///
    /// The old keymap and state are discarded even when compiling fails.
    pub fn set_keymap(&mut self, keymap: String) -> Result<(), KeyboardError> {
        self.xkb_state = None;
        self.xkb_keymap = None;

        // Keymap data is '\0' terminated.
        let keymap = keymap.trim_end_matches('\0').to_owned();
        let keymap = xkb::Keymap::new_from_string(
            &self.xkb_context,
            keymap,
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or(KeyboardError::Keymap)?;

        self.xkb_state = Some(xkb::State::new(&keymap));
        self.xkb_keymap = Some(keymap);
        Ok(())
    }

    pub fn has_keymap(&self) -> bool {
        self.xkb_keymap.is_some()
    }

    /// Apply a `wl_keyboard.modifiers` event and return the new mask.
    pub fn update_mask(
        &mut self,
        depressed: u32,
        latched: u32,
        locked: u32,
        group: u32,
    ) -> Modifiers {
        match self.xkb_state.as_mut() {
            Some(state) => {
                state.update_mask(depressed, latched, locked, 0, 0, group);
                modifiers_from(state)
            }
            None => Modifiers::empty(),
        }
    }
}

impl Default for ModifierTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModifierTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ModifierTracker")
            .field("has_keymap", &self.has_keymap())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardError {
    /// The compositor sent a keymap that is not in xkb text format.
    Format(u32),
    /// The keymap could not be compiled.
    Keymap,
    /// The keymap file descriptor could not be read.
    Read(String),
}

impl fmt::Display for KeyboardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Format(format) => write!(f, "unsupported keymap format 0x{format:x}"),
            Self::Keymap => write!(f, "failed to compile xkb keymap"),
            Self::Read(e) => write!(f, "failed to read keymap: {e}"),
        }
    }
}

impl StdError for KeyboardError {}

#[cfg(test)]
mod test {
    use super::*;

    struct Active(&'static [&'static str]);

    impl ModifierSource for Active {
        fn is_active(&self, name: &str) -> bool {
            self.0.contains(&name)
        }
    }

    #[test]
    fn mask_from_effective_names() {
        assert_eq!(modifiers_from(&Active(&[])), Modifiers::empty());
        assert_eq!(
            modifiers_from(&Active(&["Mod1", "Shift"])),
            Modifiers::ALT | Modifiers::SHIFT
        );
        assert_eq!(
            modifiers_from(&Active(&["Lock", "Control", "Mod4", "Mod2"])),
            Modifiers::CAPS_LOCK | Modifiers::CONTROL | Modifiers::META | Modifiers::NUM_LOCK
        );
        // Names outside the tracked set are ignored.
        assert_eq!(modifiers_from(&Active(&["Mod5"])), Modifiers::empty());
    }

    #[test]
    fn bad_keymap_is_rejected() {
        let mut tracker = ModifierTracker::new();
        assert_eq!(
            tracker.set_keymap("this is not a keymap\0".into()),
            Err(KeyboardError::Keymap)
        );
        assert!(!tracker.has_keymap());
        assert_eq!(tracker.update_mask(1, 0, 0, 0), Modifiers::empty());
    }

    #[test]
    fn masks_resolve_through_a_compiled_keymap() {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(
            &context,
            "",
            "",
            "us",
            "",
            None,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .expect("us keymap");
        let bit = |name: &str| 1u32 << keymap.mod_get_index(name);
        let shift = bit(xkb::MOD_NAME_SHIFT);
        let ctrl = bit(xkb::MOD_NAME_CTRL);
        let caps = bit(xkb::MOD_NAME_CAPS);

        let mut tracker = ModifierTracker::new();
        tracker
            .set_keymap(keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1) + "\0")
            .unwrap();
        assert!(tracker.has_keymap());

        assert_eq!(tracker.update_mask(shift, 0, 0, 0), Modifiers::SHIFT);
        assert_eq!(
            tracker.update_mask(shift | ctrl, 0, 0, 0),
            Modifiers::SHIFT | Modifiers::CONTROL
        );
        // Latched and locked modifiers count as well.
        assert_eq!(
            tracker.update_mask(0, ctrl, caps, 0),
            Modifiers::CONTROL | Modifiers::CAPS_LOCK
        );
        assert_eq!(tracker.update_mask(0, 0, 0, 0), Modifiers::empty());
    }
}
