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

//! Configured panel items.

use std::{error::Error as StdError, fmt, path::PathBuf};

use crate::icon::{self, Icon};

pub mod command;
pub mod instance;

use command::{Binding, BindingError, CommandTable, InteractionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Button,
    Spacer,
}

/// Which input capabilities an item's bindings rely on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputNeeds {
    pub keyboard: bool,
    pub pointer: bool,
    pub touch: bool,
}

impl InputNeeds {
    pub fn merge(self, other: InputNeeds) -> Self {
        Self {
            keyboard: self.keyboard || other.keyboard,
            pointer: self.pointer || other.pointer,
            touch: self.touch || other.touch,
        }
    }
}

/// A button or spacer as read from the configuration.
///
/// Items are shared by every bar they appear on and are never mutated after the
/// configuration finished loading.
#[derive(Debug)]
pub struct Item {
    kind: ItemKind,
    commands: CommandTable,
    icon: Option<Box<dyn Icon>>,
    app_id: Option<String>,
    length: u32,
}

impl Item {
    pub fn button() -> Self {
        Self {
            kind: ItemKind::Button,
            commands: CommandTable::new(),
            icon: None,
            app_id: None,
            length: 0,
        }
    }

    pub fn spacer(length: u32) -> Self {
        Self {
            kind: ItemKind::Spacer,
            commands: CommandTable::new(),
            icon: None,
            app_id: None,
            length,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_button(&self) -> bool {
        self.kind == ItemKind::Button
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn icon(&self) -> Option<&dyn Icon> {
        self.icon.as_deref()
    }

    /// The application id used by toplevel meta-actions.
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    /// Spacer length along the bar, zero for buttons.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn with_icon(mut self, icon: Box<dyn Icon>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// Add a binding, overwriting an existing one for the same interaction.
    pub fn bind(&mut self, binding: Binding, action: &str) {
        self.commands
            .add_or_replace(binding.kind, binding.modifiers, binding.code, action);
    }

    /// Apply one configuration key.
    pub fn set_variable(&mut self, key: &str, value: &str) -> Result<(), ItemError> {
        match self.kind {
            ItemKind::Button => self.set_button_variable(key, value),
            ItemKind::Spacer => self.set_spacer_variable(key, value),
        }
    }

    fn set_button_variable(&mut self, key: &str, value: &str) -> Result<(), ItemError> {
        if let Some(binding) = key.strip_prefix("command") {
            let binding = if binding.is_empty() {
                Binding::universal()
            } else {
                binding.parse().map_err(|source| ItemError::Binding {
                    key: key.to_owned(),
                    source,
                })?
            };
            self.bind(binding, value);
            return Ok(());
        }

        match key {
            "image-path" => {
                let path = PathBuf::from(value);
                let icon = icon::open(&path).map_err(|source| ItemError::Icon {
                    path,
                    source: Box::new(source),
                })?;
                self.icon = Some(icon);
            }
            "toplevel-app-id" => {
                self.app_id = match value {
                    "none" => None,
                    id => Some(id.to_owned()),
                };
            }
            _ => return Err(ItemError::UnknownKey(key.to_owned())),
        }
        Ok(())
    }

    fn set_spacer_variable(&mut self, key: &str, value: &str) -> Result<(), ItemError> {
        match key {
            "length" => match value.parse::<u32>() {
                Ok(length) if length > 0 => {
                    self.length = length;
                    Ok(())
                }
                _ => Err(ItemError::InvalidLength(value.to_owned())),
            },
            _ => Err(ItemError::UnknownKey(key.to_owned())),
        }
    }

    /// Check that every required setting was given.
    pub fn validate(&self) -> Result<(), ItemError> {
        match self.kind {
            ItemKind::Spacer if self.length == 0 => Err(ItemError::MissingLength),
            _ => Ok(()),
        }
    }

    /// Input capabilities needed to deliver every binding of this item.
    pub fn input_needs(&self) -> InputNeeds {
        self.commands
            .iter()
            .fold(InputNeeds::default(), |needs, cmd| {
                let device = match cmd.kind {
                    InteractionKind::MouseButton | InteractionKind::MouseScroll => InputNeeds {
                        pointer: true,
                        ..InputNeeds::default()
                    },
                    InteractionKind::Touch => InputNeeds {
                        touch: true,
                        ..InputNeeds::default()
                    },
                    InteractionKind::Universal => InputNeeds {
                        pointer: true,
                        touch: true,
                        ..InputNeeds::default()
                    },
                };
                let keyboard = InputNeeds {
                    keyboard: !cmd.modifiers.is_empty(),
                    ..InputNeeds::default()
                };
                needs.merge(device).merge(keyboard)
            })
    }
}

#[derive(Debug)]
pub enum ItemError {
    UnknownType(String),
    UnknownKey(String),
    InvalidValue(String),
    Binding { key: String, source: BindingError },
    InvalidLength(String),
    MissingLength,
    Icon {
        path: PathBuf,
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::UnknownType(kind) => {
                write!(f, "item type must be \"button\" or \"spacer\", got {kind:?}")
            }
            Self::UnknownKey(key) => write!(f, "unrecognized item setting {key:?}"),
            Self::InvalidValue(key) => write!(f, "setting {key:?} must be a plain value"),
            Self::Binding { key, source } => write!(f, "invalid binding {key:?}: {source}"),
            Self::InvalidLength(value) => {
                write!(f, "spacer length must be a positive integer, got {value:?}")
            }
            Self::MissingLength => write!(f, "spacer needs a length"),
            Self::Icon { path, source } => {
                write!(f, "failed to load image {}: {source}", path.display())
            }
        }
    }
}

impl StdError for ItemError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Binding { source, .. } => Some(source),
            Self::Icon { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        item::command::{Interaction, MetaAction, BTN_LEFT, BTN_RIGHT},
        Modifiers,
    };

    #[test]
    fn button_settings() {
        let mut item = Item::button();
        item.set_variable("command[mouse-left]", "firefox").unwrap();
        item.set_variable("command", "@toplevel-activate firefox")
            .unwrap();
        item.set_variable("toplevel-app-id", "firefox").unwrap();
        assert_eq!(item.app_id(), Some("firefox"));
        assert_eq!(item.commands().len(), 2);

        let right = Interaction::new(InteractionKind::MouseButton, Modifiers::empty(), BTN_RIGHT);
        let cmd = item.commands().resolve(&right).unwrap();
        assert_eq!(cmd.action.meta, MetaAction::ToplevelActivate);

        item.set_variable("toplevel-app-id", "none").unwrap();
        assert_eq!(item.app_id(), None);
    }

    #[test]
    fn repeated_key_overwrites() {
        let mut item = Item::button();
        item.set_variable("command[mouse-left]", "a").unwrap();
        item.set_variable("command[mouse-left]", "b").unwrap();
        assert_eq!(item.commands().len(), 1);
        let left = Interaction::new(InteractionKind::MouseButton, Modifiers::empty(), BTN_LEFT);
        let cmd = item.commands().resolve(&left).unwrap();
        assert_eq!(cmd.action.command.as_deref(), Some("b"));
    }

    #[test]
    fn rejects_bad_settings() {
        let mut button = Item::button();
        assert!(matches!(
            button.set_variable("command[alt]", "x"),
            Err(ItemError::Binding { .. })
        ));
        assert!(matches!(
            button.set_variable("length", "3"),
            Err(ItemError::UnknownKey(_))
        ));
        assert!(matches!(
            button.set_variable("image-path", "/nonexistent/dockbar.png"),
            Err(ItemError::Icon { .. })
        ));

        let mut spacer = Item::spacer(1);
        assert!(matches!(
            spacer.set_variable("length", "0"),
            Err(ItemError::InvalidLength(_))
        ));
        assert!(matches!(
            spacer.set_variable("length", "-4"),
            Err(ItemError::InvalidLength(_))
        ));
        assert!(matches!(
            spacer.set_variable("command", "x"),
            Err(ItemError::UnknownKey(_))
        ));
        spacer.set_variable("length", "12").unwrap();
        assert_eq!(spacer.length(), 12);
    }

    #[test]
    fn input_needs_follow_bindings() {
        let mut item = Item::button();
        assert_eq!(item.input_needs(), InputNeeds::default());

        item.set_variable("command[touch]", "x").unwrap();
        assert_eq!(
            item.input_needs(),
            InputNeeds {
                touch: true,
                ..InputNeeds::default()
            }
        );

        item.set_variable("command[shift+scroll-up]", "x").unwrap();
        assert_eq!(
            item.input_needs(),
            InputNeeds {
                keyboard: true,
                pointer: true,
                touch: true,
            }
        );
    }
}
