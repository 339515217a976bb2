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

//! Item command bindings and their resolution.

use std::{error::Error as StdError, fmt, str::FromStr};

use crate::Modifiers;

// These values are comming from <linux/input-event-codes.h>.
pub const BTN_MISC: u32 = 0x100;
pub const BTN_1: u32 = 0x101;
pub const BTN_2: u32 = 0x102;
pub const BTN_3: u32 = 0x103;
pub const BTN_4: u32 = 0x104;
pub const BTN_5: u32 = 0x105;
pub const BTN_6: u32 = 0x106;
pub const BTN_7: u32 = 0x107;
pub const BTN_8: u32 = 0x108;
pub const BTN_9: u32 = 0x109;
pub const BTN_MOUSE: u32 = 0x110;
pub const BTN_LEFT: u32 = 0x110;
pub const BTN_RIGHT: u32 = 0x111;
pub const BTN_MIDDLE: u32 = 0x112;
pub const BTN_SIDE: u32 = 0x113;
pub const BTN_EXTRA: u32 = 0x114;
pub const BTN_FORWARD: u32 = 0x115;
pub const BTN_BACK: u32 = 0x116;
pub const BTN_TASK: u32 = 0x117;

/// Sub-code of a scroll interaction moving content down.
pub const SCROLL_DOWN: u32 = 0;
/// Sub-code of a scroll interaction moving content up.
pub const SCROLL_UP: u32 = 1;

/// Longest single token accepted inside a binding.
const MAX_TOKEN_LEN: usize = 19;

/// The device class an interaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    MouseButton,
    MouseScroll,
    Touch,
    /// Matches any non-scroll interaction that has no binding of its own.
    Universal,
}

/// A normalized interaction on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub modifiers: Modifiers,
    /// Button code for mouse buttons, direction for scrolling, zero otherwise.
    pub code: u32,
}

impl Interaction {
    pub fn new(kind: InteractionKind, modifiers: Modifiers, code: u32) -> Self {
        Self {
            kind,
            modifiers,
            code,
        }
    }
}

/// Built-in behaviour of a command, as opposed to running a shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaAction {
    None,
    ToplevelActivate,
    ToplevelClose,
    Reload,
    Exit,
}

impl MetaAction {
    const PREFIXES: [(&'static str, MetaAction); 4] = [
        ("@toplevel-activate", MetaAction::ToplevelActivate),
        ("@toplevel-close", MetaAction::ToplevelClose),
        ("@reload", MetaAction::Reload),
        ("@exit", MetaAction::Exit),
    ];
}

/// What a command does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub meta: MetaAction,
    /// The literal shell command, if any.
    pub command: Option<String>,
}

impl Action {
    /// Split an action string into its meta-action and literal command.
    ///
    /// A string starting with `@` that matches no known meta-action is kept
    /// as a plain command.
    pub fn parse(s: &str) -> Self {
        if s.starts_with('@') {
            for (prefix, meta) in MetaAction::PREFIXES {
                if let Some(rest) = s.strip_prefix(prefix) {
                    let rest = rest.trim();
                    return Self {
                        meta,
                        command: (!rest.is_empty()).then(|| rest.to_owned()),
                    };
                }
            }
        }

        Self {
            meta: MetaAction::None,
            command: (!s.is_empty()).then(|| s.to_owned()),
        }
    }

    /// Whether the action consists of its meta-action only.
    pub fn is_pure(&self) -> bool {
        self.command.is_none()
    }
}

/// One binding of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCommand {
    pub kind: InteractionKind,
    pub modifiers: Modifiers,
    pub code: u32,
    pub action: Action,
}

impl ItemCommand {
    fn matches_exactly(&self, kind: InteractionKind, modifiers: Modifiers, code: u32) -> bool {
        self.kind == kind && self.modifiers == modifiers && self.code == code
    }
}

/// The ordered bindings of an item.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<ItemCommand>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding, overwriting the action of an existing binding with the
    /// exact same kind, modifiers and code.
    pub fn add_or_replace(
        &mut self,
        kind: InteractionKind,
        modifiers: Modifiers,
        code: u32,
        action: &str,
    ) {
        let action = Action::parse(action);
        match self
            .commands
            .iter_mut()
            .find(|cmd| cmd.matches_exactly(kind, modifiers, code))
        {
            Some(cmd) => cmd.action = action,
            None => self.commands.push(ItemCommand {
                kind,
                modifiers,
                code,
                action,
            }),
        }
    }

    /// Find the command an interaction fires.
    ///
    /// An exact binding always wins over the universal one, and scrolling never
    /// falls back to the universal binding.
    pub fn resolve(&self, interaction: &Interaction) -> Option<&ItemCommand> {
        let Interaction {
            kind,
            modifiers,
            code,
        } = *interaction;

        self.commands
            .iter()
            .find(|cmd| cmd.matches_exactly(kind, modifiers, code))
            .or_else(|| {
                if kind == InteractionKind::MouseScroll {
                    return None;
                }
                self.commands
                    .iter()
                    .find(|cmd| cmd.kind == InteractionKind::Universal)
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// The interaction part of a `command[...]` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub kind: InteractionKind,
    pub modifiers: Modifiers,
    pub code: u32,
}

impl Binding {
    /// The binding of a bare `command` key.
    pub fn universal() -> Self {
        Self {
            kind: InteractionKind::Universal,
            modifiers: Modifiers::empty(),
            code: 0,
        }
    }
}

enum Token {
    Modifier(Modifiers),
    Device(InteractionKind, u32),
}

fn lookup_token(name: &str) -> Option<Token> {
    use InteractionKind::*;

    let token = match name {
        // Basically everything from linux/input-event-codes.h that a mouse-like
        // device can emit.
        "mouse-mouse" => Token::Device(MouseButton, BTN_MOUSE),
        "mouse-left" => Token::Device(MouseButton, BTN_LEFT),
        "mouse-right" => Token::Device(MouseButton, BTN_RIGHT),
        "mouse-middle" => Token::Device(MouseButton, BTN_MIDDLE),
        "mouse-side" => Token::Device(MouseButton, BTN_SIDE),
        "mouse-extra" => Token::Device(MouseButton, BTN_EXTRA),
        "mouse-forward" => Token::Device(MouseButton, BTN_FORWARD),
        "mouse-backward" => Token::Device(MouseButton, BTN_BACK),
        "mouse-task" => Token::Device(MouseButton, BTN_TASK),
        "mouse-misc" => Token::Device(MouseButton, BTN_MISC),
        "mouse-1" => Token::Device(MouseButton, BTN_1),
        "mouse-2" => Token::Device(MouseButton, BTN_2),
        "mouse-3" => Token::Device(MouseButton, BTN_3),
        "mouse-4" => Token::Device(MouseButton, BTN_4),
        "mouse-5" => Token::Device(MouseButton, BTN_5),
        "mouse-6" => Token::Device(MouseButton, BTN_6),
        "mouse-7" => Token::Device(MouseButton, BTN_7),
        "mouse-8" => Token::Device(MouseButton, BTN_8),
        "mouse-9" => Token::Device(MouseButton, BTN_9),

        "scroll-up" => Token::Device(MouseScroll, SCROLL_UP),
        "scroll-down" => Token::Device(MouseScroll, SCROLL_DOWN),

        "touch" => Token::Device(Touch, 0),

        "alt" => Token::Modifier(Modifiers::ALT),
        "capslock" => Token::Modifier(Modifiers::CAPS_LOCK),
        "control" => Token::Modifier(Modifiers::CONTROL),
        "logo" => Token::Modifier(Modifiers::META),
        "numlock" => Token::Modifier(Modifiers::NUM_LOCK),
        "shift" => Token::Modifier(Modifiers::SHIFT),
        _ => return None,
    };
    Some(token)
}

struct BindingParser {
    token: String,
    device: Option<(InteractionKind, u32)>,
    modifiers: Modifiers,
}

impl BindingParser {
    fn push(&mut self, ch: char) -> Result<(), BindingError> {
        if self.token.len() >= MAX_TOKEN_LEN {
            return Err(BindingError::TokenTooLong);
        }
        self.token.push(ch);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BindingError> {
        let name = std::mem::take(&mut self.token);
        match lookup_token(&name) {
            Some(Token::Modifier(modifier)) => self.modifiers |= modifier,
            Some(Token::Device(kind, code)) => {
                if self.device.is_some() {
                    return Err(BindingError::MultipleDevices);
                }
                self.device = Some((kind, code));
            }
            None => return Err(BindingError::UnknownToken(name)),
        }
        Ok(())
    }
}

impl FromStr for Binding {
    type Err = BindingError;

    /// Parse the bracketed part of a `command[...]` key, e.g. `[alt+mouse-left]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = BindingParser {
            token: String::new(),
            device: None,
            modifiers: Modifiers::empty(),
        };
        let (mut open, mut closed) = (false, false);

        for ch in s.chars() {
            match ch {
                '[' if open || closed => return Err(BindingError::Unbalanced),
                '[' => open = true,
                ']' if !open || closed => return Err(BindingError::Unbalanced),
                ']' => {
                    parser.flush()?;
                    closed = true;
                }
                '+' if !open || closed => return Err(BindingError::UnexpectedChar(ch)),
                '+' => parser.flush()?,
                ch if !open || closed => return Err(BindingError::UnexpectedChar(ch)),
                ch => parser.push(ch)?,
            }
        }

        if !open || !closed {
            return Err(BindingError::Unbalanced);
        }

        // Modifiers alone can not define an interaction type.
        let (kind, code) = parser.device.ok_or(BindingError::NoDevice)?;
        Ok(Self {
            kind,
            modifiers: parser.modifiers,
            code,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// Missing, doubled or misplaced brackets.
    Unbalanced,
    /// A character outside of the brackets.
    UnexpectedChar(char),
    /// A token longer than any known name.
    TokenTooLong,
    UnknownToken(String),
    /// More than one device token.
    MultipleDevices,
    /// Only modifiers were given.
    NoDevice,
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Unbalanced => write!(f, "unbalanced brackets"),
            Self::UnexpectedChar(ch) => write!(f, "unexpected character {ch:?}"),
            Self::TokenTooLong => write!(f, "token exceeds {MAX_TOKEN_LEN} characters"),
            Self::UnknownToken(name) => {
                write!(f, "unrecognized interaction type or modifier {name:?}")
            }
            Self::MultipleDevices => write!(f, "a command can only have a single interaction type"),
            Self::NoDevice => write!(f, "no interaction type defined"),
        }
    }
}

impl StdError for BindingError {}
