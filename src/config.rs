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

//! Configuration file loading.
//!
//! The file is TOML: a `[bar]` table with the bar settings, followed by one
//! `[[item]]` table per button or spacer, in display order.
//!
//! ```toml
//! [bar]
//! position = "bottom"
//! size = 48
//!
//! [[item]]
//! type = "button"
//! image-path = "/usr/share/icons/hicolor/48x48/apps/foot.png"
//! toplevel-app-id = "foot"
//! command = "foot"
//! "command[mouse-right]" = "@toplevel-close"
//! ```

use std::{
    error::Error as StdError,
    fmt, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use serde::Deserialize;

use crate::{
    bar::{HiddenMode, Orientation},
    item::{InputNeeds, Item, ItemError},
    render::{self, Color, Radii, Style},
};

/// The screen edge the bar is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

impl Position {
    pub fn orientation(self) -> Orientation {
        match self {
            Position::Top | Position::Bottom => Orientation::Horizontal,
            Position::Left | Position::Right => Orientation::Vertical,
        }
    }
}

/// The layer-shell layer the bar is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Background,
    #[default]
    Bottom,
    Top,
    Overlay,
}

/// Corner radius: one value for every corner, or top-left, top-right,
/// bottom-right and bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Radius {
    Uniform(f64),
    Corners([f64; 4]),
}

impl Radius {
    pub fn radii(self) -> Radii {
        match self {
            Radius::Uniform(r) => Radii::uniform(r),
            Radius::Corners([top_left, top_right, bottom_right, bottom_left]) => Radii {
                top_left,
                top_right,
                bottom_right,
                bottom_left,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct BarConfig {
    pub position: Position,
    pub layer: Layer,
    /// Thickness of the bar and side length of its buttons.
    pub size: u32,
    pub icon_padding: u32,
    pub indicator_padding: u32,
    pub radius: Radius,
    pub background_colour: Color,
    pub indicator_hover_colour: Color,
    pub indicator_active_colour: Color,
    pub cursor_name_default: String,
    pub cursor_name_hover: String,
    pub cursor_size: u32,
    pub namespace: String,
    /// Reserve the bar's thickness so other surfaces do not overlap it.
    pub exclusive_zone: bool,
    pub hidden_mode: HiddenMode,
}

impl Default for BarConfig {
    fn default() -> Self {
        let style = Style::default();
        Self {
            position: Position::default(),
            layer: Layer::default(),
            size: 60,
            icon_padding: style.icon_padding,
            indicator_padding: style.indicator_padding,
            radius: Radius::Uniform(style.radii.top_left),
            background_colour: Color::rgba(0, 0, 0, 0xff),
            indicator_hover_colour: style.indicator_hover,
            indicator_active_colour: style.indicator_active,
            cursor_name_default: "default".into(),
            cursor_name_hover: "pointer".into(),
            cursor_size: 24,
            namespace: "dockbar".into(),
            exclusive_zone: true,
            hidden_mode: HiddenMode::Never,
        }
    }
}

impl BarConfig {
    pub fn style(&self) -> Style {
        Style {
            icon_padding: self.icon_padding,
            indicator_padding: self.indicator_padding,
            radii: self.radius.radii(),
            indicator_hover: self.indicator_hover_colour,
            indicator_active: self.indicator_active_colour,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    bar: BarConfig,
    #[serde(default)]
    item: Vec<toml::Spanned<toml::Table>>,
}

/// A fully loaded configuration.
#[derive(Debug)]
pub struct Config {
    pub path: PathBuf,
    pub bar: BarConfig,
    pub items: Vec<Rc<Item>>,
    /// Input capabilities the bindings of all items need.
    pub needs: InputNeeds,
}

impl Config {
    /// `$XDG_CONFIG_HOME/dockbar/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("dockbar").join("config.toml"))
    }

    /// Read the file this configuration came from again. `self` is left
    /// untouched, so a broken file keeps the running panel as it is.
    pub fn reload(&self) -> Result<Self, ConfigError> {
        Self::load(&self.path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&source, path)
    }

    /// Parse `source`; `path` is only used for error messages.
    pub fn parse(source: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(source).map_err(|e| ConfigError::Syntax {
            path: path.to_owned(),
            line: e.span().map(|span| line_of(source, span.start)),
            message: e.message().to_owned(),
        })?;

        if raw.bar.size == 0 {
            return Err(ConfigError::Bar {
                path: path.to_owned(),
                message: "size must be greater than zero".into(),
            });
        }

        let mut items = Vec::with_capacity(raw.item.len());
        let mut needs = InputNeeds::default();
        for table in raw.item {
            let line = line_of(source, table.span().start);
            let item = parse_item(table.get_ref()).map_err(|source| ConfigError::Item {
                path: path.to_owned(),
                line,
                source,
            })?;
            needs = needs.merge(item.input_needs());
            items.push(Rc::new(item));
        }

        if !items.iter().any(|item| item.is_button()) {
            return Err(ConfigError::NoButtons {
                path: path.to_owned(),
            });
        }

        let length = items.iter().try_fold(0u32, |length, item| {
            let item_length = if item.is_button() {
                raw.bar.size
            } else {
                item.length()
            };
            length.checked_add(item_length)
        });
        if length.and_then(|length| render::buffer_len(length, raw.bar.size)).is_none() {
            return Err(ConfigError::Bar {
                path: path.to_owned(),
                message: "bar is too large to draw".into(),
            });
        }

        tracing::debug!(path = %path.display(), items = items.len(), ?needs, "configuration loaded");
        Ok(Self {
            path: path.to_owned(),
            bar: raw.bar,
            items,
            needs,
        })
    }
}

/// 1-based line of the byte offset `pos`.
fn line_of(source: &str, pos: usize) -> usize {
    source[..pos.min(source.len())].matches('\n').count() + 1
}

fn parse_item(table: &toml::Table) -> Result<Item, ItemError> {
    let mut item = match table.get("type").and_then(|t| t.as_str()) {
        Some("button") => Item::button(),
        Some("spacer") => Item::spacer(0),
        Some(other) => return Err(ItemError::UnknownType(other.to_owned())),
        None => return Err(ItemError::UnknownType(String::new())),
    };

    for (key, value) in table.iter().filter(|(key, _)| *key != "type") {
        let value = match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            _ => return Err(ItemError::InvalidValue(key.clone())),
        };
        item.set_variable(key, &value)?;
    }

    item.validate()?;
    Ok(item)
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Syntax {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },
    Bar {
        path: PathBuf,
        message: String,
    },
    Item {
        path: PathBuf,
        line: usize,
        source: ItemError,
    },
    NoButtons {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Syntax {
                path,
                line: Some(line),
                message,
            } => write!(f, "{}:{line}: {message}", path.display()),
            Self::Syntax {
                path,
                line: None,
                message,
            } => write!(f, "{}: {message}", path.display()),
            Self::Bar { path, message } => write!(f, "{}: [bar]: {message}", path.display()),
            Self::Item { path, line, source } => write!(f, "{}:{line}: {source}", path.display()),
            Self::NoButtons { path } => write!(f, "{}: no buttons configured", path.display()),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Item { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::item::{
        command::{Interaction, InteractionKind, MetaAction, BTN_LEFT},
        ItemKind,
    };

    fn parse(source: &str) -> Result<Config, ConfigError> {
        Config::parse(source, Path::new("config.toml"))
    }

    #[test]
    fn full_config() {
        let config = parse(
            r##"
[bar]
position = "left"
layer = "overlay"
size = 40
hidden-mode = "always"
radius = [1, 2, 3, 4]
background-colour = "#20202080"
indicator-active-colour = "#ff0000"

[[item]]
type = "button"
toplevel-app-id = "foot"
command = "foot"
"command[shift+mouse-left]" = "@toplevel-close"

[[item]]
type = "spacer"
length = 12

[[item]]
type = "button"
"command[touch]" = "@exit"
"##,
        )
        .unwrap();

        assert_eq!(config.bar.position, Position::Left);
        assert_eq!(config.bar.position.orientation(), Orientation::Vertical);
        assert_eq!(config.bar.layer, Layer::Overlay);
        assert_eq!(config.bar.size, 40);
        assert_eq!(config.bar.hidden_mode, HiddenMode::Always);
        assert_eq!(config.bar.background_colour, Color::rgba(0x20, 0x20, 0x20, 0x80));
        let style = config.bar.style();
        assert_eq!(style.radii.bottom_left, 4.);
        assert_eq!(style.indicator_active, Color::rgba(255, 0, 0, 255));
        assert_eq!(config.bar.cursor_name_hover, "pointer");

        assert_eq!(config.items.len(), 3);
        assert_eq!(config.items[0].app_id(), Some("foot"));
        assert_eq!(config.items[1].kind(), ItemKind::Spacer);
        assert_eq!(config.items[1].length(), 12);

        let shift_left = Interaction::new(InteractionKind::MouseButton, crate::Modifiers::SHIFT, BTN_LEFT);
        let cmd = config.items[0].commands().resolve(&shift_left).unwrap();
        assert_eq!(cmd.action.meta, MetaAction::ToplevelClose);

        assert_eq!(
            config.needs,
            InputNeeds {
                keyboard: true,
                pointer: true,
                touch: true
            }
        );
    }

    #[test]
    fn defaults_apply() {
        let config = parse("[[item]]\ntype = \"button\"\n").unwrap();
        assert_eq!(config.bar, BarConfig::default());
        assert_eq!(config.needs, InputNeeds::default());
    }

    #[test]
    fn item_errors_carry_line() {
        let err = parse(
            "[bar]\nsize = 30\n\n[[item]]\ntype = \"button\"\n\n[[item]]\ntype = \"button\"\n\"command[alt]\" = \"x\"\n",
        )
        .unwrap_err();
        match &err {
            ConfigError::Item { line, source, .. } => {
                assert!((7..=8).contains(line), "line {line}");
                assert!(matches!(source, ItemError::Binding { .. }));
                assert!(err.to_string().starts_with(&format!("config.toml:{line}: ")));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_items() {
        assert!(matches!(
            parse("[[item]]\ntype = \"launcher\"\n"),
            Err(ConfigError::Item {
                source: ItemError::UnknownType(_),
                ..
            })
        ));
        assert!(matches!(
            parse("[[item]]\ntype = \"button\"\n[[item]]\ntype = \"spacer\"\n"),
            Err(ConfigError::Item {
                source: ItemError::MissingLength,
                line: 3 | 4,
                ..
            })
        ));
        assert!(matches!(
            parse("[[item]]\ntype = \"button\"\ncommand = [\"a\"]\n"),
            Err(ConfigError::Item {
                source: ItemError::InvalidValue(_),
                ..
            })
        ));
        assert!(matches!(
            parse("[[item]]\ntype = \"spacer\"\nlength = 4\n"),
            Err(ConfigError::NoButtons { .. })
        ));
    }

    #[test]
    fn rejects_invalid_bar() {
        assert!(matches!(
            parse("[bar]\nsize = 0\n[[item]]\ntype = \"button\"\n"),
            Err(ConfigError::Bar { .. })
        ));
        assert!(matches!(
            parse("[bar]\nwidth = 3\n"),
            Err(ConfigError::Syntax { .. })
        ));
        assert!(matches!(
            parse("[bar]\nbackground-colour = \"red\"\n"),
            Err(ConfigError::Syntax { .. })
        ));
    }

    #[test]
    fn rejects_oversized_bar() {
        assert!(matches!(
            parse("[bar]\nsize = 40000\n[[item]]\ntype = \"button\"\n"),
            Err(ConfigError::Bar { .. })
        ));
        assert!(matches!(
            parse(
                "[[item]]\ntype = \"button\"\n\
                 [[item]]\ntype = \"spacer\"\nlength = 4294967295\n"
            ),
            Err(ConfigError::Bar { .. })
        ));
    }

    #[test]
    fn failed_reload_keeps_current_config() {
        let dir = std::env::temp_dir().join(format!("dockbar-reload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        std::fs::write(&path, "[bar]\nsize = 32\n[[item]]\ntype = \"button\"\n").unwrap();
        let config = Config::load(&path).unwrap();

        std::fs::write(&path, "[bar]\nsize = \n").unwrap();
        assert!(matches!(config.reload(), Err(ConfigError::Syntax { .. })));
        assert_eq!(config.bar.size, 32);
        assert_eq!(config.items.len(), 1);

        std::fs::write(
            &path,
            "[bar]\nsize = 24\n[[item]]\ntype = \"button\"\n[[item]]\ntype = \"button\"\n",
        )
        .unwrap();
        let reloaded = config.reload().unwrap();
        assert_eq!(reloaded.bar.size, 24);
        assert_eq!(reloaded.items.len(), 2);
        assert_eq!(reloaded.path, config.path);
    }

    #[test]
    fn missing_file() {
        let err = Config::load(Path::new("/nonexistent/dockbar/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
