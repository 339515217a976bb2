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

//! Bar instances: one panel per output, holding that output's item instances.

use std::{collections::BTreeMap, convert::Infallible, fmt, rc::Rc};

use serde::Deserialize;

use crate::{
    counter::Counter,
    item::{
        instance::{ItemInstance, ItemSurface},
        Item,
    },
    render::{RenderContext, RenderOutcome, Style},
};

/// Identifies a bar instance. Ids are never reused, so an id held across a
/// reload can never resolve to a rebuilt bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BarId(u64);

impl fmt::Display for BarId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bar#{}", self.0)
    }
}

/// An item instance on a particular bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceRef {
    pub bar: BarId,
    pub index: usize,
}

/// The output a bar is shown on, as passed to spawned commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub name: String,
    pub scale: u32,
}

impl OutputInfo {
    pub fn new(name: impl Into<String>, scale: u32) -> Self {
        Self {
            name: name.into(),
            scale: scale.max(1),
        }
    }
}

/// The axis items are laid out along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// When a bar hides its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenMode {
    #[default]
    Never,
    /// Hidden unless a pointer is over the bar.
    Always,
}

pub struct BarInstance {
    id: BarId,
    output: OutputInfo,
    orientation: Orientation,
    size: u32,
    style: Style,
    instances: Vec<ItemInstance>,
    hidden_mode: HiddenMode,
    /// Pointers currently over the bar.
    pointers: Counter,
    hidden: bool,
    frame_requested: bool,
}

impl BarInstance {
    /// Lay out `items` in order along the bar, asking `make_surface` for the
    /// surface of each instance.
    pub fn new(
        id: BarId,
        output: OutputInfo,
        orientation: Orientation,
        size: u32,
        style: Style,
        items: &[Rc<Item>],
        mut make_surface: impl FnMut(&Item) -> Box<dyn ItemSurface>,
    ) -> Self {
        let built = Self::try_new(id, output, orientation, size, style, items, |item| {
            Ok::<_, Infallible>(make_surface(item))
        });
        match built {
            Ok(bar) => bar,
            Err(never) => match never {},
        }
    }

    /// Like [`BarInstance::new`], for surfaces that can fail to be created.
    pub fn try_new<E>(
        id: BarId,
        output: OutputInfo,
        orientation: Orientation,
        size: u32,
        style: Style,
        items: &[Rc<Item>],
        mut make_surface: impl FnMut(&Item) -> Result<Box<dyn ItemSurface>, E>,
    ) -> Result<Self, E> {
        let mut offset = 0;
        let mut instances = Vec::with_capacity(items.len());
        for item in items {
            let length = if item.is_button() { size } else { item.length() };
            let (x, y, w, h) = match orientation {
                Orientation::Horizontal => (offset as i32, 0, length, size),
                Orientation::Vertical => (0, offset as i32, size, length),
            };
            offset += length;
            instances.push(ItemInstance::new(item.clone(), x, y, w, h, make_surface(item)?));
        }

        Ok(Self {
            id,
            output,
            orientation,
            size,
            style,
            instances,
            hidden_mode: HiddenMode::Never,
            pointers: Counter::ZERO,
            hidden: false,
            frame_requested: true,
        })
    }

    pub fn id(&self) -> BarId {
        self.id
    }

    pub fn output(&self) -> &OutputInfo {
        &self.output
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Logical width and height of the bar.
    pub fn dimensions(&self) -> (u32, u32) {
        let length = self
            .instances
            .iter()
            .map(|i| match self.orientation {
                Orientation::Horizontal => i.width,
                Orientation::Vertical => i.height,
            })
            .sum();
        match self.orientation {
            Orientation::Horizontal => (length, self.size),
            Orientation::Vertical => (self.size, length),
        }
    }

    pub fn instances(&self) -> &[ItemInstance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&ItemInstance> {
        self.instances.get(index)
    }

    pub fn instance_mut(&mut self, index: usize) -> Option<&mut ItemInstance> {
        self.instances.get_mut(index)
    }

    /// Index of the item instance under the bar-local position `(x, y)`.
    pub fn item_instance_at(&self, x: f64, y: f64) -> Option<usize> {
        self.instances.iter().position(|i| i.contains(x, y))
    }

    pub fn schedule_frame(&mut self) {
        self.frame_requested = true;
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Clear and return the frame request.
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    pub fn mark_dirty_and_schedule(&mut self, index: usize) {
        if let Some(instance) = self.instances.get_mut(index) {
            instance.mark_dirty();
            self.frame_requested = true;
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn hidden_mode(&self) -> HiddenMode {
        self.hidden_mode
    }

    pub fn set_hidden_mode(&mut self, mode: HiddenMode) {
        self.hidden_mode = mode;
        self.update_visibility();
    }

    pub(crate) fn pointer_enter(&mut self) {
        self.pointers.increment();
        self.update_visibility();
    }

    pub(crate) fn pointer_leave(&mut self) {
        self.pointers.decrement();
        self.update_visibility();
    }

    fn update_visibility(&mut self) {
        let hidden = match self.hidden_mode {
            HiddenMode::Never => false,
            HiddenMode::Always => self.pointers.get() == 0,
        };
        self.set_hidden(hidden);
    }

    fn set_hidden(&mut self, hidden: bool) {
        if self.hidden == hidden {
            return;
        }
        tracing::debug!(bar = %self.id, hidden, "bar visibility changed");
        self.hidden = hidden;
        self.mark_all_dirty();
    }

    /// Update the output scale; everything is redrawn at the new scale.
    pub fn set_scale(&mut self, scale: u32) {
        let scale = scale.max(1);
        if self.output.scale == scale {
            return;
        }
        self.output.scale = scale;
        self.mark_all_dirty();
    }

    fn mark_all_dirty(&mut self) {
        for instance in &mut self.instances {
            instance.mark_dirty();
        }
        self.frame_requested = true;
    }

    /// Whether any instance still waits for a render.
    pub fn has_dirty(&self) -> bool {
        self.instances.iter().any(|i| i.dirty)
    }

    /// Render every dirty instance. Returns the number of buffers presented.
    pub fn render_dirty(&mut self) -> usize {
        let ctx = RenderContext {
            hidden: self.hidden,
            scale: self.output.scale,
            style: &self.style,
        };
        let mut presented = 0;
        for instance in self.instances.iter_mut().filter(|i| i.dirty) {
            if let RenderOutcome::Presented { .. } = instance.render(ctx) {
                presented += 1;
            }
        }
        presented
    }

    /// Refresh the reserved toplevel indicators. `count` returns the number of
    /// toplevels and of activated toplevels for an app id.
    pub fn update_toplevel_state(&mut self, mut count: impl FnMut(&str) -> (u32, u32)) {
        for instance in &mut self.instances {
            let Some(app_id) = instance.item.app_id() else {
                continue;
            };
            let (exists, activated) = count(app_id);
            instance.set_toplevel_state(exists, activated);
        }
    }
}

impl fmt::Debug for BarInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BarInstance")
            .field("id", &self.id)
            .field("output", &self.output)
            .field("instances", &self.instances.len())
            .field("hidden_mode", &self.hidden_mode)
            .field("hidden", &self.hidden)
            .finish()
    }
}

/// All live bar instances.
#[derive(Debug, Default)]
pub struct Bars {
    next_id: u64,
    bars: BTreeMap<BarId, BarInstance>,
}

impl Bars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id and insert the bar `build` creates for it.
    pub fn insert_with(&mut self, build: impl FnOnce(BarId) -> BarInstance) -> BarId {
        let id = BarId(self.next_id);
        self.next_id += 1;
        self.bars.insert(id, build(id));
        id
    }

    /// Like [`Bars::insert_with`] for a fallible `build`. The id is used up
    /// even when `build` fails.
    pub fn try_insert_with<E>(
        &mut self,
        build: impl FnOnce(BarId) -> Result<BarInstance, E>,
    ) -> Result<BarId, E> {
        let id = BarId(self.next_id);
        self.next_id += 1;
        self.bars.insert(id, build(id)?);
        Ok(id)
    }

    pub fn get(&self, id: BarId) -> Option<&BarInstance> {
        self.bars.get(&id)
    }

    pub fn get_mut(&mut self, id: BarId) -> Option<&mut BarInstance> {
        self.bars.get_mut(&id)
    }

    pub fn instance(&self, at: InstanceRef) -> Option<&ItemInstance> {
        self.get(at.bar)?.instance(at.index)
    }

    pub fn instance_mut(&mut self, at: InstanceRef) -> Option<&mut ItemInstance> {
        self.get_mut(at.bar)?.instance_mut(at.index)
    }

    pub fn mark_dirty_and_schedule(&mut self, at: InstanceRef) {
        if let Some(bar) = self.get_mut(at.bar) {
            bar.mark_dirty_and_schedule(at.index);
        }
    }

    /// Remove a bar. Seats must forget it first.
    pub fn remove(&mut self, id: BarId) -> Option<BarInstance> {
        self.bars.remove(&id)
    }

    pub fn ids(&self) -> Vec<BarId> {
        self.bars.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BarInstance> {
        self.bars.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BarInstance> {
        self.bars.values_mut()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}


#[cfg(test)]
mod test {
    use super::{test_bar::memory_bar, *};

    fn items() -> Vec<Rc<Item>> {
        vec![
            Rc::new(Item::button()),
            Rc::new(Item::spacer(5)),
            Rc::new(Item::button().with_app_id("foot")),
        ]
    }

    #[test]
    fn lays_out_in_order() {
        let mut bars = Bars::new();
        let (id, surfaces) = memory_bar(&mut bars, &items(), 20);
        let bar = bars.get(id).unwrap();
        assert_eq!(bar.dimensions(), (45, 20));
        assert_eq!(surfaces[2].position(), (25, 0));

        assert_eq!(bar.item_instance_at(0., 0.), Some(0));
        assert_eq!(bar.item_instance_at(19.5, 10.), Some(0));
        assert_eq!(bar.item_instance_at(20., 10.), Some(1));
        assert_eq!(bar.item_instance_at(25., 10.), Some(2));
        assert_eq!(bar.item_instance_at(45., 10.), None);
    }

    #[test]
    fn vertical_layout() {
        let bar = BarInstance::new(
            BarId(0),
            OutputInfo::new("eDP-1", 2),
            Orientation::Vertical,
            30,
            Style::default(),
            &items(),
            |_| crate::item::instance::test_surface::memory_surface().0,
        );
        assert_eq!(bar.dimensions(), (30, 65));
        assert_eq!(bar.item_instance_at(10., 31.), Some(1));
        assert_eq!(bar.item_instance_at(10., 35.), Some(2));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut bars = Bars::new();
        let (first, _) = memory_bar(&mut bars, &items(), 20);
        bars.remove(first);
        let (second, _) = memory_bar(&mut bars, &items(), 20);
        assert_ne!(first, second);
        assert!(bars.get(first).is_none());
        assert!(bars
            .instance(InstanceRef {
                bar: first,
                index: 0
            })
            .is_none());
    }

    #[test]
    fn failed_build_inserts_nothing() {
        let mut bars = Bars::new();
        let failed = bars.try_insert_with(|id| {
            BarInstance::try_new(
                id,
                OutputInfo::new("DP-1", 1),
                Orientation::Horizontal,
                20,
                Style::default(),
                &items(),
                |item| {
                    if item.is_button() {
                        Ok(crate::item::instance::test_surface::memory_surface().0)
                    } else {
                        Err("no pool")
                    }
                },
            )
        });
        assert_eq!(failed.unwrap_err(), "no pool");
        assert!(bars.is_empty());

        let (id, _) = memory_bar(&mut bars, &items(), 20);
        assert_eq!(id, BarId(1));
    }

    #[test]
    fn render_dirty_presents_buttons_only() {
        let mut bars = Bars::new();
        let (id, surfaces) = memory_bar(&mut bars, &items(), 20);
        let bar = bars.get_mut(id).unwrap();
        assert!(bar.take_frame_request());
        assert_eq!(bar.render_dirty(), 2);
        assert!(!bar.has_dirty());
        assert!(surfaces[1].presented().is_empty());

        bar.mark_dirty_and_schedule(0);
        assert!(bar.frame_requested());
        assert_eq!(bar.render_dirty(), 1);
        assert_eq!(surfaces[0].presented(), vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn hidden_mode_follows_pointers() {
        let mut bars = Bars::new();
        let (id, surfaces) = memory_bar(&mut bars, &items(), 20);
        let bar = bars.get_mut(id).unwrap();
        bar.render_dirty();
        bar.take_frame_request();

        bar.set_hidden_mode(HiddenMode::Always);
        assert!(bar.is_hidden());
        assert!(bar.take_frame_request());
        assert_eq!(bar.render_dirty(), 0);
        assert_eq!(surfaces[0].detached(), 1);
        // Nothing is left to redraw while hidden.
        assert!(!bar.has_dirty());

        // Two pointers over the bar; it stays shown until both have left.
        bar.pointer_enter();
        bar.pointer_enter();
        assert!(!bar.is_hidden());
        assert_eq!(bar.render_dirty(), 2);
        bar.pointer_leave();
        assert!(!bar.is_hidden());
        bar.pointer_leave();
        assert!(bar.is_hidden());
        bar.render_dirty();
        assert_eq!(surfaces[0].detached(), 2);

        bar.set_hidden_mode(HiddenMode::Never);
        assert!(!bar.is_hidden());
    }

    #[test]
    fn never_hidden_ignores_pointers() {
        let mut bars = Bars::new();
        let (id, _) = memory_bar(&mut bars, &items(), 20);
        let bar = bars.get_mut(id).unwrap();
        bar.pointer_enter();
        bar.pointer_leave();
        bar.pointer_leave();
        assert!(!bar.is_hidden());
    }

    #[test]
    fn scale_change_redraws() {
        let mut bars = Bars::new();
        let (id, surfaces) = memory_bar(&mut bars, &items(), 20);
        let bar = bars.get_mut(id).unwrap();
        bar.render_dirty();
        bar.set_scale(2);
        bar.render_dirty();
        assert_eq!(surfaces[0].buffer_size(1), Some((40, 40)));
    }

    #[test]
    fn toplevel_state_only_for_items_with_app_id() {
        let mut bars = Bars::new();
        let (id, _) = memory_bar(&mut bars, &items(), 20);
        let bar = bars.get_mut(id).unwrap();
        bar.update_toplevel_state(|app_id| if app_id == "foot" { (2, 1) } else { (9, 9) });
        assert_eq!(bar.instance(0).unwrap().toplevel_exists(), 0);
        assert_eq!(bar.instance(2).unwrap().toplevel_exists(), 2);
        assert_eq!(bar.instance(2).unwrap().toplevel_activated(), 1);
    }
}
