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

use crate::bar::{BarId, Bars, InstanceRef};

/// A live touch and the item instance it started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPoint {
    pub id: i32,
    pub at: InstanceRef,
}

/// The touch points of one seat.
///
/// A touch only interacts with an item when it goes down and up on the same
/// instance. Drifting off the instance aborts it.
#[derive(Debug, Default)]
pub struct TouchTracker {
    points: Vec<TouchPoint>,
}

impl TouchTracker {
    pub fn points(&self) -> &[TouchPoint] {
        &self.points
    }

    pub fn get(&self, id: i32) -> Option<&TouchPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(crate) fn down(&mut self, bars: &mut Bars, bar: BarId, id: i32, x: f64, y: f64) {
        if self.get(id).is_some() {
            tracing::warn!(id, "touch down for an id that is already down");
            return;
        }
        let Some(bar) = bars.get_mut(bar) else {
            tracing::warn!(%bar, "touch down on an unknown surface");
            return;
        };
        let Some(index) = bar.item_instance_at(x, y) else {
            return;
        };
        let Some(instance) = bar.instance_mut(index) else {
            return;
        };

        tracing::debug!(id, x, y, index, "touch down");
        instance.press.increment();
        instance.mark_dirty();
        bar.schedule_frame();
        self.points.push(TouchPoint {
            id,
            at: InstanceRef {
                bar: bar.id(),
                index,
            },
        });
    }

    pub(crate) fn motion(&mut self, bars: &mut Bars, id: i32, x: f64, y: f64) {
        let Some(point) = self.get(id).copied() else {
            return;
        };
        let current = bars
            .get(point.at.bar)
            .and_then(|bar| bar.item_instance_at(x, y));
        if current != Some(point.at.index) {
            tracing::debug!(id, "touch left its item, aborting");
            self.destroy(bars, id);
        }
    }

    /// Remove a point, dropping the press indicator it holds.
    pub(crate) fn destroy(&mut self, bars: &mut Bars, id: i32) {
        let Some(pos) = self.points.iter().position(|p| p.id == id) else {
            return;
        };
        let point = self.points.remove(pos);
        unwind(bars, point);
    }

    pub(crate) fn cancel(&mut self, bars: &mut Bars) {
        for point in self.points.drain(..) {
            unwind(bars, point);
        }
    }

    /// Destroy every point that started on `bar`.
    pub(crate) fn forget_bar(&mut self, bars: &mut Bars, bar: BarId) {
        let (gone, kept): (Vec<_>, Vec<_>) =
            self.points.drain(..).partition(|p| p.at.bar == bar);
        self.points = kept;
        for point in gone {
            unwind(bars, point);
        }
    }
}

fn unwind(bars: &mut Bars, point: TouchPoint) {
    let Some(bar) = bars.get_mut(point.at.bar) else {
        return;
    };
    if let Some(instance) = bar.instance_mut(point.at.index) {
        instance.press.decrement();
        instance.mark_dirty();
    }
    bar.schedule_frame();
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::{bar::test_bar::memory_bar, item::Item};

    fn setup() -> (Bars, BarId) {
        let items = vec![Rc::new(Item::button()), Rc::new(Item::button())];
        let mut bars = Bars::new();
        let (id, _) = memory_bar(&mut bars, &items, 20);
        (bars, id)
    }

    fn press(bars: &Bars, bar: BarId, index: usize) -> u32 {
        bars.get(bar).unwrap().instance(index).unwrap().press()
    }

    #[test]
    fn duplicate_down_is_ignored() {
        let (mut bars, bar) = setup();
        let mut touch = TouchTracker::default();
        touch.down(&mut bars, bar, 1, 5., 5.);
        touch.down(&mut bars, bar, 1, 25., 5.);
        assert_eq!(touch.points().len(), 1);
        assert_eq!(touch.get(1).unwrap().at.index, 0);
        assert_eq!(press(&bars, bar, 0), 1);
        assert_eq!(press(&bars, bar, 1), 0);
    }

    #[test]
    fn down_outside_items_is_ignored() {
        let (mut bars, bar) = setup();
        let mut touch = TouchTracker::default();
        touch.down(&mut bars, bar, 1, 45., 5.);
        assert!(touch.is_empty());
    }

    #[test]
    fn drifting_aborts() {
        let (mut bars, bar) = setup();
        let mut touch = TouchTracker::default();
        touch.down(&mut bars, bar, 1, 5., 5.);
        touch.motion(&mut bars, 1, 10., 10.);
        assert!(touch.get(1).is_some());
        touch.motion(&mut bars, 1, 25., 5.);
        assert!(touch.is_empty());
        assert_eq!(press(&bars, bar, 0), 0);
        assert_eq!(press(&bars, bar, 1), 0);

        touch.down(&mut bars, bar, 2, 5., 5.);
        touch.motion(&mut bars, 2, 5., 50.);
        assert!(touch.is_empty());
        assert_eq!(press(&bars, bar, 0), 0);
    }

    #[test]
    fn cancel_releases_everything() {
        let (mut bars, bar) = setup();
        let mut touch = TouchTracker::default();
        touch.down(&mut bars, bar, 1, 5., 5.);
        touch.down(&mut bars, bar, 2, 6., 6.);
        touch.down(&mut bars, bar, 3, 25., 5.);
        assert_eq!(press(&bars, bar, 0), 2);
        touch.cancel(&mut bars);
        assert!(touch.is_empty());
        assert_eq!(press(&bars, bar, 0), 0);
        assert_eq!(press(&bars, bar, 1), 0);
        assert!(bars.get(bar).unwrap().frame_requested());
    }

    #[test]
    fn forget_bar_only_touches_that_bar() {
        let items = vec![Rc::new(Item::button())];
        let mut bars = Bars::new();
        let (a, _) = memory_bar(&mut bars, &items, 20);
        let (b, _) = memory_bar(&mut bars, &items, 20);
        let mut touch = TouchTracker::default();
        touch.down(&mut bars, a, 1, 5., 5.);
        touch.down(&mut bars, b, 2, 5., 5.);
        touch.forget_bar(&mut bars, a);
        assert_eq!(touch.points().len(), 1);
        assert_eq!(touch.points()[0].at.bar, b);
        assert_eq!(press(&bars, a, 0), 0);
        assert_eq!(press(&bars, b, 0), 1);
    }
}
