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

//! Saturating indicator counters.

/// Subtract `n` from `counter`, clamping the result at zero.
#[inline]
pub fn subtract(counter: u32, n: u32) -> u32 {
    if n > counter {
        0
    } else {
        counter - n
    }
}

/// A reference count that can never wrap below zero.
///
/// Release events may arrive duplicated or out of order (a leave racing a
/// button release, a cancel after an up), so every decrement goes through
/// [`subtract`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Counter(u32);

impl Counter {
    pub const ZERO: Counter = Counter(0);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether the counter is above zero.
    pub fn is_active(self) -> bool {
        self.0 > 0
    }

    pub fn add(&mut self, n: u32) {
        self.0 = self.0.saturating_add(n);
    }

    pub fn increment(&mut self) {
        self.add(1);
    }

    pub fn subtract(&mut self, n: u32) {
        self.0 = subtract(self.0, n);
    }

    pub fn decrement(&mut self) {
        self.subtract(1);
    }

    pub fn set(&mut self, value: u32) {
        self.0 = value;
    }
}
