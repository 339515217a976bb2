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

//! Turning resolved interactions into commands and meta-actions.

use crate::{
    bar::OutputInfo,
    item::{
        command::{Interaction, MetaAction},
        Item,
    },
    seat::SeatId,
};

/// Loop-level flags the event loop polls after every dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    running: bool,
    reload: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            running: true,
            reload: false,
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the stopped loop should be restarted with fresh configuration.
    pub fn wants_reload(&self) -> bool {
        self.reload
    }

    pub fn request_reload(&mut self) {
        self.running = false;
        self.reload = true;
    }

    pub fn request_exit(&mut self) {
        self.running = false;
        self.reload = false;
    }

    /// Reset the flags before running the loop again after a reload.
    pub fn restart(&mut self) {
        *self = Self::default();
    }
}

/// Everything an interaction can reach outside the panel.
pub trait Host {
    /// A handle to a live toplevel window.
    type Toplevel;

    fn find_toplevel(&self, app_id: &str) -> Option<Self::Toplevel>;

    fn activate_toplevel(&mut self, toplevel: &Self::Toplevel, seat: SeatId);

    fn close_toplevel(&mut self, toplevel: &Self::Toplevel);

    /// Run a shell command detached from the panel. Never reports failure.
    fn run_command(&mut self, command: &str, output: &OutputInfo);

    fn lifecycle(&mut self) -> &mut Lifecycle;
}

/// Execute whatever `interaction` is bound to on `item`.
pub fn dispatch<H: Host>(
    item: &Item,
    output: &OutputInfo,
    seat: SeatId,
    interaction: Interaction,
    host: &mut H,
) {
    if !item.is_button() {
        return;
    }
    let Some(cmd) = item.commands().resolve(&interaction) else {
        tracing::trace!(?interaction, "no binding");
        return;
    };
    tracing::debug!(?interaction, action = ?cmd.action, output = %output.name, "dispatch");

    let command = cmd.action.command.as_deref();
    let run_literal = |host: &mut H| {
        if let Some(command) = command {
            host.run_command(command, output);
        }
    };

    match cmd.action.meta {
        MetaAction::None => run_literal(host),
        MetaAction::ToplevelActivate | MetaAction::ToplevelClose => {
            let toplevel = item.app_id().and_then(|id| host.find_toplevel(id));
            match toplevel {
                Some(toplevel) if cmd.action.meta == MetaAction::ToplevelActivate => {
                    host.activate_toplevel(&toplevel, seat)
                }
                Some(toplevel) => host.close_toplevel(&toplevel),
                None => run_literal(host),
            }
        }
        MetaAction::Reload => {
            run_literal(host);
            host.lifecycle().request_reload();
        }
        MetaAction::Exit => {
            run_literal(host);
            host.lifecycle().request_exit();
        }
    }
}


#[cfg(test)]
mod test {
    use super::{
        test_host::{Call, RecordingHost},
        *,
    };
    use crate::{
        item::command::{Binding, InteractionKind, BTN_LEFT, BTN_RIGHT, SCROLL_UP},
        Modifiers,
    };

    const SEAT: SeatId = SeatId(7);

    fn output() -> OutputInfo {
        OutputInfo::new("HDMI-A-1", 1)
    }

    fn left() -> Interaction {
        Interaction::new(InteractionKind::MouseButton, Modifiers::empty(), BTN_LEFT)
    }

    fn button(bindings: &[(&str, &str)]) -> Item {
        let mut item = Item::button();
        for (key, value) in bindings {
            item.set_variable(key, value).unwrap();
        }
        item
    }

    #[test]
    fn exact_binding_beats_universal() {
        let item = button(&[("command[mouse-left]", "cmd1"), ("command", "cmd2")]);
        let mut host = RecordingHost::default();
        dispatch(&item, &output(), SEAT, left(), &mut host);
        let right = Interaction::new(InteractionKind::MouseButton, Modifiers::empty(), BTN_RIGHT);
        dispatch(&item, &output(), SEAT, right, &mut host);
        let scroll = Interaction::new(InteractionKind::MouseScroll, Modifiers::empty(), SCROLL_UP);
        dispatch(&item, &output(), SEAT, scroll, &mut host);
        assert_eq!(host.commands(), vec!["cmd1", "cmd2"]);
        assert_eq!(
            host.calls[0],
            Call::Run {
                command: "cmd1".into(),
                output: "HDMI-A-1".into()
            }
        );
    }

    #[test]
    fn spacers_never_dispatch() {
        let mut spacer = Item::spacer(4);
        // Spacers reject bindings through configuration; force one in.
        spacer.bind(Binding::universal(), "nope");
        let mut host = RecordingHost::default();
        dispatch(&spacer, &output(), SEAT, left(), &mut host);
        assert!(host.calls.is_empty());
    }

    #[test]
    fn toplevel_meta_actions() {
        let item = button(&[
            ("toplevel-app-id", "foot"),
            ("command[mouse-left]", "@toplevel-activate foot --server"),
            ("command[mouse-right]", "@toplevel-close"),
        ]);
        let right = Interaction::new(InteractionKind::MouseButton, Modifiers::empty(), BTN_RIGHT);

        let mut host = RecordingHost {
            toplevels: vec!["foot".into()],
            ..Default::default()
        };
        dispatch(&item, &output(), SEAT, left(), &mut host);
        dispatch(&item, &output(), SEAT, right, &mut host);
        assert_eq!(
            host.calls,
            vec![
                Call::Activate {
                    app_id: "foot".into(),
                    seat: SEAT
                },
                Call::Close {
                    app_id: "foot".into()
                },
            ]
        );

        // No window: activate falls back to the literal, a pure close does nothing.
        let mut host = RecordingHost::default();
        dispatch(&item, &output(), SEAT, left(), &mut host);
        dispatch(&item, &output(), SEAT, right, &mut host);
        assert_eq!(host.commands(), vec!["foot --server"]);
        assert_eq!(host.calls.len(), 1);
    }

    #[test]
    fn lifecycle_meta_actions() {
        let item = button(&[
            ("command[mouse-left]", "@reload notify-send reloading"),
            ("command[mouse-right]", "@exit"),
        ]);
        let mut host = RecordingHost::default();
        dispatch(&item, &output(), SEAT, left(), &mut host);
        assert_eq!(host.commands(), vec!["notify-send reloading"]);
        assert!(!host.lifecycle.is_running());
        assert!(host.lifecycle.wants_reload());

        host.lifecycle.restart();
        assert!(host.lifecycle.is_running());

        let right = Interaction::new(InteractionKind::MouseButton, Modifiers::empty(), BTN_RIGHT);
        dispatch(&item, &output(), SEAT, right, &mut host);
        assert!(!host.lifecycle.is_running());
        assert!(!host.lifecycle.wants_reload());
        assert_eq!(host.commands().len(), 1);
    }

    #[test]
    fn modifiers_must_match() {
        let item = button(&[("command[shift+mouse-left]", "shifted")]);
        let mut host = RecordingHost::default();
        dispatch(&item, &output(), SEAT, left(), &mut host);
        assert!(host.calls.is_empty());

        let shifted = Interaction::new(InteractionKind::MouseButton, Modifiers::SHIFT, BTN_LEFT);
        dispatch(&item, &output(), SEAT, shifted, &mut host);
        assert_eq!(host.commands(), vec!["shifted"]);
    }
}
