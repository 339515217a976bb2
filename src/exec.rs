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

//! Running item commands.

use std::{error::Error as StdError, fmt, os::unix::process::CommandExt, process::Command};

use nix::{
    libc,
    sys::{
        signal::{sigprocmask, SigSet, SigmaskHow},
        wait::waitpid,
    },
    unistd::{self, ForkResult},
};

use crate::bar::OutputInfo;

pub const OUTPUT_NAME_VAR: &str = "DOCKBAR_OUTPUT_NAME";
pub const OUTPUT_SCALE_VAR: &str = "DOCKBAR_OUTPUT_SCALE";

/// The shell invocation a command is run with.
pub fn shell_command(command: &str, output: &OutputInfo) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c")
        .arg(command)
        .env(OUTPUT_NAME_VAR, &output.name)
        .env(OUTPUT_SCALE_VAR, output.scale.to_string());
    cmd
}

/// Run `command` through `/bin/sh` in a process fully detached from the panel.
///
/// The command is double-forked so it is reparented away from the panel and
/// never becomes a zombie; only the short-lived intermediate child is waited
/// for.
pub fn spawn_detached(command: &str, output: &OutputInfo) -> Result<(), SpawnError> {
    tracing::debug!(command, output = %output.name, "spawning");

    // The command is prepared before forking so the children do not allocate.
    let mut cmd = shell_command(command, output);

    // SAFETY: the panel is single threaded; the children only exec or _exit.
    match unsafe { unistd::fork() }.map_err(SpawnError::Fork)? {
        ForkResult::Parent { child } => {
            if let Err(e) = waitpid(child, None) {
                tracing::warn!("failed to reap intermediate child: {e}");
            }
            Ok(())
        }
        ForkResult::Child => {
            let _ = unistd::setsid();
            let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);

            // SAFETY: as above.
            let status = match unsafe { unistd::fork() } {
                Ok(ForkResult::Child) => {
                    let _ = cmd.exec();
                    127
                }
                Ok(ForkResult::Parent { .. }) => 0,
                Err(_) => 1,
            };
            // SAFETY: exits without running the panel's destructors or atexit hooks.
            unsafe { libc::_exit(status) }
        }
    }
}

/// Like [`spawn_detached`], but logs failures instead of returning them.
pub fn run(command: &str, output: &OutputInfo) {
    if let Err(e) = spawn_detached(command, output) {
        tracing::error!(command, "{e}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    Fork(nix::Error),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Fork(e) => write!(f, "failed to fork: {e}"),
        }
    }
}

impl StdError for SpawnError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Fork(e) => Some(e),
        }
    }
}
