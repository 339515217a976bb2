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

//! wayland backend errors.

use smithay_client_toolkit::reexports::client::{
    self,
    globals::{BindError, GlobalError},
};
use std::{error::Error as StdError, fmt, sync::Arc};

#[derive(Debug, Clone)]
pub enum Error {
    /// Error connecting to wayland server.
    Connect(Arc<client::ConnectError>),
    /// The registry could not be read.
    Global(Arc<GlobalError>),
    /// A required wayland global either doesn't exist, or doesn't support the
    /// version we need.
    Bind {
        name: &'static str,
        inner: Arc<BindError>,
    },
    /// The event loop could not be set up or failed while dispatching.
    EventLoop(Arc<dyn StdError + Send + Sync + 'static>),
}

impl Error {
    pub fn bind(name: &'static str, inner: BindError) -> Self {
        Error::Bind {
            name,
            inner: Arc::new(inner),
        }
    }

    pub fn event_loop(e: impl StdError + Send + Sync + 'static) -> Self {
        Self::EventLoop(Arc::new(e))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Self::Connect(e) => write!(f, "could not connect to the wayland server: {e}"),
            Self::Global(e) => write!(f, "could not read the wayland registry: {e}"),
            Self::Bind { name, inner } => {
                write!(f, "a required wayland global ({name}) was unavailable: {inner}")
            }
            Self::EventLoop(e) => write!(f, "event loop failed: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connect(e) => Some(&**e),
            Self::Global(e) => Some(&**e),
            Self::Bind { inner, .. } => Some(&**inner),
            Self::EventLoop(e) => Some(&**e),
        }
    }
}

impl From<client::ConnectError> for Error {
    fn from(err: client::ConnectError) -> Self {
        Self::Connect(Arc::new(err))
    }
}

impl From<GlobalError> for Error {
    fn from(err: GlobalError) -> Self {
        Self::Global(Arc::new(err))
    }
}
