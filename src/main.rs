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


use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use dockbar::{backend::wayland, Config};

/// A launcher panel for wayland compositors.
///
/// Send SIGUSR1 to reload the configuration.
#[derive(Debug, Parser)]
#[command(name = "dockbar", version)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging; repeat for more.
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
}

/// `RUST_LOG` wins; otherwise the level follows the number of `-v` flags.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let path = match args.config {
        Some(path) => path,
        None => Config::default_path().context("no configuration directory, pass -c <path>")?,
    };
    let config = Config::load(&path)?;
    tracing::debug!(path = %path.display(), items = config.items.len(), "loaded configuration");

    wayland::run(config)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::{error::ErrorKind, CommandFactory};

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from(["dockbar", "-vv", "-c", "/tmp/dock.toml", "-v"]).unwrap();
        assert_eq!(args.verbose, 3);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/dock.toml")));

        let args = Args::try_parse_from(["dockbar", "--config=/tmp/other.toml"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/other.toml")));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Args::try_parse_from(["dockbar", "-c"]).is_err());
        assert!(Args::try_parse_from(["dockbar", "-x"]).is_err());
        assert!(Args::try_parse_from(["dockbar", "stray"]).is_err());
        let help = Args::try_parse_from(["dockbar", "-h"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn command_is_consistent() {
        Args::command().debug_assert();
    }
}
