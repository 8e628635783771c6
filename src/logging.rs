// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared `fern`/`log` setup, in the style of the CLI shells that sit on
//! top of the core (see `src/bin/luxera_cli.rs`). The core itself only
//! ever calls `log::{trace,debug,warn}!`; it never configures a logger.

use chrono::Local;

/// Initialize the global logger at the given verbosity. `0` is info, `1` is
/// debug, `2+` is trace. Safe to call more than once; subsequent calls are
/// no-ops.
pub fn setup_logging(verbosity: u8) -> Result<(), fern::InitError> {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}][{}] {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
