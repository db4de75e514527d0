// This file is part of fvdd, an application to power, configure and supervise the FLIR video device FPGA.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fvdd is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fvdd is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Supported hardware revisions.
//!
//! | board       | boot       | compatible                               |
//! |-------------|------------|------------------------------------------|
//! | [`Mx51`]    | direct     | `fsl,imx51`                              |
//! | [`Mx6s`]    | direct     | `fsl,imx6dl`                             |
//! | [`Mx6q`]    | direct     | `fsl,imx6q`                              |
//! | [`Ec101`]   | flash      | `fsl,imx6dl-ec101`, `fsl,imx6dl-ec501`   |
//! | [`Ec702`]   | flash      | `fsl,imx6qp-ec702`                       |
//! | [`Eoco`]    | flash      | `fsl,imx6qp-eoco`                        |

pub mod board;
pub mod ec101;
pub mod ec702;
pub mod eoco;
pub mod mx51;
pub mod mx6q;
pub mod mx6s;

pub use board::{BoardProfile, BoardQuirks, BootMode, match_board, register_board};
pub use ec101::Ec101;
pub use ec702::Ec702;
pub use eoco::Eoco;
pub use mx51::Mx51;
pub use mx6q::Mx6q;
pub use mx6s::Mx6s;

use crate::config::FvdConfig;
use crate::error::FvdError;
use crate::system_io::fs_read_bytes;
use log::{info, trace};

/// GPIO number of pin `n` in 1-based i.MX bank `bank`.
pub(crate) const fn imx_gpio(bank: u32, n: u32) -> u32 {
    (bank - 1) * 32 + n
}

/// Register every board profile. Idempotent.
pub fn register_boards() {
    Ec101::register_board();
    Ec702::register_board();
    Eoco::register_board();
    Mx51::register_board();
    Mx6s::register_board();
    Mx6q::register_board();
}

/// Read the machine's device-tree compatible list.
pub fn read_machine_compatible(config: &FvdConfig) -> Result<Vec<String>, FvdError> {
    let raw = fs_read_bytes(&config.paths.machine_compatible)?;
    let raw = String::from_utf8_lossy(&raw);
    Ok(board::split_compatible(&raw)
        .into_iter()
        .map(String::from)
        .collect())
}

/// Pick the board profile for this machine.
///
/// The `[board] compat_string` configuration value, when set, is used instead of the
/// device tree.
pub fn detect_board(config: &FvdConfig) -> Result<Box<dyn BoardProfile>, FvdError> {
    register_boards();
    let compatibles = match &config.board.compat_string {
        Some(compat) => {
            trace!("Using configured compatible '{compat}'");
            vec![compat.clone()]
        }
        None => read_machine_compatible(config)?,
    };
    let board = match_board(&compatibles)?;
    info!("Detected {} board", board.name());
    Ok(board)
}
