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

pub mod control_interface;
pub mod status_interface;

use crate::bitstream::ImageHeaders;
use crate::device::{FvdDevice, StatusSnapshot};
use crate::error::FvdError;
use log::trace;
use std::fmt::Write;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// The attached device, or why there is none. Every interface holds the same cell and every
/// call locks it for its whole duration.
pub struct DeviceCell {
    device: Option<FvdDevice>,
    attach_error: Option<String>,
}

pub type SharedDevice = Arc<Mutex<DeviceCell>>;

impl DeviceCell {
    pub fn attached(device: FvdDevice) -> Self {
        DeviceCell {
            device: Some(device),
            attach_error: None,
        }
    }

    pub fn failed(error: &FvdError) -> Self {
        DeviceCell {
            device: None,
            attach_error: Some(error.to_string()),
        }
    }

    pub fn shared(self) -> SharedDevice {
        Arc::new(Mutex::new(self))
    }

    pub fn device(&self) -> Result<&FvdDevice, FvdError> {
        self.device
            .as_ref()
            .ok_or_else(|| not_attached(&self.attach_error))
    }

    pub fn device_mut(&mut self) -> Result<&mut FvdDevice, FvdError> {
        self.device
            .as_mut()
            .ok_or_else(|| not_attached(&self.attach_error))
    }
}

fn not_attached(attach_error: &Option<String>) -> FvdError {
    FvdError::Internal(format!(
        "no FPGA device attached: {}",
        attach_error.as_deref().unwrap_or("not attached yet")
    ))
}

pub(crate) async fn lock_device(shared: &SharedDevice) -> MutexGuard<'_, DeviceCell> {
    let guard = shared.lock().await;
    trace!("Got device lock.");
    guard
}

/// Run a blocking device operation without stalling the other tasks of the runtime.
pub(crate) fn run_blocking<T>(operation: impl FnOnce() -> T) -> T {
    tokio::task::block_in_place(operation)
}

fn level(asserted: bool) -> &'static str {
    match asserted {
        true => "asserted",
        false => "deasserted",
    }
}

pub fn format_status(status: &StatusSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "board: {} ({:?})", status.board, status.boot_mode);
    let _ = writeln!(out, "mainboard: {}", status.identity);
    let _ = writeln!(out, "config_state: {}", status.config_state);
    let _ = writeln!(out, "handshake: {}", status.handshake);
    let _ = writeln!(out, "bus_mode: {}", status.bus_mode);
    let _ = writeln!(out, "fpga_power: {}", status.fpga_powered);
    let _ = writeln!(out, "fpa_power: {}", status.fpa_powered);
    let _ = writeln!(out, "conf_done: {}", level(status.done_asserted));
    let _ = writeln!(out, "status: {}", level(status.status_asserted));
    let _ = writeln!(out, "ready: {}", level(status.ready_asserted));
    let _ = write!(
        out,
        "last_error: {}",
        status.last_error.as_deref().unwrap_or("none")
    );
    out
}

pub fn format_headers(headers: &ImageHeaders) -> String {
    let generic = &headers.generic;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "image: {} {} {}.{}.{} (header rev {}, {} first)",
        generic.name,
        generic.date,
        generic.major,
        generic.minor,
        generic.edit,
        generic.header_revision,
        if generic.lsb_first { "LSB" } else { "MSB" }
    );
    match &headers.board {
        Some(board) => {
            let _ = writeln!(
                out,
                "board: {} fpga_type {} hw {}.{} frame {}x{}x{}",
                board.identity,
                board.fpga_type,
                board.hw_type,
                board.hw_major,
                board.frb_width,
                board.frb_height,
                board.frb_pixel_size
            );
            let _ = writeln!(
                out,
                "tables: cft {}/{} pal {}/{} exp {}/{} hst {}",
                board.cft_version,
                board.cft_size,
                board.pal_version,
                board.pal_size,
                board.exp_version,
                board.exp_size,
                board.hst_size
            );
        }
        None => {
            let _ = writeln!(out, "board: none");
        }
    }
    for (index, buffer) in headers.buffers.iter().enumerate() {
        let _ = writeln!(
            out,
            "buffer {index}: 0x{:08X} +0x{:X}",
            buffer.start, buffer.size
        );
    }
    out.trim_end().to_string()
}
