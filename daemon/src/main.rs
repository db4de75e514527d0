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

//! FLIR video device daemon (fvdd) - System service owning the camera's FPGA.
//!
//! At start-up the daemon detects the board from the device tree, attaches to its GPIOs,
//! regulators and buses, powers the FPGA up and configures it once. It then serves DBus
//! requests until terminated.
//!
//! # DBus Service
//!
//! - **Service Name**: `com.canonical.fvdd`
//! - **Status Interface**: `/com/canonical/fvdd/status` - Read-only operations
//! - **Control Interface**: `/com/canonical/fvdd/control` - Power and configuration
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`, `error`
//!   or `off`). Defaults to `info`

use fvdd::boards::detect_board;
use fvdd::comm::dbus::control_interface::ControlInterface;
use fvdd::comm::dbus::status_interface::StatusInterface;
use fvdd::comm::dbus::{DeviceCell, SharedDevice};
use fvdd::config::{FvdConfig, config};
use fvdd::device::FvdDevice;
use fvdd::error::FvdError;
use fvdd::hal::linux::hardware_from_config;
use log::{error, info};
use std::error::Error;
use std::future::pending;
use zbus::connection;

/// Detect, attach and initialise the FPGA. Failures are logged and kept for status queries.
fn attach_device(config: &FvdConfig) -> SharedDevice {
    let attached = detect_board(config).and_then(|board| {
        FvdDevice::attach(board, hardware_from_config(config), config.into())
    });
    let cell = match attached {
        Ok(mut device) => {
            if let Err(e) = device.initialize() {
                error!("FPGA initialisation failed: {e}");
            }
            DeviceCell::attached(device)
        }
        Err(e) => {
            error!("Cannot attach FPGA device: {e}");
            DeviceCell::failed(&e)
        }
    };
    cell.shared()
}

/// Main entry point for the fvdd daemon.
///
/// # Returns: `Result<(), Box<dyn Error>>`
/// * `Ok(())` - Never returns under normal operation (runs until terminated)
/// * `Err(Box<dyn Error>)` - Initialization error (DBus connection failed, etc.)
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config();
    let device = tokio::task::spawn_blocking(move || attach_device(config))
        .await
        .map_err(|e| FvdError::Internal(format!("attach task failed: {e}")))?;

    let status_interface = StatusInterface {
        device: device.clone(),
    };
    let control_interface = ControlInterface { device };

    let _conn = connection::Builder::system()?
        .name("com.canonical.fvdd")?
        .serve_at("/com/canonical/fvdd/status", status_interface)?
        .serve_at("/com/canonical/fvdd/control", control_interface)?
        .build()
        .await?;

    info!("Started com.canonical.fvdd dbus service");
    pending::<()>().await;

    Ok(())
}
