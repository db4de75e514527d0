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

//! Power and configuration command implementations.
//!
//! Each handler is a single call on the daemon's control interface; the daemon's reply is
//! returned for printing.

use crate::proxies::control_proxy;
use zbus::Connection;

/// What to ask the daemon to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    PowerUp { reconfigure: bool },
    PowerDown,
    FpaUp,
    FpaDown,
    Load,
    Reload,
    ReadHeader,
    Suspend,
    Resume,
}

/// Send one request to the control interface.
///
/// # Returns: `Result<String, zbus::Error>`
/// * `Ok(String)` - Success message from the daemon
/// * `Err(zbus::Error)` - DBus communication error or FvdError reported by the daemon
pub async fn control_handler(request: ControlRequest) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    let proxy = control_proxy::ControlProxy::new(&connection).await?;
    match request {
        ControlRequest::PowerUp { reconfigure } => proxy.power_up(reconfigure).await,
        ControlRequest::PowerDown => proxy.power_down().await,
        ControlRequest::FpaUp => proxy.power_up_fpa().await,
        ControlRequest::FpaDown => proxy.power_down_fpa().await,
        ControlRequest::Load => proxy.load_fpga().await,
        ControlRequest::Reload => proxy.reload_fpga().await,
        ControlRequest::ReadHeader => proxy.read_flash_header().await,
        ControlRequest::Suspend => proxy.suspend().await,
        ControlRequest::Resume => proxy.resume().await,
    }
}
