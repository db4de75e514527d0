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

//! Status command implementation.

use crate::proxies::status_proxy;
use zbus::Connection;

async fn proxy(connection: &Connection) -> Result<status_proxy::StatusProxy<'_>, zbus::Error> {
    status_proxy::StatusProxy::new(connection).await
}

fn level(asserted: bool) -> &'static str {
    match asserted {
        true => "asserted",
        false => "deasserted",
    }
}

/// Current pin levels as a small table.
async fn get_pins_message(connection: &Connection) -> Result<String, zbus::Error> {
    let status = proxy(connection).await?;
    let done = status.get_pin_done().await?;
    let nstatus = status.get_pin_status().await?;
    let ready = status.get_pin_ready().await?;
    Ok(format!(
        "---- PINS ----\n\
        | CONF_DONE | nSTATUS | READY |\n\
        | {} | {} | {} |",
        level(done),
        level(nstatus),
        level(ready)
    ))
}

/// Handler for the status command.
///
/// # Arguments
///
/// * `pins` - Print only the handshake pin levels
/// * `headers` - Also print the header of the last image the daemon parsed
///
/// # Returns: `Result<String, zbus::Error>`
/// * `Ok(String)` - Text to print
/// * `Err(zbus::Error)` - DBus communication error or FvdError reported by the daemon
pub async fn status_handler(pins: bool, headers: bool) -> Result<String, zbus::Error> {
    let connection = Connection::system().await?;
    if pins {
        return get_pins_message(&connection).await;
    }
    let status = proxy(&connection).await?;
    let mut message = status.get_status().await?;
    if headers {
        message.push_str("\n---- IMAGE ----\n");
        message.push_str(&status.get_headers().await?);
    }
    Ok(message)
}
