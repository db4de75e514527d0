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

use crate::comm::dbus::{SharedDevice, format_headers, format_status, lock_device};
use crate::error::FvdError;
use log::info;
use zbus::{fdo, interface};

pub struct StatusInterface {
    pub device: SharedDevice,
}

#[interface(name = "com.canonical.fvdd.status")]
impl StatusInterface {
    async fn get_status(&self) -> Result<String, fdo::Error> {
        info!("get_status called");
        let cell = lock_device(&self.device).await;
        Ok(format_status(&cell.device()?.status()))
    }

    async fn get_config_state(&self) -> Result<String, fdo::Error> {
        info!("get_config_state called");
        let cell = lock_device(&self.device).await;
        Ok(cell.device()?.config_state().to_string())
    }

    async fn get_pin_done(&self) -> Result<bool, fdo::Error> {
        info!("get_pin_done called");
        let cell = lock_device(&self.device).await;
        Ok(cell.device()?.status().done_asserted)
    }

    async fn get_pin_status(&self) -> Result<bool, fdo::Error> {
        info!("get_pin_status called");
        let cell = lock_device(&self.device).await;
        Ok(cell.device()?.status().status_asserted)
    }

    async fn get_pin_ready(&self) -> Result<bool, fdo::Error> {
        info!("get_pin_ready called");
        let cell = lock_device(&self.device).await;
        Ok(cell.device()?.status().ready_asserted)
    }

    async fn get_headers(&self) -> Result<String, fdo::Error> {
        info!("get_headers called");
        let cell = lock_device(&self.device).await;
        match cell.device()?.headers() {
            Some(headers) => Ok(format_headers(headers)),
            None => Err(FvdError::Argument(String::from(
                "No image header has been read yet. Load the FPGA or read the flash header first.",
            ))
            .into()),
        }
    }

    async fn get_board(&self) -> Result<String, fdo::Error> {
        info!("get_board called");
        let cell = lock_device(&self.device).await;
        let device = cell.device()?;
        Ok(format!("{} {}", device.board().name(), device.identity()))
    }
}
