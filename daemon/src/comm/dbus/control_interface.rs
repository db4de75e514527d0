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

use crate::comm::dbus::{SharedDevice, format_headers, lock_device, run_blocking};
use crate::power::RailGroup;
use log::info;
use zbus::{fdo, interface};

pub struct ControlInterface {
    pub device: SharedDevice,
}

#[interface(name = "com.canonical.fvdd.control")]
impl ControlInterface {
    async fn power_up(&self, reconfigure: bool) -> Result<String, fdo::Error> {
        info!("power_up called with reconfigure: {reconfigure}");
        let mut cell = lock_device(&self.device).await;
        let device = cell.device_mut()?;
        run_blocking(|| device.power_up(reconfigure))?;
        Ok(format!(
            "FPGA powered up ({})",
            device.rail_names(RailGroup::FpgaCore).join(", ")
        ))
    }

    async fn power_down(&self) -> Result<String, fdo::Error> {
        info!("power_down called");
        let mut cell = lock_device(&self.device).await;
        let device = cell.device_mut()?;
        run_blocking(|| device.power_down())?;
        Ok(match device.is_powered(RailGroup::FpgaCore) {
            true => format!("FPGA power-down is disabled on {}", device.board().name()),
            false => String::from("FPGA powered down"),
        })
    }

    async fn power_up_fpa(&self) -> Result<String, fdo::Error> {
        info!("power_up_fpa called");
        let mut cell = lock_device(&self.device).await;
        let device = cell.device_mut()?;
        run_blocking(|| device.power_up_fpa())?;
        Ok(String::from("FPA powered up"))
    }

    async fn power_down_fpa(&self) -> Result<String, fdo::Error> {
        info!("power_down_fpa called");
        let mut cell = lock_device(&self.device).await;
        run_blocking(|| cell.device_mut()?.power_down_fpa())?;
        Ok(String::from("FPA powered down"))
    }

    async fn load_fpga(&self) -> Result<String, fdo::Error> {
        info!("load_fpga called");
        let mut cell = lock_device(&self.device).await;
        let device = cell.device_mut()?;
        run_blocking(|| device.ensure_configured())?;
        let stats = run_blocking(|| device.load_fpga())?;
        Ok(match stats.skipped {
            true => String::from("FPGA already configured, image header refreshed"),
            false => format!("{stats}, {} bytes written", stats.bytes_written),
        })
    }

    async fn reload_fpga(&self) -> Result<String, fdo::Error> {
        info!("reload_fpga called");
        let mut cell = lock_device(&self.device).await;
        let elapsed = run_blocking(|| cell.device_mut()?.reload_fpga())?;
        Ok(format!("FPGA reconfigured, CONF_DONE after {elapsed} ms"))
    }

    async fn read_flash_header(&self) -> Result<String, fdo::Error> {
        info!("read_flash_header called");
        let mut cell = lock_device(&self.device).await;
        let device = cell.device_mut()?;
        run_blocking(|| device.ensure_configured())?;
        let headers = run_blocking(|| device.read_flash_header())?;
        Ok(format_headers(&headers))
    }

    async fn suspend(&self) -> Result<String, fdo::Error> {
        info!("suspend called");
        let mut cell = lock_device(&self.device).await;
        run_blocking(|| cell.device_mut()?.suspend())?;
        Ok(String::from("FPGA suspended"))
    }

    async fn resume(&self) -> Result<String, fdo::Error> {
        info!("resume called");
        let mut cell = lock_device(&self.device).await;
        run_blocking(|| cell.device_mut()?.resume())?;
        Ok(String::from("FPGA resumed"))
    }
}
