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

use zbus::{Result, proxy};

#[proxy(
    default_service = "com.canonical.fvdd",
    interface = "com.canonical.fvdd.control",
    default_path = "/com/canonical/fvdd/control"
)]
pub trait Control {
    async fn power_up(&self, reconfigure: bool) -> Result<String>;
    async fn power_down(&self) -> Result<String>;
    async fn power_up_fpa(&self) -> Result<String>;
    async fn power_down_fpa(&self) -> Result<String>;
    async fn load_fpga(&self) -> Result<String>;
    async fn reload_fpga(&self) -> Result<String>;
    async fn read_flash_header(&self) -> Result<String>;
    async fn suspend(&self) -> Result<String>;
    async fn resume(&self) -> Result<String>;
}
