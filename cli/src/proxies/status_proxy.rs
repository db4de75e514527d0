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
    interface = "com.canonical.fvdd.status",
    default_path = "/com/canonical/fvdd/status"
)]
pub trait Status {
    async fn get_status(&self) -> Result<String>;
    async fn get_config_state(&self) -> Result<String>;
    async fn get_pin_done(&self) -> Result<bool>;
    async fn get_pin_status(&self) -> Result<bool>;
    async fn get_pin_ready(&self) -> Result<bool>;
    async fn get_headers(&self) -> Result<String>;
    async fn get_board(&self) -> Result<String>;
}
