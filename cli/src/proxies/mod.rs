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

//! DBus proxy interfaces for the fvdd daemon.
//!
//! # DBus Service Information
//!
//! - **Service Name**: `com.canonical.fvdd`
//! - **Control Interface**: `com.canonical.fvdd.control` at `/com/canonical/fvdd/control`
//! - **Status Interface**: `com.canonical.fvdd.status` at `/com/canonical/fvdd/status`

pub mod control_proxy;
pub mod status_proxy;
