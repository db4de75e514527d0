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

//! Firmware images in the layout the daemon parses.

pub const GENERIC_HEADER_SIZE: usize = 92;
pub const BOARD_HEADER_SIZE: usize = 96;

fn text(out: &mut Vec<u8>, s: &str) {
    let mut field = [0u8; 16];
    field[..s.len()].copy_from_slice(s.as_bytes());
    out.extend_from_slice(&field);
}

fn word(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Generic header, a board section of `spec_size` bytes and `payload`.
pub fn image(lsb_first: bool, spec_size: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    text(&mut out, "FLIR");
    word(&mut out, 3);
    word(&mut out, u32::from(lsb_first));
    text(&mut out, "neco");
    text(&mut out, "2024-05-01");
    for value in [4, 1, 7, 0, 0, 0, 0] {
        word(&mut out, value);
    }
    word(&mut out, (GENERIC_HEADER_SIZE as u32) + spec_size);
    word(&mut out, spec_size);
    assert_eq!(out.len(), GENERIC_HEADER_SIZE);

    let mut section = vec![0u8; spec_size as usize];
    if section.len() >= BOARD_HEADER_SIZE {
        section[..4].copy_from_slice(b"BXAB");
        section[32..36].copy_from_slice(&640u32.to_le_bytes());
        section[36..40].copy_from_slice(&480u32.to_le_bytes());
        section[76..80].copy_from_slice(&1u32.to_le_bytes());
        if section.len() >= BOARD_HEADER_SIZE + 8 {
            section[96..100].copy_from_slice(&0x2000_0000u32.to_le_bytes());
            section[100..104].copy_from_slice(&0x0040_0000u32.to_le_bytes());
        }
    }
    out.extend_from_slice(&section);
    out.extend_from_slice(payload);
    out
}

/// A deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

/// A flash of `size` bytes whose last 64 KiB start with `header`.
pub fn flash_with_header(size: usize, header: &[u8]) -> Vec<u8> {
    let mut flash = vec![0xFFu8; size];
    let start = size - 64 * 1024;
    flash[start..start + header.len()].copy_from_slice(header);
    flash
}
