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

//! FPGA image headers and payload reordering.
//!
//! An image starts with a fixed little-endian generic header, followed by a board-specific
//! section of `spec_size` bytes, followed by the configuration payload:
//!
//! ```text
//! +----------------+---------------------------+-----------------------+
//! | GenericHeader  | board section (spec_size) | payload ...           |
//! | 92 bytes       | <= 1024 bytes             |                       |
//! +----------------+---------------------------+-----------------------+
//! ```
//!
//! The board section, when present, begins with a [`BoardHeader`] and is followed by
//! `no_of_buffers` [`SdramBuffer`] descriptors.
//!
//! All bounds are checked against the buffer before anything is copied, so a truncated or
//! corrupt image is rejected with [`FvdError::MalformedImage`] before any hardware line is
//! touched.

use crate::error::FvdError;
use log::{debug, trace};

/// Highest generic header revision this implementation understands.
pub const SUPPORTED_HEADER_REVISION: u32 = 3;

/// Upper bound on the board-specific section.
pub const MAX_BOARD_SECTION: usize = 1024;

pub const GENERIC_HEADER_SIZE: usize = 92;
pub const BOARD_HEADER_SIZE: usize = 96;
pub const SDRAM_BUFFER_SIZE: usize = 8;

/// Little-endian cursor over a header slice whose length was checked by the caller.
struct Fields<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Fields { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take::<4>())
    }

    fn text(&mut self) -> String {
        let raw = self.take::<16>();
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericHeader {
    pub identity: String,
    pub header_revision: u32,
    /// Payload is shifted least-significant bit first (Altera) rather than MSB first (Xilinx).
    pub lsb_first: bool,
    pub name: String,
    pub date: String,
    pub major: u32,
    pub minor: u32,
    pub edit: u32,
    pub reserved: [u32; 4],
    pub offset: u32,
    pub spec_size: u32,
}

impl GenericHeader {
    fn read(bytes: &[u8]) -> Self {
        let mut f = Fields::new(bytes);
        GenericHeader {
            identity: f.text(),
            header_revision: f.u32(),
            lsb_first: f.u32() != 0,
            name: f.text(),
            date: f.text(),
            major: f.u32(),
            minor: f.u32(),
            edit: f.u32(),
            reserved: [f.u32(), f.u32(), f.u32(), f.u32()],
            offset: f.u32(),
            spec_size: f.u32(),
        }
    }
}

/// Frame buffer geometry and table sizes the FPGA build was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardHeader {
    pub identity: String,
    pub header_revision: u32,
    pub fpga_type: u32,
    pub hw_type: u32,
    pub hw_major: u32,
    pub frb_width: u32,
    pub frb_height: u32,
    pub frb_pixel_size: u32,
    pub spare: u32,
    pub cft_version: u32,
    pub cft_size: u32,
    pub pal_version: u32,
    pub pal_size: u32,
    pub exp_version: u32,
    pub exp_size: u32,
    pub hst_size: u32,
    pub no_of_buffers: u32,
    pub reserved: [u32; 4],
}

impl BoardHeader {
    fn read(bytes: &[u8]) -> Self {
        let mut f = Fields::new(bytes);
        BoardHeader {
            identity: f.text(),
            header_revision: f.u32(),
            fpga_type: f.u32(),
            hw_type: f.u32(),
            hw_major: f.u32(),
            frb_width: f.u32(),
            frb_height: f.u32(),
            frb_pixel_size: f.u32(),
            spare: f.u32(),
            cft_version: f.u32(),
            cft_size: f.u32(),
            pal_version: f.u32(),
            pal_size: f.u32(),
            exp_version: f.u32(),
            exp_size: f.u32(),
            hst_size: f.u32(),
            no_of_buffers: f.u32(),
            reserved: [f.u32(), f.u32(), f.u32(), f.u32()],
        }
    }
}

/// One SDRAM region the FPGA build expects the host to reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdramBuffer {
    pub start: u32,
    pub size: u32,
}

/// Everything in front of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeaders {
    pub generic: GenericHeader,
    pub board: Option<BoardHeader>,
    pub buffers: Vec<SdramBuffer>,
}

/// Split an image into its headers and the offset of the first payload byte.
///
/// # Arguments
///
/// * `bytes` - The complete image as fetched from the firmware source or flash
///
/// # Returns: `Result<(GenericHeader, Option<BoardHeader>, usize), FvdError>`
/// * `Ok((generic, board, payload_offset))` - `board` is `None` when `spec_size` is zero or
///   too small to hold a board header
/// * `Err(FvdError::MalformedImage)` - Short buffer, unsupported revision or oversized
///   board section
pub fn parse_header(bytes: &[u8]) -> Result<(GenericHeader, Option<BoardHeader>, usize), FvdError> {
    let headers = parse_headers(bytes)?;
    let offset = GENERIC_HEADER_SIZE + headers.generic.spec_size as usize;
    Ok((headers.generic, headers.board, offset))
}

/// Like [`parse_header`] but also returns the SDRAM buffer descriptors.
pub fn parse_headers(bytes: &[u8]) -> Result<ImageHeaders, FvdError> {
    if bytes.len() < GENERIC_HEADER_SIZE {
        return Err(FvdError::MalformedImage(format!(
            "image is {} bytes, shorter than the {GENERIC_HEADER_SIZE} byte generic header",
            bytes.len()
        )));
    }
    let generic = GenericHeader::read(&bytes[..GENERIC_HEADER_SIZE]);
    trace!("Generic header: {generic:?}");

    if generic.header_revision > SUPPORTED_HEADER_REVISION {
        return Err(FvdError::MalformedImage(format!(
            "header revision {} is newer than supported revision {SUPPORTED_HEADER_REVISION}",
            generic.header_revision
        )));
    }
    let spec_size = generic.spec_size as usize;
    if spec_size > MAX_BOARD_SECTION {
        return Err(FvdError::MalformedImage(format!(
            "board section of {spec_size} bytes exceeds {MAX_BOARD_SECTION} bytes"
        )));
    }
    if bytes.len() < GENERIC_HEADER_SIZE + spec_size {
        return Err(FvdError::MalformedImage(format!(
            "image is {} bytes, shorter than its {} byte header",
            bytes.len(),
            GENERIC_HEADER_SIZE + spec_size
        )));
    }

    let section = &bytes[GENERIC_HEADER_SIZE..GENERIC_HEADER_SIZE + spec_size];
    if section.len() < BOARD_HEADER_SIZE {
        if !section.is_empty() {
            debug!("Board section of {} bytes holds no board header", section.len());
        }
        return Ok(ImageHeaders {
            generic,
            board: None,
            buffers: Vec::new(),
        });
    }
    let board = BoardHeader::read(&section[..BOARD_HEADER_SIZE]);
    let room = (section.len() - BOARD_HEADER_SIZE) / SDRAM_BUFFER_SIZE;
    let buffers = section[BOARD_HEADER_SIZE..]
        .chunks_exact(SDRAM_BUFFER_SIZE)
        .take(room.min(board.no_of_buffers as usize))
        .map(|chunk| {
            let mut f = Fields::new(chunk);
            SdramBuffer {
                start: f.u32(),
                size: f.u32(),
            }
        })
        .collect();

    Ok(ImageHeaders {
        generic,
        board: Some(board),
        buffers,
    })
}

/// Reorder a payload in place, one 32-bit little-endian word at a time.
///
/// With `lsb_first` every word is bit-reversed, otherwise its bytes are swapped. Both are
/// involutions: applying `reorder` twice with the same flag restores the input. Trailing
/// bytes that do not fill a word are left untouched.
pub fn reorder(payload: &mut [u8], lsb_first: bool) {
    for word in payload.chunks_exact_mut(4) {
        let value = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        let value = match lsb_first {
            true => value.reverse_bits(),
            false => value.swap_bytes(),
        };
        word.copy_from_slice(&value.to_le_bytes());
    }
}

/// A parsed image whose payload has been padded to whole words and reordered for the wire.
#[derive(Debug)]
pub struct BitstreamImage {
    pub headers: ImageHeaders,
    /// Length of the payload before padding.
    pub payload_len: usize,
    payload: Vec<u8>,
}

impl BitstreamImage {
    /// Parse `bytes`, copy the payload out, pad it to a multiple of four bytes and reorder it
    /// according to the generic header.
    pub fn prepare(bytes: &[u8]) -> Result<Self, FvdError> {
        let headers = parse_headers(bytes)?;
        let offset = GENERIC_HEADER_SIZE + headers.generic.spec_size as usize;
        let payload_len = bytes.len() - offset;
        let mut payload = Vec::with_capacity(payload_len.next_multiple_of(4));
        payload.extend_from_slice(&bytes[offset..]);
        payload.resize(payload_len.next_multiple_of(4), 0);
        reorder(&mut payload, headers.generic.lsb_first);
        Ok(BitstreamImage {
            headers,
            payload_len,
            payload,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
