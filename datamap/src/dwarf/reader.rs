//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use super::DwarfError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// 32-bit or 64-bit DWARF, as announced by the unit length field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Dwarf32,
    Dwarf64,
}

impl Format {
    pub fn offset_size(self) -> usize {
        match self {
            Format::Dwarf32 => 4,
            Format::Dwarf64 => 8,
        }
    }
}

/// Cursor over a DWARF section.  Positions are absolute offsets into the
/// section the reader was created from.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Reader<'a> {
        Reader {
            data,
            pos: 0,
            endian,
        }
    }

    pub fn at(data: &'a [u8], offset: u64, endian: Endian) -> Result<Reader<'a>, DwarfError> {
        let pos = usize::try_from(offset).map_err(|_| DwarfError::OutOfBounds(offset))?;
        if pos > data.len() {
            return Err(DwarfError::OutOfBounds(offset));
        }
        Ok(Reader { data, pos, endian })
    }

    /// A reader over the same section that stops at `end`.
    pub fn limit(&self, end: usize) -> Result<Reader<'a>, DwarfError> {
        if end > self.data.len() || end < self.pos {
            return Err(DwarfError::OutOfBounds(end as u64));
        }
        Ok(Reader {
            data: &self.data[..end],
            pos: self.pos,
            endian: self.endian,
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], DwarfError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(DwarfError::UnexpectedEof(self.pos))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DwarfError> {
        self.bytes(len).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, DwarfError> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, DwarfError> {
        Ok(self.uint(2)? as u16)
    }

    pub fn u32(&mut self) -> Result<u32, DwarfError> {
        Ok(self.uint(4)? as u32)
    }

    pub fn u64(&mut self) -> Result<u64, DwarfError> {
        self.uint(8)
    }

    /// Fixed size unsigned integer of 1 to 8 bytes in section byte order.
    pub fn uint(&mut self, size: usize) -> Result<u64, DwarfError> {
        let bytes = self.bytes(size)?;
        let value = match self.endian {
            Endian::Little => bytes
                .iter()
                .rev()
                .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
            Endian::Big => bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
        };
        Ok(value)
    }

    /// Section offset sized by the unit format.
    pub fn offset(&mut self, format: Format) -> Result<u64, DwarfError> {
        self.uint(format.offset_size())
    }

    pub fn uleb128(&mut self) -> Result<u64, DwarfError> {
        let start = self.pos;
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8()?;
            let low = u64::from(byte & 0x7f);
            if shift < 64 {
                if shift > 57 && (low >> (64 - shift)) != 0 {
                    return Err(DwarfError::LebOverflow(start));
                }
                result |= low << shift;
            } else if low != 0 {
                return Err(DwarfError::LebOverflow(start));
            }
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    pub fn sleb128(&mut self) -> Result<i64, DwarfError> {
        let mut result = 0i64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8()?;
            if shift < 64 {
                result |= i64::from(byte & 0x7f) << shift;
            }
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 64 && (byte & 0x40) != 0 {
                    result |= -1i64 << shift;
                }
                return Ok(result);
            }
        }
    }

    /// NUL terminated string, without the terminator.
    pub fn cstr(&mut self) -> Result<&'a [u8], DwarfError> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(DwarfError::UnexpectedEof(self.pos))?;
        let s = &rest[..len];
        self.pos += len + 1;
        Ok(s)
    }
}

/// String stored at `offset` in a string section.
pub fn string_at(section: &[u8], offset: u64) -> Result<String, DwarfError> {
    let mut r = Reader::at(section, offset, Endian::Little)?;
    let s = r.cstr()?;
    Ok(String::from_utf8_lossy(s).into_owned())
}
