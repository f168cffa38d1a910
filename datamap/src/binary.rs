//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Object file loading: DWARF sections and the symbol table
//

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};

use crate::dwarf::reader::Endian;
use crate::dwarf::{DebugInfo, DwarfSections};
use crate::error::{Error, Result};

/// Symbol addresses by name, from both the static and dynamic symbol
/// tables.  The static table wins when a name appears in both.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    by_name: HashMap<String, u64>,
}

impl SymbolTable {
    pub fn from_object(file: &object::File<'_>) -> SymbolTable {
        let mut table = SymbolTable::default();
        for symbol in file.symbols().chain(file.dynamic_symbols()) {
            if symbol.is_undefined() {
                continue;
            }
            if let SymbolKind::Section | SymbolKind::File = symbol.kind() {
                continue;
            }
            match symbol.name() {
                Ok(name) if !name.is_empty() => {
                    table
                        .by_name
                        .entry(name.to_string())
                        .or_insert(symbol.address());
                }
                _ => {}
            }
        }
        table
    }

    pub fn insert(&mut self, name: &str, address: u64) {
        self.by_name.insert(name.to_string(), address);
    }

    pub fn address(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Parsed debug information and symbols of one object file.
#[derive(Debug)]
pub struct Binary {
    debug_info: DebugInfo,
    symbols: SymbolTable,
}

fn section_data<'data>(file: &object::File<'data>, name: &str) -> Result<Option<Cow<'data, [u8]>>> {
    match file.section_by_name(name) {
        Some(section) => Ok(Some(section.uncompressed_data()?)),
        None => Ok(None),
    }
}

impl Binary {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Binary> {
        let data = fs::read(path.as_ref())?;
        log::debug!("loaded {} ({} bytes)", path.as_ref().display(), data.len());
        Binary::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Binary> {
        let file = object::File::parse(data)?;
        let endian = if file.is_little_endian() {
            Endian::Little
        } else {
            Endian::Big
        };

        let info = section_data(&file, ".debug_info")?.ok_or(Error::MissingDebugInfo)?;
        let types = section_data(&file, ".debug_types")?.unwrap_or_default();
        let abbrev = section_data(&file, ".debug_abbrev")?.unwrap_or_default();
        let strings = section_data(&file, ".debug_str")?.unwrap_or_default();
        let line_strings = section_data(&file, ".debug_line_str")?.unwrap_or_default();
        let str_offsets = section_data(&file, ".debug_str_offsets")?.unwrap_or_default();

        let sections = DwarfSections {
            debug_info: &info,
            debug_types: &types,
            debug_abbrev: &abbrev,
            debug_str: &strings,
            debug_line_str: &line_strings,
            debug_str_offsets: &str_offsets,
            endian,
        };
        let debug_info = DebugInfo::parse(&sections)?;
        let symbols = SymbolTable::from_object(&file);
        log::debug!("{} symbols", symbols.len());

        Ok(Binary {
            debug_info,
            symbols,
        })
    }

    pub fn debug_info(&self) -> &DebugInfo {
        &self.debug_info
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}
