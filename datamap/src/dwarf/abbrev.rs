//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// .debug_abbrev table parsing
//

use std::collections::HashMap;

use super::constants::*;
use super::reader::{Endian, Reader};
use super::DwarfError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: u64,
    pub form: u64,
    /// Value carried in the abbreviation for DW_FORM_implicit_const.
    pub implicit_const: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    pub code: u64,
    pub tag: u64,
    pub has_children: bool,
    pub attrs: Vec<AttrSpec>,
}

/// One abbreviation table.  Codes are usually dense and start at 1, so
/// those live in a vector and the rest fall back to a map.
#[derive(Debug, Default, Clone)]
pub struct Abbreviations {
    vec: Vec<Abbreviation>,
    map: HashMap<u64, Abbreviation>,
}

impl Abbreviations {
    pub fn parse(section: &[u8], offset: u64, endian: Endian) -> Result<Abbreviations, DwarfError> {
        let mut r = Reader::at(section, offset, endian)?;
        let mut abbrevs = Abbreviations::default();

        loop {
            if r.is_empty() {
                break;
            }
            let code = r.uleb128()?;
            if code == 0 {
                break;
            }
            let tag = r.uleb128()?;
            let has_children = r.u8()? == DW_CHILDREN_YES;

            let mut attrs = Vec::new();
            loop {
                let name = r.uleb128()?;
                let form = r.uleb128()?;
                if name == 0 && form == 0 {
                    break;
                }
                let implicit_const = if form == DW_FORM_IMPLICIT_CONST {
                    Some(r.sleb128()?)
                } else {
                    None
                };
                attrs.push(AttrSpec {
                    name,
                    form,
                    implicit_const,
                });
            }

            abbrevs.insert(Abbreviation {
                code,
                tag,
                has_children,
                attrs,
            })?;
        }

        Ok(abbrevs)
    }

    fn insert(&mut self, abbrev: Abbreviation) -> Result<(), DwarfError> {
        let code = abbrev.code;
        if code == self.vec.len() as u64 + 1 && !self.map.contains_key(&code) {
            self.vec.push(abbrev);
            return Ok(());
        }
        if self.get(code).is_some() {
            return Err(DwarfError::DuplicateAbbreviation(code));
        }
        self.map.insert(code, abbrev);
        Ok(())
    }

    pub fn get(&self, code: u64) -> Option<&Abbreviation> {
        if code >= 1 && code <= self.vec.len() as u64 {
            return self.vec.get((code - 1) as usize);
        }
        self.map.get(&code)
    }

    pub fn len(&self) -> usize {
        self.vec.len() + self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
