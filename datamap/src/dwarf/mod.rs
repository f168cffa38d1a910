//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// DWARF .debug_info reader
//
// Parses every unit of .debug_info into an owned entry tree.  Only the
// type information matters here, so line programs, location lists and
// range lists are never decoded; attributes pointing at them are kept as
// raw offsets or indexes.
//

pub mod abbrev;
pub mod constants;
pub mod reader;

#[cfg(test)]
pub(crate) mod builder;

use std::collections::HashMap;

use abbrev::{Abbreviations, AttrSpec};
use constants::*;
use reader::{string_at, Format, Reader};

pub use reader::Endian;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DwarfError {
    #[error("unexpected end of data at offset {0:#x}")]
    UnexpectedEof(usize),
    #[error("LEB128 value at offset {0:#x} overflows 64 bits")]
    LebOverflow(usize),
    #[error("offset {0:#x} is out of bounds")]
    OutOfBounds(u64),
    #[error("reserved unit length {0:#x}")]
    ReservedLength(u32),
    #[error("unsupported DWARF version {0}")]
    UnsupportedVersion(u16),
    #[error("unsupported unit type {0:#x}")]
    UnsupportedUnitType(u8),
    #[error("invalid address size {0}")]
    InvalidAddressSize(u8),
    #[error("unknown abbreviation code {code} at offset {offset:#x}")]
    UnknownAbbreviation { code: u64, offset: u64 },
    #[error("duplicate abbreviation code {0}")]
    DuplicateAbbreviation(u64),
    #[error("unknown attribute form {0:#x}")]
    UnknownForm(u64),
}

/// Raw contents of the DWARF sections the reader needs.  Missing
/// sections are empty slices.
#[derive(Debug, Default, Clone, Copy)]
pub struct DwarfSections<'a> {
    pub debug_info: &'a [u8],
    pub debug_types: &'a [u8],
    pub debug_abbrev: &'a [u8],
    pub debug_str: &'a [u8],
    pub debug_line_str: &'a [u8],
    pub debug_str_offsets: &'a [u8],
    pub endian: Endian,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Address(u64),
    Udata(u64),
    Sdata(i64),
    Block(Vec<u8>),
    Flag(bool),
    String(String),
    /// Absolute .debug_info offset of the referenced entry.
    Ref(u64),
    SecOffset(u64),
    /// Unresolved DW_FORM_strx index.
    StrIndex(u64),
    AddrIndex(u64),
    ListIndex(u64),
    TypeSignature(u64),
    /// Reference into a supplementary (dwz) file.
    AltRef(u64),
}

impl AttrValue {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            AttrValue::Udata(v) | AttrValue::SecOffset(v) => Some(v),
            AttrValue::Sdata(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub offset: u64,
    pub tag: u64,
    pub has_children: bool,
    pub attrs: Vec<(u64, AttrValue)>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Entry {
    pub fn attr(&self, name: u64) -> Option<&AttrValue> {
        self.attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Section a unit was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    DebugInfo,
    DebugTypes,
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub offset: u64,
    pub section: Section,
    pub version: u16,
    pub unit_type: u8,
    pub address_size: u8,
    pub format: Format,
    /// Signature and absolute entry offset of the type a type unit
    /// describes.
    pub type_signature: Option<u64>,
    pub type_offset: Option<u64>,
    pub entries: Vec<Entry>,
}

/// Every unit of a .debug_info section.
#[derive(Debug, Default)]
pub struct DebugInfo {
    units: Vec<Unit>,
    index: HashMap<u64, (usize, usize)>,
    signatures: HashMap<u64, (usize, usize)>,
    endian: Endian,
}

/// Header fields every attribute decoder needs.
#[derive(Clone, Copy)]
struct UnitContext {
    offset: u64,
    version: u16,
    address_size: u8,
    format: Format,
}

impl DebugInfo {
    pub fn parse(sections: &DwarfSections<'_>) -> Result<DebugInfo, DwarfError> {
        let mut info = DebugInfo {
            endian: sections.endian,
            ..DebugInfo::default()
        };
        let mut abbrev_cache: HashMap<u64, Abbreviations> = HashMap::new();
        let mut r = Reader::new(sections.debug_info, sections.endian);
        while !r.is_empty() {
            let unit = parse_unit(&mut r, Section::DebugInfo, 0, sections, &mut abbrev_cache)?;
            info.units.push(unit);
        }

        // .debug_types entries are numbered after the last .debug_info byte
        let types_base = sections.debug_info.len() as u64;
        let mut r = Reader::new(sections.debug_types, sections.endian);
        while !r.is_empty() {
            let unit = parse_unit(
                &mut r,
                Section::DebugTypes,
                types_base,
                sections,
                &mut abbrev_cache,
            )?;
            info.units.push(unit);
        }

        for (u, unit) in info.units.iter().enumerate() {
            for (e, entry) in unit.entries.iter().enumerate() {
                info.index.insert(entry.offset, (u, e));
            }
        }

        for unit in &info.units {
            let (Some(signature), Some(offset)) = (unit.type_signature, unit.type_offset) else {
                continue;
            };
            match info.index.get(&offset) {
                Some(&location) => {
                    info.signatures.entry(signature).or_insert(location);
                }
                None => log::debug!(
                    "type unit at {:#x} has no entry at {:#x}",
                    unit.offset,
                    offset
                ),
            }
        }

        log::debug!(
            "parsed {} DWARF units, {} entries",
            info.units.len(),
            info.index.len()
        );
        Ok(info)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Entry at an absolute .debug_info offset.  Entries of .debug_types
    /// units follow on from the end of .debug_info.
    pub fn entry_at(&self, offset: u64) -> Option<EntryRef<'_>> {
        self.index.get(&offset).map(|&(unit, index)| EntryRef {
            info: self,
            unit,
            index,
        })
    }

    /// Type entry of the type unit with the given signature.
    pub fn type_unit_entry(&self, signature: u64) -> Option<EntryRef<'_>> {
        self.signatures.get(&signature).map(|&(unit, index)| EntryRef {
            info: self,
            unit,
            index,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = EntryRef<'_>> + '_ {
        self.units.iter().enumerate().flat_map(move |(unit, u)| {
            (0..u.entries.len()).map(move |index| EntryRef {
                info: self,
                unit,
                index,
            })
        })
    }

    /// Entries with one of `tags` whose DW_AT_name equals `name`, in
    /// section order.
    pub fn find_named<'d, 'a>(
        &'d self,
        name: &'a str,
        tags: &'a [u64],
    ) -> impl Iterator<Item = EntryRef<'d>> + 'a
    where
        'd: 'a,
    {
        self.entries()
            .filter(move |e| tags.contains(&e.tag()) && e.name() == Some(name))
    }
}

/// Borrowed handle to one entry of a [`DebugInfo`].
#[derive(Clone, Copy)]
pub struct EntryRef<'d> {
    info: &'d DebugInfo,
    unit: usize,
    index: usize,
}

impl<'d> EntryRef<'d> {
    pub fn entry(&self) -> &'d Entry {
        &self.info.units[self.unit].entries[self.index]
    }

    pub fn unit(&self) -> &'d Unit {
        &self.info.units[self.unit]
    }

    pub fn offset(&self) -> u64 {
        self.entry().offset
    }

    pub fn tag(&self) -> u64 {
        self.entry().tag
    }

    pub fn has_children(&self) -> bool {
        self.entry().has_children
    }

    pub fn attr(&self, name: u64) -> Option<&'d AttrValue> {
        self.entry().attr(name)
    }

    pub fn name(&self) -> Option<&'d str> {
        match self.attr(DW_AT_NAME) {
            Some(AttrValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn udata(&self, name: u64) -> Option<u64> {
        self.attr(name).and_then(AttrValue::as_u64)
    }

    pub fn flag(&self, name: u64) -> bool {
        match self.attr(name) {
            Some(AttrValue::Flag(f)) => *f,
            Some(_) => true,
            None => false,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.flag(DW_AT_DECLARATION)
    }

    pub fn byte_size(&self) -> Option<u64> {
        self.udata(DW_AT_BYTE_SIZE)
    }

    /// Entry named by an attribute holding a reference, e.g. DW_AT_type,
    /// or a type signature.
    pub fn follow(&self, name: u64) -> Option<EntryRef<'d>> {
        match self.attr(name) {
            Some(AttrValue::Ref(offset)) => self.info.entry_at(*offset),
            Some(AttrValue::TypeSignature(signature)) => self.info.type_unit_entry(*signature),
            _ => None,
        }
    }

    pub fn type_entry(&self) -> Option<EntryRef<'d>> {
        self.follow(DW_AT_TYPE)
    }

    pub fn parent(&self) -> Option<EntryRef<'d>> {
        self.entry().parent.map(|index| EntryRef {
            info: self.info,
            unit: self.unit,
            index,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = EntryRef<'d>> + 'd {
        let info = self.info;
        let unit = self.unit;
        self.entry().children.iter().map(move |&index| EntryRef {
            info,
            unit,
            index,
        })
    }

    pub fn linkage_name(&self) -> Option<&'d str> {
        [DW_AT_LINKAGE_NAME, DW_AT_MIPS_LINKAGE_NAME]
            .iter()
            .find_map(|at| match self.attr(*at) {
                Some(AttrValue::String(s)) => Some(s.as_str()),
                _ => None,
            })
    }

    /// Byte offset of a member within its parent, from either a constant
    /// DW_AT_data_member_location, a simple location expression, or
    /// DW_AT_data_bit_offset for bit fields.
    pub fn member_location(&self) -> Option<u64> {
        match self.attr(DW_AT_DATA_MEMBER_LOCATION) {
            Some(AttrValue::Block(expr)) => evaluate_member_location(expr, self.info.endian),
            Some(value) => value.as_u64(),
            None => self.udata(DW_AT_DATA_BIT_OFFSET).map(|bits| bits / 8),
        }
    }
}

impl std::fmt::Debug for EntryRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryRef")
            .field("offset", &self.offset())
            .field("tag", &self.tag())
            .field("name", &self.name())
            .finish()
    }
}

/// Evaluates the location expressions compilers emit for member offsets:
/// a lone DW_OP_plus_uconst, or a constant push.
fn evaluate_member_location(expr: &[u8], endian: Endian) -> Option<u64> {
    let mut r = Reader::new(expr, endian);
    let op = r.u8().ok()?;
    let value = match op {
        DW_OP_PLUS_UCONST | DW_OP_CONSTU => r.uleb128().ok()?,
        DW_OP_CONST1U => r.uint(1).ok()?,
        DW_OP_CONST2U => r.uint(2).ok()?,
        DW_OP_CONST4U => r.uint(4).ok()?,
        DW_OP_CONST8U => r.uint(8).ok()?,
        _ => return None,
    };
    if !r.is_empty() {
        return None;
    }
    Some(value)
}

fn parse_unit<'a>(
    r: &mut Reader<'a>,
    section: Section,
    base: u64,
    sections: &DwarfSections<'a>,
    abbrev_cache: &mut HashMap<u64, Abbreviations>,
) -> Result<Unit, DwarfError> {
    let unit_offset = base + r.position() as u64;

    let (length, format) = match r.u32()? {
        0xffff_ffff => (r.u64()?, Format::Dwarf64),
        len if len >= 0xffff_fff0 => return Err(DwarfError::ReservedLength(len)),
        len => (u64::from(len), Format::Dwarf32),
    };
    let end = usize::try_from(length)
        .ok()
        .and_then(|len| r.position().checked_add(len))
        .ok_or(DwarfError::OutOfBounds(length))?;
    let mut body = r.limit(end)?;

    let version = body.u16()?;
    let mut type_signature = None;
    let mut type_offset = None;
    let (unit_type, address_size, abbrev_offset) = match version {
        2..=4 => {
            let abbrev_offset = body.offset(format)?;
            let address_size = body.u8()?;
            let unit_type = match section {
                Section::DebugInfo => DW_UT_COMPILE,
                Section::DebugTypes => {
                    type_signature = Some(body.u64()?);
                    type_offset = Some(body.offset(format)?);
                    DW_UT_TYPE
                }
            };
            (unit_type, address_size, abbrev_offset)
        }
        5 => {
            let unit_type = body.u8()?;
            let address_size = body.u8()?;
            let abbrev_offset = body.offset(format)?;
            match unit_type {
                DW_UT_COMPILE | DW_UT_PARTIAL => {}
                DW_UT_SKELETON | DW_UT_SPLIT_COMPILE => body.skip(8)?,
                DW_UT_TYPE | DW_UT_SPLIT_TYPE => {
                    type_signature = Some(body.u64()?);
                    type_offset = Some(body.offset(format)?);
                }
                other => return Err(DwarfError::UnsupportedUnitType(other)),
            }
            (unit_type, address_size, abbrev_offset)
        }
        other => return Err(DwarfError::UnsupportedVersion(other)),
    };
    if !matches!(address_size, 1 | 2 | 4 | 8) {
        return Err(DwarfError::InvalidAddressSize(address_size));
    }
    let type_offset = type_offset
        .map(|offset| {
            unit_offset
                .checked_add(offset)
                .ok_or(DwarfError::OutOfBounds(offset))
        })
        .transpose()?;

    if !abbrev_cache.contains_key(&abbrev_offset) {
        let abbrevs = Abbreviations::parse(sections.debug_abbrev, abbrev_offset, sections.endian)?;
        abbrev_cache.insert(abbrev_offset, abbrevs);
    }
    let abbrevs = &abbrev_cache[&abbrev_offset];

    let ctx = UnitContext {
        offset: unit_offset,
        version,
        address_size,
        format,
    };

    let mut entries: Vec<Entry> = Vec::new();
    let mut parents: Vec<usize> = Vec::new();
    while !body.is_empty() {
        let offset = base + body.position() as u64;
        let code = body.uleb128()?;
        if code == 0 {
            parents.pop();
            continue;
        }
        let abbrev = abbrevs
            .get(code)
            .ok_or(DwarfError::UnknownAbbreviation { code, offset })?;

        let mut attrs = Vec::with_capacity(abbrev.attrs.len());
        for spec in &abbrev.attrs {
            let value = read_attr(&mut body, spec, spec.form, &ctx, sections)?;
            attrs.push((spec.name, value));
        }

        let index = entries.len();
        let parent = parents.last().copied();
        entries.push(Entry {
            offset,
            tag: abbrev.tag,
            has_children: abbrev.has_children,
            attrs,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            entries[parent].children.push(index);
        }
        if abbrev.has_children {
            parents.push(index);
        }
    }
    r.skip(end - r.position())?;

    resolve_str_indexes(&mut entries, sections, format);

    Ok(Unit {
        offset: unit_offset,
        section,
        version,
        unit_type,
        address_size,
        format,
        type_signature,
        type_offset,
        entries,
    })
}

fn read_attr(
    r: &mut Reader<'_>,
    spec: &AttrSpec,
    form: u64,
    ctx: &UnitContext,
    sections: &DwarfSections<'_>,
) -> Result<AttrValue, DwarfError> {
    let value = match form {
        DW_FORM_ADDR => AttrValue::Address(r.uint(usize::from(ctx.address_size))?),
        DW_FORM_BLOCK1 => {
            let len = r.u8()?;
            AttrValue::Block(r.bytes(usize::from(len))?.to_vec())
        }
        DW_FORM_BLOCK2 => {
            let len = r.u16()?;
            AttrValue::Block(r.bytes(usize::from(len))?.to_vec())
        }
        DW_FORM_BLOCK4 => {
            let len = r.u32()?;
            AttrValue::Block(r.bytes(len as usize)?.to_vec())
        }
        DW_FORM_BLOCK | DW_FORM_EXPRLOC => {
            let len = r.uleb128()?;
            let len = usize::try_from(len).map_err(|_| DwarfError::OutOfBounds(len))?;
            AttrValue::Block(r.bytes(len)?.to_vec())
        }
        DW_FORM_DATA1 => AttrValue::Udata(r.uint(1)?),
        DW_FORM_DATA2 => AttrValue::Udata(r.uint(2)?),
        DW_FORM_DATA4 => AttrValue::Udata(r.uint(4)?),
        DW_FORM_DATA8 => AttrValue::Udata(r.uint(8)?),
        DW_FORM_DATA16 => AttrValue::Block(r.bytes(16)?.to_vec()),
        DW_FORM_SDATA => AttrValue::Sdata(r.sleb128()?),
        DW_FORM_UDATA => AttrValue::Udata(r.uleb128()?),
        DW_FORM_IMPLICIT_CONST => AttrValue::Sdata(spec.implicit_const.unwrap_or(0)),
        DW_FORM_STRING => AttrValue::String(String::from_utf8_lossy(r.cstr()?).into_owned()),
        DW_FORM_STRP => AttrValue::String(string_at(sections.debug_str, r.offset(ctx.format)?)?),
        DW_FORM_LINE_STRP => {
            AttrValue::String(string_at(sections.debug_line_str, r.offset(ctx.format)?)?)
        }
        DW_FORM_STRP_SUP | DW_FORM_GNU_STRP_ALT | DW_FORM_SEC_OFFSET => {
            AttrValue::SecOffset(r.offset(ctx.format)?)
        }
        DW_FORM_FLAG => AttrValue::Flag(r.u8()? != 0),
        DW_FORM_FLAG_PRESENT => AttrValue::Flag(true),
        DW_FORM_REF1 => unit_ref(ctx, r.uint(1)?)?,
        DW_FORM_REF2 => unit_ref(ctx, r.uint(2)?)?,
        DW_FORM_REF4 => unit_ref(ctx, r.uint(4)?)?,
        DW_FORM_REF8 => unit_ref(ctx, r.uint(8)?)?,
        DW_FORM_REF_UDATA => unit_ref(ctx, r.uleb128()?)?,
        DW_FORM_REF_ADDR => {
            // DWARF 2 sized these like addresses
            if ctx.version <= 2 {
                AttrValue::Ref(r.uint(usize::from(ctx.address_size))?)
            } else {
                AttrValue::Ref(r.offset(ctx.format)?)
            }
        }
        DW_FORM_REF_SIG8 => AttrValue::TypeSignature(r.u64()?),
        DW_FORM_REF_SUP4 => AttrValue::AltRef(r.uint(4)?),
        DW_FORM_REF_SUP8 => AttrValue::AltRef(r.uint(8)?),
        DW_FORM_GNU_REF_ALT => AttrValue::AltRef(r.offset(ctx.format)?),
        DW_FORM_STRX | DW_FORM_GNU_STR_INDEX => AttrValue::StrIndex(r.uleb128()?),
        DW_FORM_STRX1 => AttrValue::StrIndex(r.uint(1)?),
        DW_FORM_STRX2 => AttrValue::StrIndex(r.uint(2)?),
        DW_FORM_STRX3 => AttrValue::StrIndex(r.uint(3)?),
        DW_FORM_STRX4 => AttrValue::StrIndex(r.uint(4)?),
        DW_FORM_ADDRX | DW_FORM_GNU_ADDR_INDEX => AttrValue::AddrIndex(r.uleb128()?),
        DW_FORM_ADDRX1 => AttrValue::AddrIndex(r.uint(1)?),
        DW_FORM_ADDRX2 => AttrValue::AddrIndex(r.uint(2)?),
        DW_FORM_ADDRX3 => AttrValue::AddrIndex(r.uint(3)?),
        DW_FORM_ADDRX4 => AttrValue::AddrIndex(r.uint(4)?),
        DW_FORM_LOCLISTX | DW_FORM_RNGLISTX => AttrValue::ListIndex(r.uleb128()?),
        DW_FORM_INDIRECT => {
            let actual = r.uleb128()?;
            // one level only
            if actual == DW_FORM_INDIRECT {
                return Err(DwarfError::UnknownForm(actual));
            }
            return read_attr(r, spec, actual, ctx, sections);
        }
        other => return Err(DwarfError::UnknownForm(other)),
    };
    Ok(value)
}

/// Absolute offset of a unit-relative reference.
fn unit_ref(ctx: &UnitContext, offset: u64) -> Result<AttrValue, DwarfError> {
    ctx.offset
        .checked_add(offset)
        .map(AttrValue::Ref)
        .ok_or(DwarfError::OutOfBounds(offset))
}

/// Replaces DW_FORM_strx indexes with their strings once the unit's
/// DW_AT_str_offsets_base is known.  Indexes that cannot be resolved
/// (split DWARF skeletons, missing sections) are left as they are.
fn resolve_str_indexes(entries: &mut [Entry], sections: &DwarfSections<'_>, format: Format) {
    if sections.debug_str_offsets.is_empty() {
        return;
    }
    let header_size = match format {
        Format::Dwarf32 => 8,
        Format::Dwarf64 => 16,
    };
    let base = entries
        .first()
        .and_then(|cu| cu.attr(DW_AT_STR_OFFSETS_BASE))
        .and_then(AttrValue::as_u64)
        .unwrap_or(header_size);
    let entry_size = format.offset_size() as u64;

    let lookup = |index: u64| -> Option<String> {
        let at = base.checked_add(index.checked_mul(entry_size)?)?;
        let mut r = Reader::at(sections.debug_str_offsets, at, sections.endian).ok()?;
        let offset = r.offset(format).ok()?;
        string_at(sections.debug_str, offset).ok()
    };

    for entry in entries.iter_mut() {
        for (_, value) in entry.attrs.iter_mut() {
            if let AttrValue::StrIndex(index) = *value {
                match lookup(index) {
                    Some(s) => *value = AttrValue::String(s),
                    None => log::debug!("unresolved string index {index} at {:#x}", entry.offset),
                }
            }
        }
    }
}
