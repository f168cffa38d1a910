//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Test support: encodes small DIE trees into DWARF sections
//

use std::collections::HashMap;

use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

use super::constants::*;
use super::reader::{Endian, Format};
use super::DwarfSections;

pub(crate) enum Val {
    Str(&'static str),
    U(u64),
    Ref(&'static str),
    Flag,
    Expr(Vec<u8>),
    Sec(u32),
}

pub(crate) struct Die {
    tag: u64,
    label: Option<&'static str>,
    attrs: Vec<(u64, Val)>,
    children: Vec<Die>,
}

impl Die {
    pub fn new(tag: u64) -> Die {
        Die {
            tag,
            label: None,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn label(mut self, label: &'static str) -> Die {
        self.label = Some(label);
        self
    }

    pub fn attr(mut self, name: u64, value: Val) -> Die {
        self.attrs.push((name, value));
        self
    }

    pub fn name(self, name: &'static str) -> Die {
        self.attr(DW_AT_NAME, Val::Str(name))
    }

    pub fn child(mut self, child: Die) -> Die {
        self.children.push(child);
        self
    }
}

/// A member entry of type `ty` at byte offset `location`.
pub(crate) fn member(name: &'static str, ty: &'static str, location: u64) -> Die {
    Die::new(DW_TAG_MEMBER)
        .name(name)
        .attr(DW_AT_TYPE, Val::Ref(ty))
        .attr(DW_AT_DATA_MEMBER_LOCATION, Val::U(location))
}

pub(crate) fn structure(label: &'static str, size: u64) -> Die {
    Die::new(DW_TAG_STRUCTURE_TYPE)
        .label(label)
        .attr(DW_AT_BYTE_SIZE, Val::U(size))
}

/// Single compile unit; version 5 units name strings through
/// DW_FORM_strx1 and store constants as DW_FORM_implicit_const, older
/// ones use DW_FORM_strp and DW_FORM_data1/udata.
pub(crate) struct DwarfBuilder {
    version: u16,
    debug_info: Vec<u8>,
    debug_abbrev: Vec<u8>,
    debug_str: Vec<u8>,
    debug_str_offsets: Vec<u8>,
    str_offsets: HashMap<&'static str, u32>,
    str_indexes: Vec<u32>,
    labels: HashMap<&'static str, u32>,
    fixups: Vec<(usize, &'static str)>,
    next_code: u64,
}

fn uleb(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn sleb(out: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

impl DwarfBuilder {
    pub fn build(version: u16, root: Die) -> DwarfBuilder {
        let mut b = DwarfBuilder {
            version,
            debug_info: Vec::new(),
            debug_abbrev: Vec::new(),
            debug_str: Vec::new(),
            debug_str_offsets: Vec::new(),
            str_offsets: HashMap::new(),
            str_indexes: Vec::new(),
            labels: HashMap::new(),
            fixups: Vec::new(),
            next_code: 0,
        };

        b.debug_info.extend_from_slice(&[0; 4]);
        b.debug_info.extend_from_slice(&version.to_le_bytes());
        if version >= 5 {
            b.debug_info.push(DW_UT_COMPILE);
            b.debug_info.push(8);
            b.debug_info.extend_from_slice(&0u32.to_le_bytes());
        } else {
            b.debug_info.extend_from_slice(&0u32.to_le_bytes());
            b.debug_info.push(8);
        }

        b.encode(&root);
        b.debug_abbrev.push(0);

        let length = (b.debug_info.len() - 4) as u32;
        b.debug_info[..4].copy_from_slice(&length.to_le_bytes());
        for (pos, label) in std::mem::take(&mut b.fixups) {
            let offset = b.labels[label];
            b.debug_info[pos..pos + 4].copy_from_slice(&offset.to_le_bytes());
        }

        if version >= 5 {
            let length = 4 + 4 * b.str_indexes.len() as u32;
            b.debug_str_offsets.extend_from_slice(&length.to_le_bytes());
            b.debug_str_offsets.extend_from_slice(&5u16.to_le_bytes());
            b.debug_str_offsets.extend_from_slice(&0u16.to_le_bytes());
            for offset in &b.str_indexes {
                b.debug_str_offsets.extend_from_slice(&offset.to_le_bytes());
            }
        }
        b
    }

    fn strp(&mut self, s: &'static str) -> u32 {
        if let Some(offset) = self.str_offsets.get(s) {
            return *offset;
        }
        let offset = self.debug_str.len() as u32;
        self.debug_str.extend_from_slice(s.as_bytes());
        self.debug_str.push(0);
        self.str_offsets.insert(s, offset);
        offset
    }

    fn strx(&mut self, s: &'static str) -> u8 {
        let offset = self.strp(s);
        let index = match self.str_indexes.iter().position(|o| *o == offset) {
            Some(index) => index,
            None => {
                self.str_indexes.push(offset);
                self.str_indexes.len() - 1
            }
        };
        index as u8
    }

    fn encode(&mut self, die: &Die) {
        self.next_code += 1;
        let code = self.next_code;
        if let Some(label) = die.label {
            self.labels.insert(label, self.debug_info.len() as u32);
        }

        uleb(&mut self.debug_info, code);
        uleb(&mut self.debug_abbrev, code);
        uleb(&mut self.debug_abbrev, die.tag);
        self.debug_abbrev.push(if die.children.is_empty() {
            DW_CHILDREN_NO
        } else {
            DW_CHILDREN_YES
        });

        for (name, value) in &die.attrs {
            uleb(&mut self.debug_abbrev, *name);
            match value {
                Val::Str(s) if self.version >= 5 => {
                    uleb(&mut self.debug_abbrev, DW_FORM_STRX1);
                    let index = self.strx(*s);
                    self.debug_info.push(index);
                }
                Val::Str(s) => {
                    uleb(&mut self.debug_abbrev, DW_FORM_STRP);
                    let offset = self.strp(*s);
                    self.debug_info.extend_from_slice(&offset.to_le_bytes());
                }
                Val::U(v) if self.version >= 5 => {
                    uleb(&mut self.debug_abbrev, DW_FORM_IMPLICIT_CONST);
                    sleb(&mut self.debug_abbrev, *v as i64);
                }
                Val::U(v) if *v < 256 => {
                    uleb(&mut self.debug_abbrev, DW_FORM_DATA1);
                    self.debug_info.push(*v as u8);
                }
                Val::U(v) => {
                    uleb(&mut self.debug_abbrev, DW_FORM_UDATA);
                    uleb(&mut self.debug_info, *v);
                }
                Val::Ref(label) => {
                    uleb(&mut self.debug_abbrev, DW_FORM_REF4);
                    self.fixups.push((self.debug_info.len(), *label));
                    self.debug_info.extend_from_slice(&[0; 4]);
                }
                Val::Flag => uleb(&mut self.debug_abbrev, DW_FORM_FLAG_PRESENT),
                Val::Expr(expr) => {
                    uleb(&mut self.debug_abbrev, DW_FORM_EXPRLOC);
                    uleb(&mut self.debug_info, expr.len() as u64);
                    self.debug_info.extend_from_slice(expr);
                }
                Val::Sec(offset) => {
                    uleb(&mut self.debug_abbrev, DW_FORM_SEC_OFFSET);
                    self.debug_info.extend_from_slice(&offset.to_le_bytes());
                }
            }
        }
        self.debug_abbrev.extend_from_slice(&[0, 0]);

        for child in &die.children {
            self.encode(child);
        }
        if !die.children.is_empty() {
            self.debug_info.push(0);
        }
    }

    pub fn sections(&self) -> DwarfSections<'_> {
        DwarfSections {
            debug_info: &self.debug_info,
            debug_types: &[],
            debug_abbrev: &self.debug_abbrev,
            debug_str: &self.debug_str,
            debug_line_str: &[],
            debug_str_offsets: &self.debug_str_offsets,
            endian: Endian::Little,
        }
    }

    /// Overwrites the abbreviation code of the first entry.
    pub fn corrupt_first_code(&mut self, code: u8) {
        let header_size = if self.version >= 5 { 12 } else { 11 };
        self.debug_info[header_size] = code;
    }

    /// Wraps the sections in an x86-64 ELF relocatable object, with data
    /// symbols at the given offsets of .data.
    pub fn to_elf(&self, symbols: &[(&str, u64)]) -> Vec<u8> {
        elf_with_sections(
            &[
                (".debug_info", self.debug_info.as_slice()),
                (".debug_abbrev", self.debug_abbrev.as_slice()),
                (".debug_str", self.debug_str.as_slice()),
                (".debug_str_offsets", self.debug_str_offsets.as_slice()),
            ],
            symbols,
        )
    }
}

pub(crate) fn elf_with_sections(sections: &[(&str, &[u8])], symbols: &[(&str, u64)]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    for (name, data) in sections {
        if data.is_empty() {
            continue;
        }
        let id = obj.add_section(Vec::new(), name.as_bytes().to_vec(), SectionKind::Debug);
        obj.append_section_data(id, data, 1);
    }

    let data_id = obj.section_id(StandardSection::Data);
    obj.append_section_data(data_id, &[0; 256], 8);
    for (name, value) in symbols {
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value: *value,
            size: 8,
            kind: SymbolKind::Data,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(data_id),
            flags: SymbolFlags::None,
        });
    }
    obj.write().unwrap()
}

/// Hand-assembled section bytes, for headers and forms the builder does
/// not emit.
pub(crate) struct Raw {
    endian: Endian,
    pub bytes: Vec<u8>,
}

impl Raw {
    pub fn new(endian: Endian) -> Raw {
        Raw {
            endian,
            bytes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn uint(&mut self, value: u64, size: usize) -> &mut Raw {
        let le = value.to_le_bytes();
        match self.endian {
            Endian::Little => self.bytes.extend_from_slice(&le[..size]),
            Endian::Big => self.bytes.extend(le[..size].iter().rev()),
        }
        self
    }

    pub fn uleb(&mut self, value: u64) -> &mut Raw {
        uleb(&mut self.bytes, value);
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Raw {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn cstr(&mut self, s: &str) -> &mut Raw {
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self
    }
}

/// Prefixes `content`, everything after the unit length, with a 32-bit or
/// 64-bit unit length.
pub(crate) fn unit(endian: Endian, format: Format, content: &[u8]) -> Vec<u8> {
    let mut out = Raw::new(endian);
    match format {
        Format::Dwarf32 => out.uint(content.len() as u64, 4),
        Format::Dwarf64 => out.uint(0xffff_ffff, 4).uint(content.len() as u64, 8),
    };
    out.raw(content);
    out.bytes
}

#[derive(Default)]
pub(crate) struct AbbrevTable(Vec<u8>);

impl AbbrevTable {
    pub fn new() -> AbbrevTable {
        AbbrevTable::default()
    }

    pub fn add(mut self, code: u64, tag: u64, has_children: bool, attrs: &[(u64, u64)]) -> AbbrevTable {
        uleb(&mut self.0, code);
        uleb(&mut self.0, tag);
        self.0.push(if has_children {
            DW_CHILDREN_YES
        } else {
            DW_CHILDREN_NO
        });
        for (name, form) in attrs {
            uleb(&mut self.0, *name);
            uleb(&mut self.0, *form);
        }
        self.0.extend_from_slice(&[0, 0]);
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.0.push(0);
        self.0
    }
}

pub(crate) const POINT_SIGNATURE: u64 = 0x1122_3344_5566_7788;

/// Types moved out of the compile unit, as `-fdebug-types-section`
/// (version 4, .debug_types) or a DWARF 5 type unit does.  `struct point`
/// lives in the type unit; the compile unit holds a declaration stub and
/// typedefs that reach it by signature or through the stub.
pub(crate) struct TypeUnitDwarf {
    debug_info: Vec<u8>,
    debug_types: Vec<u8>,
    debug_abbrev: Vec<u8>,
}

impl TypeUnitDwarf {
    pub fn sections(&self) -> DwarfSections<'_> {
        DwarfSections {
            debug_info: &self.debug_info,
            debug_types: &self.debug_types,
            debug_abbrev: &self.debug_abbrev,
            ..DwarfSections::default()
        }
    }

    pub fn to_elf(&self) -> Vec<u8> {
        elf_with_sections(
            &[
                (".debug_info", self.debug_info.as_slice()),
                (".debug_types", self.debug_types.as_slice()),
                (".debug_abbrev", self.debug_abbrev.as_slice()),
            ],
            &[],
        )
    }
}

fn unit_header(out: &mut Raw, version: u16, unit_type: u8) {
    out.uint(u64::from(version), 2);
    if version >= 5 {
        out.uint(u64::from(unit_type), 1).uint(8, 1).uint(0, 4);
    } else {
        out.uint(0, 4).uint(8, 1);
    }
}

pub(crate) fn type_unit_dwarf(version: u16) -> TypeUnitDwarf {
    let debug_abbrev = AbbrevTable::new()
        .add(1, DW_TAG_TYPE_UNIT, true, &[])
        .add(
            2,
            DW_TAG_STRUCTURE_TYPE,
            true,
            &[(DW_AT_NAME, DW_FORM_STRING), (DW_AT_BYTE_SIZE, DW_FORM_DATA1)],
        )
        .add(
            3,
            DW_TAG_MEMBER,
            false,
            &[
                (DW_AT_NAME, DW_FORM_STRING),
                (DW_AT_DATA_MEMBER_LOCATION, DW_FORM_DATA1),
            ],
        )
        .add(4, DW_TAG_COMPILE_UNIT, true, &[])
        .add(
            5,
            DW_TAG_STRUCTURE_TYPE,
            false,
            &[
                (DW_AT_NAME, DW_FORM_STRING),
                (DW_AT_DECLARATION, DW_FORM_FLAG_PRESENT),
                (DW_AT_SIGNATURE, DW_FORM_REF_SIG8),
            ],
        )
        .add(
            6,
            DW_TAG_TYPEDEF,
            false,
            &[(DW_AT_NAME, DW_FORM_STRING), (DW_AT_TYPE, DW_FORM_REF_SIG8)],
        )
        .add(
            7,
            DW_TAG_TYPEDEF,
            false,
            &[(DW_AT_NAME, DW_FORM_STRING), (DW_AT_TYPE, DW_FORM_REF1)],
        )
        .finish();
    let endian = Endian::Little;

    let mut tu = Raw::new(endian);
    unit_header(&mut tu, version, DW_UT_TYPE);
    tu.uint(POINT_SIGNATURE, 8);
    // unit length, the type offset itself, the type unit entry
    let type_offset = 4 + tu.len() as u64 + 4 + 1;
    tu.uint(type_offset, 4);
    tu.uleb(1)
        .uleb(2)
        .cstr("point")
        .uint(16, 1)
        .uleb(3)
        .cstr("x")
        .uint(0, 1)
        .uleb(3)
        .cstr("y")
        .uint(8, 1)
        .uint(0, 1)
        .uint(0, 1);
    let type_unit = unit(endian, Format::Dwarf32, &tu.bytes);

    let mut cu = Raw::new(endian);
    unit_header(&mut cu, version, DW_UT_COMPILE);
    let stub = 4 + cu.len() as u64 + 1;
    cu.uleb(4)
        .uleb(5)
        .cstr("point")
        .uint(POINT_SIGNATURE, 8)
        .uleb(6)
        .cstr("point_t")
        .uint(POINT_SIGNATURE, 8)
        .uleb(7)
        .cstr("point_decl_t")
        .uint(stub, 1)
        .uint(0, 1);
    let compile_unit = unit(endian, Format::Dwarf32, &cu.bytes);

    if version >= 5 {
        let mut debug_info = type_unit;
        debug_info.extend_from_slice(&compile_unit);
        TypeUnitDwarf {
            debug_info,
            debug_types: Vec::new(),
            debug_abbrev,
        }
    } else {
        TypeUnitDwarf {
            debug_info: compile_unit,
            debug_types: type_unit,
            debug_abbrev,
        }
    }
}

/// The nested `test_t` record as a C compiler describes it: anonymous
/// structure types referenced from a `test_t` typedef.
pub(crate) fn fixture_dwarf(version: u16) -> DwarfBuilder {
    let mut cu = Die::new(DW_TAG_COMPILE_UNIT).name("test.c");
    if version >= 5 {
        cu = cu.attr(DW_AT_STR_OFFSETS_BASE, Val::Sec(8));
    }
    let cu = cu
        .child(
            Die::new(DW_TAG_BASE_TYPE)
                .label("int")
                .name("int")
                .attr(DW_AT_BYTE_SIZE, Val::U(4)),
        )
        .child(
            structure("deep", 8)
                .child(member("deeply_nested_a", "int", 0))
                .child(member("deeply_nested_b", "int", 4)),
        )
        .child(
            structure("nested", 16)
                .child(member("nested_a", "int", 0))
                .child(member("nested_b", "int", 4))
                .child(member("deeply_nested", "deep", 8)),
        )
        .child(
            structure("test", 24)
                .child(member("a", "int", 0))
                .child(
                    Die::new(DW_TAG_MEMBER)
                        .name("b")
                        .attr(DW_AT_TYPE, Val::Ref("int"))
                        .attr(
                            DW_AT_DATA_MEMBER_LOCATION,
                            Val::Expr(vec![DW_OP_PLUS_UCONST, 4]),
                        ),
                )
                .child(member("nested", "nested", 8)),
        )
        .child(
            Die::new(DW_TAG_TYPEDEF)
                .name("test_t")
                .attr(DW_AT_TYPE, Val::Ref("test")),
        );
    DwarfBuilder::build(version, cu)
}
