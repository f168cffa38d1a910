//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Walks DWARF type information along the routes of a DataMap
//

use crate::binary::{Binary, SymbolTable};
use crate::dwarf::constants::*;
use crate::dwarf::{DebugInfo, EntryRef};
use crate::error::{Error, Result};
use crate::query::{apply, DataMap, LayoutMap, Op, RouteNode};

const COMPOSITE_TAGS: &[u64] = &[
    DW_TAG_STRUCTURE_TYPE,
    DW_TAG_CLASS_TYPE,
    DW_TAG_UNION_TYPE,
];

const LOOKUP_TAGS: &[u64] = &[
    DW_TAG_STRUCTURE_TYPE,
    DW_TAG_CLASS_TYPE,
    DW_TAG_UNION_TYPE,
    DW_TAG_TYPEDEF,
];

// bound on typedef/qualifier chains, broken DWARF can loop
const MAX_TYPE_CHAIN: usize = 64;

fn is_composite(entry: &EntryRef<'_>) -> bool {
    COMPOSITE_TAGS.contains(&entry.tag())
}

/// A composite type that carries its members.
fn is_definition(entry: &EntryRef<'_>) -> bool {
    is_composite(entry) && entry.has_children() && !entry.is_declaration()
}

/// Follows typedefs and cv-qualifiers down to the underlying type, and
/// declarations to the type unit that defines them.
fn strip_type(mut entry: EntryRef<'_>) -> EntryRef<'_> {
    for _ in 0..MAX_TYPE_CHAIN {
        if let Some(definition) = entry.follow(DW_AT_SIGNATURE) {
            entry = definition;
            continue;
        }
        match entry.tag() {
            DW_TAG_TYPEDEF | DW_TAG_CONST_TYPE | DW_TAG_VOLATILE_TYPE | DW_TAG_RESTRICT_TYPE
            | DW_TAG_ATOMIC_TYPE => match entry.type_entry() {
                Some(next) => entry = next,
                None => return entry,
            },
            _ => return entry,
        }
    }
    entry
}

/// First definition of the struct, class or union called `name`, either
/// directly or through a typedef of that name.
pub fn find_composite<'d>(info: &'d DebugInfo, name: &str) -> Option<EntryRef<'d>> {
    info.find_named(name, LOOKUP_TAGS).find_map(|entry| {
        let ty = if entry.tag() == DW_TAG_TYPEDEF {
            strip_type(entry)
        } else {
            entry
        };
        is_definition(&ty).then_some(ty)
    })
}

/// Size in bytes of a type entry.
pub fn type_size(ty: EntryRef<'_>) -> Option<u64> {
    let ty = strip_type(ty);
    if let Some(size) = ty.byte_size() {
        return Some(size);
    }
    match ty.tag() {
        DW_TAG_POINTER_TYPE
        | DW_TAG_REFERENCE_TYPE
        | DW_TAG_RVALUE_REFERENCE_TYPE
        | DW_TAG_PTR_TO_MEMBER_TYPE => Some(u64::from(ty.unit().address_size)),
        DW_TAG_ARRAY_TYPE => {
            let element = type_size(ty.type_entry()?)?;
            let count = ty
                .children()
                .filter(|c| c.tag() == DW_TAG_SUBRANGE_TYPE)
                .map(subrange_count)
                .try_fold(1u64, |acc, n| acc.checked_mul(n?))?;
            element.checked_mul(count)
        }
        _ => None,
    }
}

fn subrange_count(subrange: EntryRef<'_>) -> Option<u64> {
    if let Some(count) = subrange.udata(DW_AT_COUNT) {
        return Some(count);
    }
    match subrange.udata(DW_AT_UPPER_BOUND) {
        // all ones is -1, the bound of a zero length array
        Some(u64::MAX) => Some(0),
        Some(upper) => {
            let lower = subrange.udata(DW_AT_LOWER_BOUND).unwrap_or(0);
            (upper + 1).checked_sub(lower)
        }
        // flexible array member
        None => Some(0),
    }
}

struct Member<'d> {
    entry: EntryRef<'d>,
    /// Byte offset from the start of the searched composite; `None` for
    /// static members and for offsets past `u64::MAX`.
    offset: Option<u64>,
    is_static: bool,
}

fn is_static_member(entry: &EntryRef<'_>) -> bool {
    entry.tag() == DW_TAG_VARIABLE
        || (entry.member_location().is_none()
            && (entry.flag(DW_AT_EXTERNAL) || entry.is_declaration()))
}

/// Member called `name` of a composite, looking through anonymous struct
/// and union members.  A member without a location starts at the
/// beginning of its parent, as union members do.
fn find_member<'d>(composite: EntryRef<'d>, name: &str) -> Option<Member<'d>> {
    for child in composite.children() {
        if !matches!(child.tag(), DW_TAG_MEMBER | DW_TAG_VARIABLE) {
            continue;
        }
        match child.name() {
            Some(n) if n == name => {
                let is_static = is_static_member(&child);
                let offset = if is_static {
                    None
                } else {
                    Some(child.member_location().unwrap_or(0))
                };
                return Some(Member {
                    entry: child,
                    offset,
                    is_static,
                });
            }
            None if child.tag() == DW_TAG_MEMBER => {
                let inner = match child.type_entry().map(strip_type) {
                    Some(inner) if is_composite(&inner) => inner,
                    _ => continue,
                };
                if let Some(found) = find_member(inner, name) {
                    let base = child.member_location().unwrap_or(0);
                    return Some(Member {
                        entry: found.entry,
                        offset: found.offset.and_then(|o| base.checked_add(o)),
                        is_static: found.is_static,
                    });
                }
            }
            _ => {}
        }
    }
    None
}

/// Linkage name of a static member, taken from the member itself or from
/// the out-of-line definition that names it as its specification.
fn static_linkage_name<'d>(info: &'d DebugInfo, member: EntryRef<'d>) -> Option<&'d str> {
    if let Some(name) = member.linkage_name() {
        return Some(name);
    }
    info.entries()
        .filter(|e| e.tag() == DW_TAG_VARIABLE)
        .filter(|e| e.follow(DW_AT_SPECIFICATION).map(|s| s.offset()) == Some(member.offset()))
        .find_map(|e| e.linkage_name())
}

struct Walker<'d> {
    info: &'d DebugInfo,
    symbols: Option<&'d SymbolTable>,
    values: Vec<(usize, i64)>,
}

impl<'d> Walker<'d> {
    fn process(&mut self, route: &RouteNode, composite: EntryRef<'d>, offset: u64) -> Result<()> {
        self.extract(route, composite, offset)?;

        for child in &route.children {
            let member = find_member(composite, &child.ty).ok_or_else(|| Error::FieldNotFound {
                field: child.ty.clone(),
                ty: route.ty.clone(),
            })?;
            let location = member
                .offset
                .and_then(|location| offset.checked_add(location))
                .ok_or_else(|| Error::UnknownLocation(format!("{}.{}", route.ty, child.ty)))?;
            let nested = member
                .entry
                .type_entry()
                .map(strip_type)
                .filter(is_composite)
                .ok_or_else(|| Error::NotComposite(format!("{}.{}", route.ty, child.ty)))?;

            log::debug!(
                "descending into {}.{} at offset {}",
                route.ty,
                child.ty,
                location
            );
            self.process(child, nested, location)?;
        }
        Ok(())
    }

    fn extract(&mut self, route: &RouteNode, composite: EntryRef<'d>, offset: u64) -> Result<()> {
        for ex in &route.extractors {
            let member = find_member(composite, &ex.source);

            let value = match (ex.op, member) {
                (Op::SizeOf, None) if ex.source == route.ty => composite
                    .byte_size()
                    .ok_or_else(|| Error::UnknownSize(route.ty.clone()))?,
                (_, None) => {
                    return Err(Error::FieldNotFound {
                        field: ex.source.clone(),
                        ty: route.ty.clone(),
                    })
                }
                (Op::SizeOf, Some(member)) => member
                    .entry
                    .type_entry()
                    .and_then(type_size)
                    .ok_or_else(|| Error::UnknownSize(format!("{}.{}", route.ty, ex.source)))?,
                (Op::OffsetOf, Some(member)) => match member.offset {
                    Some(location) => offset.checked_add(location).ok_or_else(|| {
                        Error::UnknownLocation(format!("{}.{}", route.ty, ex.source))
                    })?,
                    None if member.is_static => {
                        match self.static_address(&route.ty, &ex.source, member.entry) {
                            Some(address) => address,
                            None => continue,
                        }
                    }
                    None => {
                        return Err(Error::UnknownLocation(format!(
                            "{}.{}",
                            route.ty, ex.source
                        )))
                    }
                },
            };
            self.values.push((ex.slot, value as i64));
        }
        Ok(())
    }

    fn static_address(&self, ty: &str, field: &str, member: EntryRef<'d>) -> Option<u64> {
        let Some(name) = static_linkage_name(self.info, member) else {
            log::warn!("no linkage name for static member {ty}.{field}");
            return None;
        };
        let address = self.symbols.and_then(|symbols| symbols.address(name));
        if address.is_none() {
            log::warn!("symbol {name} for static member {ty}.{field} not found");
        }
        address
    }
}

impl DataMap {
    /// Resolves every route against `info`, returning `(slot, value)`
    /// pairs.  Static members are looked up in `symbols` by linkage name.
    pub fn read_from_dwarf(
        &self,
        info: &DebugInfo,
        symbols: Option<&SymbolTable>,
    ) -> Result<Vec<(usize, i64)>> {
        let mut walker = Walker {
            info,
            symbols,
            values: Vec::new(),
        };
        for route in self.routes() {
            let composite =
                find_composite(info, &route.ty).ok_or_else(|| Error::TypeNotFound(route.ty.clone()))?;
            log::debug!("resolving {} at {:#x}", route.ty, composite.offset());
            walker.process(route, composite, 0)?;
        }
        Ok(walker.values)
    }
}

/// Fills `map` from the debug information and symbols of `binary`.
pub fn resolve(map: &mut dyn LayoutMap, binary: &Binary) -> Result<()> {
    let dm = DataMap::new(&*map)?;
    let values = dm.read_from_dwarf(binary.debug_info(), Some(binary.symbols()))?;
    apply(map, &values);
    Ok(())
}
