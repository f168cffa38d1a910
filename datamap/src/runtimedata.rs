//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Versioned layout data: per-version files and merged version ranges
//

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::query::LayoutMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Version {
        Version {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Accepts `1`, `1.2`, `v1.2.3` and drops `-pre`/`+build` suffixes.
    fn from_str(s: &str) -> Result<Version> {
        let invalid = || Error::InvalidVersion(s.to_string());

        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed.split(['-', '+']).next().unwrap_or_default();
        if core.is_empty() {
            return Err(invalid());
        }

        let fields: Vec<&str> = core.split('.').collect();
        if fields.len() > 3 {
            return Err(invalid());
        }
        let mut parts = [0u64; 3];
        for (part, field) in parts.iter_mut().zip(&fields) {
            *part = field.parse().map_err(|_| invalid())?;
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One resolved layout tagged with the runtime version it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataWithVersion {
    pub version: Version,
    pub data: Mapping,
}

impl DataWithVersion {
    pub fn new(version: Version, map: &dyn LayoutMap) -> DataWithVersion {
        DataWithVersion {
            version,
            data: layout_data(map),
        }
    }

    pub fn from_yaml(text: &str) -> Result<DataWithVersion> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Field values of a layout map as a YAML mapping, in field order.
pub fn layout_data(map: &dyn LayoutMap) -> Mapping {
    let mut data = Mapping::new();
    for (name, value) in map.values() {
        data.insert(Value::String(name.to_string()), Value::Number(value.into()));
    }
    data
}

pub fn with_version(version: &str, map: &dyn LayoutMap) -> Result<DataWithVersion> {
    Ok(DataWithVersion::new(version.parse()?, map))
}

/// Turns a version string into a file name component: `v3.9.5` becomes
/// `3_9_5`.
pub fn sanitize_identifier(identifier: &str) -> String {
    let replaced = identifier.replace('.', "_");
    match replaced.strip_prefix('v') {
        Some(rest) => rest.to_string(),
        None => replaced,
    }
}

/// Inclusive range of versions sharing one layout.  The textual form is
/// also the merged layout's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionRange {
    Exact(Version),
    Between(Version, Version),
}

impl VersionRange {
    pub fn start(&self) -> Version {
        match *self {
            VersionRange::Exact(v) | VersionRange::Between(v, _) => v,
        }
    }

    pub fn end(&self) -> Version {
        match *self {
            VersionRange::Exact(v) | VersionRange::Between(_, v) => v,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.start() <= *version && *version <= self.end()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Exact(v) => write!(f, "= {v}"),
            VersionRange::Between(lo, hi) => write!(f, "{lo} - {hi}"),
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<VersionRange> {
        let invalid = || Error::InvalidRange(s.to_string());
        let s = s.trim();

        if let Some(exact) = s.strip_prefix('=') {
            let v = exact.trim().parse().map_err(|_| invalid())?;
            return Ok(VersionRange::Exact(v));
        }

        let (lo, hi) = s.split_once(" - ").ok_or_else(invalid)?;
        let lo: Version = lo.parse().map_err(|_| invalid())?;
        let hi: Version = hi.parse().map_err(|_| invalid())?;
        if hi < lo {
            return Err(invalid());
        }
        if lo == hi {
            return Ok(VersionRange::Exact(lo));
        }
        Ok(VersionRange::Between(lo, hi))
    }
}

/// Collapses per-version layouts into ranges of consecutive versions with
/// identical data, in ascending version order.  When a version appears more
/// than once the last one wins.
pub fn merge_layouts(layouts: Vec<DataWithVersion>) -> Vec<(VersionRange, Mapping)> {
    let mut by_version: BTreeMap<Version, Mapping> = BTreeMap::new();
    for layout in layouts {
        if by_version.insert(layout.version, layout.data).is_some() {
            log::warn!("duplicate layout for version {}, keeping the last", layout.version);
        }
    }

    let mut merged: Vec<(VersionRange, Mapping)> = Vec::new();
    let mut current: Option<(Version, Version, Mapping)> = None;

    for (version, data) in by_version {
        current = match current {
            Some((lo, _, cur)) if cur == data => Some((lo, version, cur)),
            Some((lo, hi, cur)) => {
                merged.push((range(lo, hi), cur));
                Some((version, version, data))
            }
            None => Some((version, version, data)),
        };
    }
    if let Some((lo, hi, data)) = current {
        merged.push((range(lo, hi), data));
    }
    merged
}

fn range(lo: Version, hi: Version) -> VersionRange {
    if lo == hi {
        VersionRange::Exact(lo)
    } else {
        VersionRange::Between(lo, hi)
    }
}

/// Merged layouts of one runtime, as written by `mergelayout`.
#[derive(Debug, Default, Clone)]
pub struct LayoutIndex {
    entries: Vec<(VersionRange, Mapping)>,
}

impl LayoutIndex {
    pub fn new(mut entries: Vec<(VersionRange, Mapping)>) -> LayoutIndex {
        entries.sort_by_key(|(range, _)| (range.start(), range.end()));
        LayoutIndex { entries }
    }

    /// Reads every `<range>.yaml` (or `.yml`) file of `dir`.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<LayoutIndex> {
        let mut entries = Vec::new();
        for dirent in fs::read_dir(dir.as_ref())? {
            let path = dirent?.path();
            if !matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let range: VersionRange = stem.parse()?;
            let data: Mapping = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
            log::debug!("loaded layout {} from {}", range, path.display());
            entries.push((range, data));
        }
        Ok(LayoutIndex::new(entries))
    }

    pub fn lookup(&self, version: &Version) -> Option<(&VersionRange, &Mapping)> {
        self.entries
            .iter()
            .find(|(range, _)| range.contains(version))
            .map(|(range, data)| (range, data))
    }

    pub fn ranges(&self) -> impl Iterator<Item = &VersionRange> + '_ {
        self.entries.iter().map(|(range, _)| range)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
