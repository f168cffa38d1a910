//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::dwarf::DwarfError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid query {path:?}: {reason}")]
    InvalidQuery { path: String, reason: &'static str },
    #[error("layout map has no offsetof or sizeof queries")]
    NoQueries,
    #[error("failed to parse DWARF data: {0}")]
    Dwarf(#[from] DwarfError),
    #[error("no DWARF debug information found")]
    MissingDebugInfo,
    #[error("no composite (struct|class|union) type named {0} found")]
    TypeNotFound(String),
    #[error("field {field} not found in {ty}")]
    FieldNotFound { field: String, ty: String },
    #[error("{0} does not name a composite type")]
    NotComposite(String),
    #[error("size of {0} cannot be determined")]
    UnknownSize(String),
    #[error("location of {0} cannot be determined")]
    UnknownLocation(String),
    #[error("failed to parse object file: {0}")]
    Object(#[from] object::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode or decode YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid version {0:?}")]
    InvalidVersion(String),
    #[error("invalid version range {0:?}")]
    InvalidRange(String),
}

pub type Result<T> = std::result::Result<T, Error>;
