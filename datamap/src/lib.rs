//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Struct layout extraction: layout maps are compiled into route trees
// which are resolved against the DWARF debug information of a binary.
//

pub mod binary;
pub mod dwarf;
pub mod error;
pub mod query;
pub mod resolve;
pub mod runtimedata;
pub mod runtimes;

pub use binary::{Binary, SymbolTable};
pub use error::{Error, Result};
pub use query::{apply, DataMap, Extractor, LayoutMap, Op, Query, RouteNode};
pub use resolve::resolve;
