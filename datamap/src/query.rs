//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Layout map queries and the route tree compiled from them
//

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    OffsetOf,
    SizeOf,
}

/// One field of a layout map: `name` is the output key, `path` the dotted
/// type/field path the value is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub name: &'static str,
    pub op: Op,
    pub path: &'static str,
}

impl Query {
    pub fn offset_of(name: &'static str, path: &'static str) -> Query {
        Query {
            name,
            op: Op::OffsetOf,
            path,
        }
    }

    pub fn size_of(name: &'static str, path: &'static str) -> Query {
        Query {
            name,
            op: Op::SizeOf,
            path,
        }
    }

    /// Paths that are empty or `-` mark fields the map keeps but never
    /// resolves.
    pub fn is_ignored(&self) -> bool {
        self.path.is_empty() || self.path == "-"
    }
}

/// A record whose fields are filled from type information.
///
/// `queries` and `slots_mut` must list fields in the same order; the
/// index into that order is the field's slot.
pub trait LayoutMap {
    fn queries(&self) -> Vec<Query>;

    fn slots_mut(&mut self) -> Vec<&mut i64>;

    fn values(&self) -> Vec<(&'static str, i64)>;

    /// Field values packed as consecutive native-endian `i64`s, the form
    /// a consumer on the same host reads them back in.
    fn data(&self) -> Vec<u8> {
        self.values()
            .into_iter()
            .flat_map(|(_, value)| value.to_ne_bytes())
            .collect()
    }
}

/// Declares a layout map struct of `i64` fields.
///
/// ```ignore
/// layout_map! {
///     pub struct Pthread {
///         pthread_size: sizeof("pthread"),
///         pthread_tsd: offsetof("pthread.tsd"),
///     }
/// }
/// ```
#[macro_export]
macro_rules! layout_map {
    (@op offsetof) => { $crate::Op::OffsetOf };
    (@op sizeof) => { $crate::Op::SizeOf };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $field:ident : $op:ident ( $path:literal ) ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, PartialEq, Eq)]
        $vis struct $name {
            $( pub $field: i64, )*
        }

        impl $crate::LayoutMap for $name {
            fn queries(&self) -> Vec<$crate::Query> {
                vec![$( $crate::Query {
                    name: stringify!($field),
                    op: $crate::layout_map!(@op $op),
                    path: $path,
                } ),*]
            }

            fn slots_mut(&mut self) -> Vec<&mut i64> {
                vec![$( &mut self.$field ),*]
            }

            fn values(&self) -> Vec<(&'static str, i64)> {
                vec![$( (stringify!($field), self.$field) ),*]
            }
        }
    };
}

/// Reads one value out of the entry a route resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extractor {
    /// Field name, or the route's own type name for the size of the type.
    pub source: String,
    pub op: Op,
    pub slot: usize,
}

/// A composite type to visit, what to read from it, and which of its
/// members to descend into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteNode {
    /// Type name at the root, member name below it.
    pub ty: String,
    pub extractors: Vec<Extractor>,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    fn new(ty: &str) -> RouteNode {
        RouteNode {
            ty: ty.to_string(),
            extractors: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn child_mut(&mut self, ty: &str) -> &mut RouteNode {
        let index = match self.children.iter().position(|c| c.ty == ty) {
            Some(i) => i,
            None => {
                self.children.push(RouteNode::new(ty));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

/// Routes compiled from a layout map, one root per struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMap {
    routes: Vec<RouteNode>,
    slots: usize,
}

impl DataMap {
    pub fn new(map: &dyn LayoutMap) -> Result<DataMap> {
        DataMap::from_queries(&map.queries())
    }

    pub fn from_queries(queries: &[Query]) -> Result<DataMap> {
        let mut dm = DataMap {
            routes: Vec::new(),
            slots: queries.len(),
        };
        let mut used = 0;

        for (slot, query) in queries.iter().enumerate() {
            if query.is_ignored() {
                continue;
            }
            let parts: Vec<&str> = query.path.split('.').collect();
            if parts.iter().any(|p| p.is_empty()) {
                return Err(Error::InvalidQuery {
                    path: query.path.to_string(),
                    reason: "empty path component",
                });
            }

            let (route_path, source) = match (query.op, parts.len()) {
                (Op::OffsetOf, 1) => {
                    return Err(Error::InvalidQuery {
                        path: query.path.to_string(),
                        reason: "offsetof needs a struct type and a field",
                    })
                }
                (Op::SizeOf, 1) => (&parts[..], parts[0]),
                (_, n) => (&parts[..n - 1], parts[n - 1]),
            };

            let node = dm.route_mut(route_path);
            node.extractors.push(Extractor {
                source: source.to_string(),
                op: query.op,
                slot,
            });
            used += 1;
        }

        if used == 0 {
            return Err(Error::NoQueries);
        }
        Ok(dm)
    }

    fn route_mut(&mut self, path: &[&str]) -> &mut RouteNode {
        let index = match self.routes.iter().position(|r| r.ty == path[0]) {
            Some(i) => i,
            None => {
                self.routes.push(RouteNode::new(path[0]));
                self.routes.len() - 1
            }
        };
        let root = &mut self.routes[index];
        path[1..]
            .iter()
            .fold(root, |node, member| node.child_mut(member))
    }

    pub fn routes(&self) -> &[RouteNode] {
        &self.routes
    }

    /// Number of slots of the layout map this was compiled from.
    pub fn slot_count(&self) -> usize {
        self.slots
    }
}

/// Writes resolved `(slot, value)` pairs into a layout map.
pub fn apply(map: &mut dyn LayoutMap, values: &[(usize, i64)]) {
    let mut slots = map.slots_mut();
    for (slot, value) in values {
        if let Some(target) = slots.get_mut(*slot) {
            **target = *value;
        }
    }
}
