use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A column's logical type, carried for documentation and `dump_ra`
/// formatting. The engine itself is largely untyped at the RA layer (values
/// carry their own tag); this exists as metadata attached to each column
/// descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalType {
    Int64,
    Float64,
    Bool,
    Text,
    /// The descriptor's type could not be determined statically (e.g. the
    /// output of an opaque function call).
    Unknown,
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64 => write!(f, "int64"),
            Self::Float64 => write!(f, "float64"),
            Self::Bool => write!(f, "bool"),
            Self::Text => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A `(table_opt, name)` pair identifying a column, per the design notes'
/// recommendation. `table` is `None` for unqualified references (`c`) and
/// `Some` for qualified ones (`T.c`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Describes one column: its identifier, the table it originated from (if
/// any), and its logical type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub identifier: ColumnRef,
    pub origin_table: Option<String>,
    pub logical_type: LogicalType,
}

impl ColumnDescriptor {
    pub fn new(table: impl Into<String>, name: impl Into<String>, logical_type: LogicalType) -> Self {
        let table = table.into();
        Self {
            identifier: ColumnRef::qualified(table.clone(), name),
            origin_table: Some(table),
            logical_type,
        }
    }

    pub fn anonymous(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            identifier: ColumnRef::unqualified(name),
            origin_table: None,
            logical_type,
        }
    }
}

/// The ordered sequence of column descriptors carried by every stage. Index
/// order matches the position of the corresponding value in every emitted
/// `Row`. Cloning is a cheap `Vec` clone of small descriptors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRegistry(Vec<ColumnDescriptor>);

impl ColumnRegistry {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self(columns)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.0.get(index)
    }

    /// Concatenates two registries, as produced by a join or cross product.
    /// Cross-product ambiguity (invariant (ii)) is permitted here; it is
    /// only an error if a later lookup is itself ambiguous.
    pub fn concat(left: &ColumnRegistry, right: &ColumnRegistry) -> ColumnRegistry {
        let mut columns = left.0.clone();
        columns.extend(right.0.iter().cloned());
        ColumnRegistry(columns)
    }

    /// Narrows the registry to just the listed indexes, in order (used by
    /// GroupByHash and Remap-style column selection).
    pub fn project(&self, indexes: &[usize]) -> ColumnRegistry {
        ColumnRegistry(indexes.iter().map(|&i| self.0[i].clone()).collect())
    }

    /// Resolves a column identifier to its index via a two-pass search:
    /// qualified lookups match `table.name` exactly; unqualified lookups
    /// match `name` against every descriptor and fail with `AmbiguousColumn`
    /// if more than one matches. Design notes §9.
    pub fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        if let Some(table) = &column.table {
            return self
                .0
                .iter()
                .position(|d| {
                    d.identifier.name == column.name && d.identifier.table.as_deref() == Some(table)
                })
                .ok_or_else(|| Error::UnknownColumn(column.to_string()));
        }
        let mut matches = self
            .0
            .iter()
            .enumerate()
            .filter(|(_, d)| d.identifier.name == column.name);
        let Some((first, _)) = matches.next() else {
            return Err(Error::UnknownColumn(column.to_string()));
        };
        if matches.next().is_some() {
            return Err(Error::AmbiguousColumn(column.name.clone()));
        }
        Ok(first)
    }
}

impl<'a> IntoIterator for &'a ColumnRegistry {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ColumnRegistry {
        ColumnRegistry::new(vec![
            ColumnDescriptor::new("a", "id", LogicalType::Int64),
            ColumnDescriptor::new("b", "id", LogicalType::Int64),
            ColumnDescriptor::new("a", "name", LogicalType::Text),
        ])
    }

    #[test]
    fn qualified_lookup_is_exact() {
        let r = registry();
        assert_eq!(r.resolve(&ColumnRef::qualified("b", "id")).unwrap(), 1);
    }

    #[test]
    fn unqualified_ambiguous_column_errors() {
        let r = registry();
        assert_eq!(
            r.resolve(&ColumnRef::unqualified("id")),
            Err(Error::AmbiguousColumn("id".into()))
        );
    }

    #[test]
    fn unqualified_unique_column_resolves() {
        let r = registry();
        assert_eq!(r.resolve(&ColumnRef::unqualified("name")).unwrap(), 2);
    }

    #[test]
    fn unknown_column_errors() {
        let r = registry();
        assert!(matches!(
            r.resolve(&ColumnRef::unqualified("missing")),
            Err(Error::UnknownColumn(_))
        ));
    }
}
