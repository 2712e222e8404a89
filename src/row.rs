use crate::error::Result;
use crate::value::Value;
use std::ops::Deref;

/// An immutable ordered sequence of Values.
///
/// A composite row produced by a join is simply the flat concatenation of
/// its parents' fields; there is no separate "composite" representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Concatenates two rows, as produced by a join.
    pub fn concat(left: &Row, right: &Row) -> Row {
        let mut values = Vec::with_capacity(left.0.len() + right.0.len());
        values.extend(left.0.iter().cloned());
        values.extend(right.0.iter().cloned());
        Row(values)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl Deref for Row {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A lazy, finite row sequence. Every physical operator consumes and
/// produces one of these.
pub type Rows = Box<dyn Iterator<Item = Result<Row>>>;

/// An empty row sequence, used by `EmptySet` and by the lowerer to
/// short-circuit plans proven empty during optimization.
pub fn empty_rows() -> Rows {
    Box::new(std::iter::empty())
}

/// A single row with zero columns, used by `OneRowSet`.
pub fn one_row_set() -> Rows {
    Box::new(std::iter::once(Ok(Row::new(Vec::new()))))
}
