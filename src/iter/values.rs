use crate::column::ColumnRegistry;
use crate::plan::Physical;
use crate::row::{empty_rows, one_row_set};

/// `EmptySet`: zero rows. `registry` is the schema of the relation this
/// EmptySet replaced during rewriting (see `ra::Node::EmptySet`), so a
/// wrapping stage still reports the right columns over zero rows.
pub fn empty_set(registry: ColumnRegistry) -> Physical {
    Physical::new(registry, true, empty_rows())
}

/// `OneRowSet`: a single zero-width row.
pub fn one_row_set() -> Physical {
    Physical::new(ColumnRegistry::empty(), true, one_row_set())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_has_no_rows() {
        let physical = empty_set(ColumnRegistry::empty());
        assert_eq!(physical.rows.count(), 0);
    }

    #[test]
    fn empty_set_keeps_the_registry_it_is_given() {
        use crate::column::{ColumnDescriptor, LogicalType};
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new("t", "c", LogicalType::Int64)]);
        let physical = empty_set(registry);
        assert_eq!(physical.registry.len(), 1);
    }

    #[test]
    fn one_row_set_has_exactly_one_row() {
        let physical = one_row_set();
        assert_eq!(physical.rows.count(), 1);
    }
}
