//! The physical iterator library. Each operator is a plain function over a
//! `Physical`, composed with other operators, rather than a stateful
//! iterator object (see DESIGN.md).

pub mod cross;
pub mod distinct;
pub mod filter;
pub mod group_by;
pub mod hash_intersect;
pub mod limit_offset;
pub mod merge_join;
pub mod order_by;
pub mod project;
pub mod sort;
pub mod union_merge;
pub mod values;
