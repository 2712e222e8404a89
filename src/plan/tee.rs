use crate::error::Result;
use crate::row::{Row, Rows};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// A one-to-many fan-out over a single producer ("Tee"). The underlying
/// source is pulled at most once; every tap replays already-seen rows from
/// a shared buffer and only drives the source forward once every existing
/// tap has consumed the buffer's tail.
///
/// `capacity` bounds how far the buffer is allowed to grow ahead of the
/// slowest live tap: once every registered tap has advanced past a given
/// offset, rows at that offset are dropped from the front of the buffer.
/// `capacity` is a trimming threshold, not a hard cap — a tap that never
/// advances (or advances too slowly relative to another) still sees every
/// row it is owed; it just means the buffer keeps growing behind it.
///
/// `Row`/`Error` are both cheaply `Clone`, so taps share buffered items by
/// value rather than by reference-counting individual rows.
pub struct Tee {
    source: RefCell<Rows>,
    buffer: RefCell<VecDeque<Result<Row>>>,
    exhausted: Cell<bool>,
    /// Absolute index (into the logical, untrimmed stream) of `buffer[0]`.
    base: Cell<usize>,
    capacity: usize,
    /// Each live tap's absolute read position, so `trim` can find the
    /// slowest one. Dropped taps clear their own slot via `Weak::strong_count`.
    positions: RefCell<Vec<Weak<Cell<usize>>>>,
}

impl Tee {
    pub fn new(source: Rows, capacity: usize) -> Rc<Tee> {
        Rc::new(Tee {
            source: RefCell::new(source),
            buffer: RefCell::new(VecDeque::new()),
            exhausted: Cell::new(false),
            base: Cell::new(0),
            capacity,
            positions: RefCell::new(Vec::new()),
        })
    }

    /// Returns a fresh, independently positioned row sequence reading from
    /// this Tee.
    pub fn tap(self: &Rc<Self>) -> Rows {
        let tee = Rc::clone(self);
        let pos = Rc::new(Cell::new(0usize));
        tee.positions.borrow_mut().push(Rc::downgrade(&pos));
        Box::new(std::iter::from_fn(move || loop {
            let offset = pos.get().checked_sub(tee.base.get());
            if let Some(item) = offset.and_then(|i| tee.buffer.borrow().get(i).cloned()) {
                pos.set(pos.get() + 1);
                tee.trim();
                return Some(item);
            }
            if tee.exhausted.get() {
                return None;
            }
            match tee.source.borrow_mut().next() {
                Some(item) => tee.buffer.borrow_mut().push_back(item),
                None => {
                    tee.exhausted.set(true);
                    return None;
                }
            }
        }))
    }

    /// Drops buffered rows every live tap has already consumed, down to
    /// `capacity` rows of remaining slack.
    fn trim(&self) {
        let mut positions = self.positions.borrow_mut();
        positions.retain(|weak| weak.strong_count() > 0);
        let slowest = positions
            .iter()
            .filter_map(|weak| weak.upgrade())
            .map(|pos| pos.get())
            .min();
        let Some(slowest) = slowest else { return };
        let mut buffer = self.buffer.borrow_mut();
        while self.base.get() < slowest && buffer.len() > self.capacity {
            buffer.pop_front();
            self.base.set(self.base.get() + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn rows(values: &[i64]) -> Rows {
        let rows: Vec<_> = values
            .iter()
            .map(|v| Ok(Row::new(vec![Value::Int64(*v)])))
            .collect();
        Box::new(rows.into_iter())
    }

    #[test]
    fn every_tap_sees_the_full_sequence() {
        let tee = Tee::new(rows(&[1, 2, 3]), 1024);
        let a: Vec<_> = tee.tap().collect::<Result<Vec<_>>>().unwrap();
        let b: Vec<_> = tee.tap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn taps_can_advance_independently() {
        let tee = Tee::new(rows(&[1, 2, 3]), 1024);
        let mut fast = tee.tap();
        let mut slow = tee.tap();
        assert!(fast.next().is_some());
        assert!(fast.next().is_some());
        assert!(fast.next().is_some());
        assert!(fast.next().is_none());
        assert_eq!(slow.next().unwrap().unwrap(), Row::new(vec![Value::Int64(1)]));
        assert_eq!(slow.next().unwrap().unwrap(), Row::new(vec![Value::Int64(2)]));
    }

    #[test]
    fn buffer_trims_behind_the_slowest_tap_without_losing_rows() {
        let tee = Tee::new(rows(&[1, 2, 3, 4, 5]), 0);
        let mut fast = tee.tap();
        let mut slow = tee.tap();
        assert_eq!(fast.next().unwrap().unwrap(), Row::new(vec![Value::Int64(1)]));
        assert_eq!(fast.next().unwrap().unwrap(), Row::new(vec![Value::Int64(2)]));
        assert_eq!(fast.next().unwrap().unwrap(), Row::new(vec![Value::Int64(3)]));
        // `fast` is two rows ahead; with capacity 0 those rows are dropped
        // from the buffer the moment `slow` has also consumed them, but
        // `slow` must still read 1, 2, 3 in order from the buffer/source.
        assert_eq!(slow.next().unwrap().unwrap(), Row::new(vec![Value::Int64(1)]));
        assert_eq!(slow.next().unwrap().unwrap(), Row::new(vec![Value::Int64(2)]));
        assert_eq!(slow.next().unwrap().unwrap(), Row::new(vec![Value::Int64(3)]));
        assert_eq!(slow.next().unwrap().unwrap(), Row::new(vec![Value::Int64(4)]));
        assert_eq!(fast.next().unwrap().unwrap(), Row::new(vec![Value::Int64(4)]));
        assert_eq!(fast.next().unwrap().unwrap(), Row::new(vec![Value::Int64(5)]));
        assert_eq!(slow.next().unwrap().unwrap(), Row::new(vec![Value::Int64(5)]));
        assert!(fast.next().is_none());
        assert!(slow.next().is_none());
    }

    #[test]
    fn a_dropped_tap_does_not_block_trimming() {
        let tee = Tee::new(rows(&[1, 2, 3]), 0);
        {
            let mut dropped = tee.tap();
            assert!(dropped.next().is_some());
        }
        let mut only = tee.tap();
        assert_eq!(only.next().unwrap().unwrap(), Row::new(vec![Value::Int64(1)]));
        assert_eq!(only.next().unwrap().unwrap(), Row::new(vec![Value::Int64(2)]));
        assert_eq!(only.next().unwrap().unwrap(), Row::new(vec![Value::Int64(3)]));
        assert!(only.next().is_none());
    }
}
