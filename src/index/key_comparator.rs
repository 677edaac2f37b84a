use std::cmp::Ordering;

/// Total order over index keys. The tree never compares keys directly;
/// every comparison goes through the comparator supplied at
/// construction.
pub trait KeyComparator: Send + Sync {
    fn compare(&self, a: i64, b: i64) -> Ordering;
}

/// Natural signed integer order.
pub struct IntegerComparator;

impl KeyComparator for IntegerComparator {
    fn compare(&self, a: i64, b: i64) -> Ordering {
        a.cmp(&b)
    }
}
