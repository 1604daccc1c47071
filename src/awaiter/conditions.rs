//! Canned termination predicates.
//!
//! Each constructor returns a [`Condition`] carrying the predicate together
//! with the message reported when the deadline runs out.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::{self, Debug};

type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + Send + 'a>;

/// Predicate over the polled value plus its human-readable expectation
pub struct Condition<'a, T> {
    expected: String,
    predicate: Predicate<'a, T>,
}

impl<'a, T> Condition<'a, T> {
    pub fn new<F>(expected: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + 'a,
    {
        Self {
            expected: expected.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn is_met(&self, value: &T) -> bool {
        (self.predicate)(value)
    }
}

impl<T> Debug for Condition<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

/// Custom predicate identified by `name` in timeout messages.
pub fn named<'a, T, F>(name: &str, predicate: F) -> Condition<'a, T>
where
    F: Fn(&T) -> bool + Send + 'a,
{
    Condition::new(format!("Expected condition '{name}'."), predicate)
}

pub fn value_equals<'a, T>(expected: T) -> Condition<'a, T>
where
    T: PartialEq + Debug + Send + 'a,
{
    Condition::new(format!("Expected value to equal {expected:?}."), move |value| {
        *value == expected
    })
}

/// True once the value is at or above `threshold`.
pub fn value_reaches<'a, T>(threshold: T) -> Condition<'a, T>
where
    T: PartialOrd + Debug + Send + 'a,
{
    Condition::new(format!("Expected value to reach {threshold:?}."), move |value| {
        *value >= threshold
    })
}

pub fn has_size<'a, T>(size: usize) -> Condition<'a, T>
where
    T: HasSize + 'a,
{
    Condition::new(format!("Expected value has size {size}."), move |value: &T| {
        value.size() == size
    })
}

pub fn value_not_equal<'a, T>(unexpected: T) -> Condition<'a, T>
where
    T: PartialEq + Debug + Send + 'a,
{
    Condition::new(
        format!("Expected value to not equal {unexpected:?}."),
        move |value| *value != unexpected,
    )
}

/// Collections whose element count can be checked by [`has_size`]
pub trait HasSize {
    fn size(&self) -> usize;
}

impl<E> HasSize for Vec<E> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<E> HasSize for VecDeque<E> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<K, V, S> HasSize for HashMap<K, V, S> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<E, S> HasSize for HashSet<E, S> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<K, V> HasSize for BTreeMap<K, V> {
    fn size(&self) -> usize {
        self.len()
    }
}

impl<E> HasSize for BTreeSet<E> {
    fn size(&self) -> usize {
        self.len()
    }
}
