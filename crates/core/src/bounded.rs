use std::ops::Index;

use crate::{Result, RigError};

/// Append-only vector with a hard capacity. Pushing past the capacity is an
/// error instead of a reallocation.
#[derive(Debug, Clone)]
pub struct BoundedVec<T> {
    items: Vec<T>,
    capacity: usize,
    label: &'static str,
}

impl<T> BoundedVec<T> {
    /// `label` names the collection in [`RigError::CapacityExceeded`].
    pub fn new(label: &'static str, capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            label,
        }
    }

    /// Appends `item`, or returns [`RigError::CapacityExceeded`] when full.
    pub fn push(&mut self, item: T) -> Result<()> {
        if self.items.len() >= self.capacity {
            return Err(RigError::capacity(self.label, self.capacity));
        }
        self.items.push(item);
        Ok(())
    }

    /// Returns the item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Returns the number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Index<usize> for BoundedVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a BoundedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Index of the candidate closest to `target`. Ties keep the earliest
/// candidate and a NaN distance never beats a real one.
pub(crate) fn nearest_index<I>(candidates: I, target: f64) -> Option<usize>
where
    I: IntoIterator<Item = f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in candidates.into_iter().enumerate() {
        let distance = (value - target).abs();
        match best {
            Some((_, min)) if distance.total_cmp(&min).is_ge() => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}
