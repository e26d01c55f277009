//! One-shot entity iteration.

use crate::error::CoreResult;
use std::fmt;

/// A lazy, one-shot pass over a backend's records.
///
/// Each item is an owned copy. Dropping the iterator releases whatever the
/// backend held for it, including on early exit. Iterating again requires a
/// fresh iterator from [`crate::PersistenceBackend::iter`].
pub struct EntityIter<'a, E> {
    inner: Box<dyn Iterator<Item = CoreResult<E>> + Send + 'a>,
}

impl<'a, E> EntityIter<'a, E> {
    /// Wraps a backend cursor.
    pub fn new(inner: impl Iterator<Item = CoreResult<E>> + Send + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// An iterator over nothing.
    #[must_use]
    pub fn empty() -> Self
    where
        E: Send + 'a,
    {
        Self::new(std::iter::empty())
    }
}

impl<E> Iterator for EntityIter<'_, E> {
    type Item = CoreResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<E> fmt::Debug for EntityIter<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityIter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn yields_inner_items_once() {
        let mut iter = EntityIter::new(vec![Ok(1u32), Ok(2)].into_iter());
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        assert_eq!(iter.next().unwrap().unwrap(), 2);
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn errors_stop_collect() {
        let iter = EntityIter::new(vec![Ok(1u32), Err(CoreError::Closed), Ok(3)].into_iter());
        let collected: CoreResult<Vec<u32>> = iter.collect();
        assert!(matches!(collected, Err(CoreError::Closed)));
    }

    #[test]
    fn empty_iterator() {
        assert_eq!(EntityIter::<u32>::empty().count(), 0);
    }
}
