//! Persistent singly linked list.
//!
//! A [`Chain`] is write-once: pushing returns a new chain whose head points at
//! the old one, and nodes are never mutated after construction. Clones share
//! structure, so extending a chain on one thread can never be observed through
//! a clone held by another.

use std::fmt;
use std::sync::Arc;

struct Node<T> {
    parent: Option<Arc<Node<T>>>,
    item: T,
}

/// An immutable, structurally shared stack of items.
///
/// Iteration starts at the most recently pushed item.
pub struct Chain<T> {
    head: Option<Arc<Node<T>>>,
    len: usize,
}

impl<T> Chain<T> {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Returns a new chain with `item` on top of `self`.
    #[must_use]
    pub fn push(&self, item: T) -> Self {
        Self {
            head: Some(Arc::new(Node {
                parent: self.head.clone(),
                item,
            })),
            len: self.len + 1,
        }
    }

    /// Returns the most recently pushed item.
    #[must_use]
    pub fn head(&self) -> Option<&T> {
        self.head.as_deref().map(|node| &node.item)
    }

    /// Returns the first item, newest first, matching `pred`.
    pub fn find<P>(&self, mut pred: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|item| pred(item))
    }

    /// Iterates from the newest item to the oldest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Number of items in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing was ever pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns true if both chains share the same head node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over a [`Chain`], newest first.
pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.parent.as_deref();
        Some(&node.item)
    }
}

impl<'a, T> IntoIterator for &'a Chain<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        // Unlink uniquely owned nodes iteratively so long chains don't
        // overflow the stack through recursive Arc drops.
        let mut next = self.head.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_does_not_mutate_parent() {
        let base = Chain::new().push(1);
        let left = base.push(2);
        let right = base.push(3);

        assert_eq!(base.iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(left.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(right.iter().copied().collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn find_prefers_newest() {
        let chain = Chain::new().push(("a", 1)).push(("b", 2)).push(("a", 3));
        assert_eq!(chain.find(|(k, _)| *k == "a"), Some(&("a", 3)));
        assert_eq!(chain.find(|(k, _)| *k == "b"), Some(&("b", 2)));
        assert_eq!(chain.find(|(k, _)| *k == "c"), None);
    }

    #[test]
    fn len_and_empty() {
        let chain: Chain<u8> = Chain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);

        let chain = chain.push(1).push(2);
        assert!(!chain.is_empty());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.head(), Some(&2));
    }

    #[test]
    fn ptr_eq_tracks_identity() {
        let a = Chain::new().push(1);
        let b = a.clone();
        let c = Chain::new().push(1);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn long_chain_drops_without_overflow() {
        let mut chain = Chain::new();
        for i in 0..200_000u32 {
            chain = chain.push(i);
        }
        assert_eq!(chain.len(), 200_000);
        drop(chain);
    }
}
