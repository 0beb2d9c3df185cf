//! Doubly-linked list
//!
//! The queue substrate of the kernel. Nodes live in an index arena and link
//! to each other by slot number, so removal in the middle of a scan never
//! invalidates the cursor: the successor is read before a node is unlinked.
//!
//! The list is not synchronised. The manager owns every instance and wraps
//! all access in its queue lock.

use std::fmt;

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly-linked sequence used as a FIFO and as a scan target
pub struct List<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> List<T> {
    /// Creates an empty list
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` at the end
    pub fn push(&mut self, value: T) {
        let slot = self.alloc(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.set_next(tail, Some(slot)),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
    }

    /// Inserts `value` before the element currently at `index`
    ///
    /// Index 0 makes `value` the new head. An index at or past the end
    /// appends.
    pub fn push_at(&mut self, index: usize, value: T) {
        let Some(at) = self.slot_at(index) else {
            self.push(value);
            return;
        };

        let prev = self.node(at).and_then(|node| node.prev);
        let slot = self.alloc(Node {
            value,
            prev,
            next: Some(at),
        });
        self.set_prev(at, Some(slot));
        match prev {
            Some(prev) => self.set_next(prev, Some(slot)),
            None => self.head = Some(slot),
        }
        self.len += 1;
    }

    /// Removes and returns the head element
    pub fn pop(&mut self) -> Option<T> {
        let head = self.head?;
        self.unlink(head)
    }

    /// Removes and returns the element at `index`
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        let slot = self.slot_at(index)?;
        self.unlink(slot)
    }

    /// Removes every element matching `predicate` in one traversal
    ///
    /// Returns the number of elements removed.
    pub fn delete_if<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let Some(node) = self.node(slot) else {
                break;
            };
            cursor = node.next;
            if predicate(&node.value) && self.unlink(slot).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Returns the head element
    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|slot| self.node(slot)).map(|node| &node.value)
    }

    /// Returns the tail element
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|slot| self.node(slot)).map(|node| &node.value)
    }

    /// Iterates head to tail
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Visits every element head to tail without mutating
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&T),
    {
        self.iter().for_each(f);
    }

    /// Returns the first element matching `predicate`
    pub fn find<F>(&self, mut predicate: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.iter().find(|value| predicate(value))
    }

    /// Removes every element
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn node(&self, slot: usize) -> Option<&Node<T>> {
        self.nodes.get(slot).and_then(Option::as_ref)
    }

    fn set_next(&mut self, slot: usize, next: Option<usize>) {
        if let Some(Some(node)) = self.nodes.get_mut(slot) {
            node.next = next;
        }
    }

    fn set_prev(&mut self, slot: usize, prev: Option<usize>) {
        if let Some(Some(node)) = self.nodes.get_mut(slot) {
            node.prev = prev;
        }
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn slot_at(&self, index: usize) -> Option<usize> {
        if index >= self.len {
            return None;
        }
        let mut cursor = self.head;
        for _ in 0..index {
            cursor = cursor.and_then(|slot| self.node(slot)).and_then(|node| node.next);
        }
        cursor
    }

    fn unlink(&mut self, slot: usize) -> Option<T> {
        let node = self.nodes.get_mut(slot)?.take()?;
        match node.prev {
            Some(prev) => self.set_next(prev, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.set_prev(next, node.prev),
            None => self.tail = node.prev,
        }
        self.free.push(slot);
        self.len -= 1;
        Some(node.value)
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = List::new();
        for value in iter {
            list.push(value);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Head-to-tail iterator over a [`List`]
pub struct Iter<'a, T> {
    list: &'a List<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent<T>(list: &List<T>) {
        let forward = list.iter().count();
        assert_eq!(forward, list.len());
        assert_eq!(list.head.is_none(), list.len() == 0);
        assert_eq!(list.tail.is_none(), list.len() == 0);

        let mut backward = 0;
        let mut cursor = list.tail;
        while let Some(slot) = cursor {
            backward += 1;
            cursor = list.node(slot).unwrap().prev;
        }
        assert_eq!(backward, list.len());
    }

    fn values(list: &List<i32>) -> Vec<i32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_push_pop_fifo() {
        let mut list = List::new();
        list.push(1);
        list.push(2);
        list.push(3);
        assert_eq!(list.len(), 3);
        assert_eq!(list.pop(), Some(1));
        assert_eq!(list.pop(), Some(2));
        assert_eq!(list.pop(), Some(3));
        assert_eq!(list.pop(), None);
        assert!(list.is_empty());
        assert_consistent(&list);
    }

    #[test]
    fn test_pop_empty_is_none() {
        let mut list: List<i32> = List::new();
        assert_eq!(list.pop(), None);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_push_at_head_middle_and_past_end() {
        let mut list: List<i32> = [2, 4].into_iter().collect();
        list.push_at(0, 1);
        list.push_at(2, 3);
        list.push_at(99, 5);
        assert_eq!(values(&list), vec![1, 2, 3, 4, 5]);
        assert_eq!(list.front(), Some(&1));
        assert_eq!(list.back(), Some(&5));
        assert_consistent(&list);
    }

    #[test]
    fn test_push_at_on_empty_list() {
        let mut list = List::new();
        list.push_at(0, 7);
        assert_eq!(values(&list), vec![7]);
        assert_consistent(&list);
    }

    #[test]
    fn test_delete_if_head() {
        let mut list: List<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(list.delete_if(|v| *v == 1), 1);
        assert_eq!(values(&list), vec![2, 3]);
        assert_eq!(list.front(), Some(&2));
        assert_consistent(&list);
    }

    #[test]
    fn test_delete_if_tail() {
        let mut list: List<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(list.delete_if(|v| *v == 3), 1);
        assert_eq!(values(&list), vec![1, 2]);
        assert_eq!(list.back(), Some(&2));
        assert_consistent(&list);
    }

    #[test]
    fn test_delete_if_singleton() {
        let mut list: List<i32> = [9].into_iter().collect();
        assert_eq!(list.delete_if(|_| true), 1);
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_consistent(&list);

        list.push(10);
        assert_eq!(values(&list), vec![10]);
        assert_consistent(&list);
    }

    #[test]
    fn test_delete_if_adjacent_matches() {
        let mut list: List<i32> = [1, 2, 2, 3, 2].into_iter().collect();
        assert_eq!(list.delete_if(|v| *v == 2), 3);
        assert_eq!(values(&list), vec![1, 3]);
        assert_consistent(&list);
    }

    #[test]
    fn test_delete_if_no_match() {
        let mut list: List<i32> = [1, 2].into_iter().collect();
        assert_eq!(list.delete_if(|v| *v > 5), 0);
        assert_eq!(values(&list), vec![1, 2]);
    }

    #[test]
    fn test_remove_at() {
        let mut list: List<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(list.remove_at(1), Some(2));
        assert_eq!(list.remove_at(5), None);
        assert_eq!(values(&list), vec![1, 3]);
        assert_consistent(&list);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = List::new();
        for round in 0..10 {
            list.push(round);
            list.push(round + 100);
            list.pop();
            list.pop();
        }
        assert!(list.nodes.len() <= 2);
        assert_consistent(&list);
    }

    #[test]
    fn test_for_each_visits_in_order() {
        let list: List<i32> = [3, 1, 2].into_iter().collect();
        let mut seen = Vec::new();
        list.for_each(|v| seen.push(*v));
        assert_eq!(seen, vec![3, 1, 2]);
    }

    #[test]
    fn test_find_and_clear() {
        let mut list: List<i32> = [5, 6, 7].into_iter().collect();
        assert_eq!(list.find(|v| v % 2 == 0), Some(&6));
        list.clear();
        assert!(list.is_empty());
        assert_consistent(&list);
    }
}
