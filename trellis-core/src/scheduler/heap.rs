//! Binary Min-Heap
//!
//! An array-backed binary heap: the children of slot `i` are `2i + 1` and
//! `2i + 2`, and every parent compares less than or equal to its children.

/// A min-heap over any totally ordered element.
#[derive(Debug)]
pub struct MinHeap<T> {
    items: Vec<T>,
}

impl<T: Ord> MinHeap<T> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the heap is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The smallest element, if any.
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Append `item` and sift it up while its parent compares greater.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
        let mut index = self.items.len() - 1;
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.items[parent] <= self.items[index] {
                break;
            }
            self.items.swap(parent, index);
            index = parent;
        }
    }

    /// Remove the smallest element: swap the root with the last element,
    /// shrink, then sift the new root down toward its smaller child.
    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();

        let len = self.items.len();
        let mut index = 0;
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            if left >= len {
                break;
            }
            let smaller = if right < len && self.items[right] < self.items[left] {
                right
            } else {
                left
            };
            if self.items[smaller] >= self.items[index] {
                break;
            }
            self.items.swap(smaller, index);
            index = smaller;
        }
        top
    }

    /// Whether every parent is `<=` its children.
    pub fn is_valid(&self) -> bool {
        (1..self.items.len()).all(|i| self.items[(i - 1) / 2] <= self.items[i])
    }
}

impl<T: Ord> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}
