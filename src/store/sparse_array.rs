//! Sparse array over the full `u32` index space.
//!
//! A fixed fan-out trie consuming the index four bits at a time from the most
//! significant end. A leaf keeps its full index and sits at the shallowest
//! depth where it is alone: it is pushed down one level only when another
//! index lands in the same slot, and a branch left with a single leaf is
//! collapsed back into that leaf. Children are visited in slot order, so
//! iteration is in ascending index order.

use std::fmt;
use std::iter::Rev;

use smallvec::SmallVec;

const BITS: u32 = 4;
const FANOUT: usize = 1 << BITS;
const DEPTH: usize = (u32::BITS / BITS) as usize;

/// Slot of `index` within a branch at `depth`.
#[inline]
fn chunk(index: u32, depth: usize) -> usize {
    debug_assert!(depth < DEPTH);
    ((index >> (u32::BITS - BITS * (depth as u32 + 1))) & (FANOUT as u32 - 1)) as usize
}

#[derive(Clone)]
enum Node<T> {
    Leaf(u32, T),
    Branch(Box<Branch<T>>),
}

#[derive(Clone)]
struct Branch<T> {
    children: [Option<Node<T>>; FANOUT],
    /// Number of occupied children.
    count: usize,
}

impl<T> Branch<T> {
    fn new() -> Self {
        Self {
            children: std::array::from_fn(|_| None),
            count: 0,
        }
    }

    fn first(&self) -> Option<&Node<T>> {
        self.children.iter().flatten().next()
    }

    fn last(&self) -> Option<&Node<T>> {
        self.children.iter().rev().flatten().next()
    }
}

impl<T> Node<T> {
    fn min(&self) -> (u32, &T) {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(index, value) => return (*index, value),
                Node::Branch(branch) => node = branch.first().expect("branches are never empty"),
            }
        }
    }

    fn max(&self) -> (u32, &T) {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(index, value) => return (*index, value),
                Node::Branch(branch) => node = branch.last().expect("branches are never empty"),
            }
        }
    }
}

/// A map from `u32` to `T`, ordered by index.
#[derive(Clone)]
pub struct SparseArray<T> {
    root: Option<Node<T>>,
    len: usize,
}

impl<T> Default for SparseArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SparseArray<T> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        let mut node = self.root.as_ref()?;
        let mut depth = 0;
        loop {
            match node {
                Node::Leaf(at, value) => return (*at == index).then_some(value),
                Node::Branch(branch) => {
                    node = branch.children[chunk(index, depth)].as_ref()?;
                    depth += 1;
                }
            }
        }
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        let mut node = self.root.as_mut()?;
        let mut depth = 0;
        loop {
            match node {
                Node::Leaf(at, value) => return (*at == index).then_some(value),
                Node::Branch(branch) => {
                    node = branch.children[chunk(index, depth)].as_mut()?;
                    depth += 1;
                }
            }
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    /// Sets the value at `index`, returning the previous one.
    pub fn insert(&mut self, index: u32, value: T) -> Option<T> {
        let mut slot = &mut self.root;
        let mut depth = 0;
        loop {
            match slot {
                None => {
                    *slot = Some(Node::Leaf(index, value));
                    self.len += 1;
                    return None;
                }
                Some(Node::Leaf(at, existing)) if *at == index => {
                    return Some(std::mem::replace(existing, value));
                }
                Some(Node::Leaf(..)) => {
                    // Push the resident leaf one level down and retry here.
                    let Some(Node::Leaf(at, existing)) = slot.take() else {
                        unreachable!()
                    };
                    let mut branch = Branch::new();
                    branch.children[chunk(at, depth)] = Some(Node::Leaf(at, existing));
                    branch.count = 1;
                    *slot = Some(Node::Branch(Box::new(branch)));
                }
                Some(Node::Branch(branch)) => {
                    let child = chunk(index, depth);
                    if branch.children[child].is_none() {
                        branch.count += 1;
                    }
                    slot = &mut branch.children[child];
                    depth += 1;
                }
            }
        }
    }

    /// Removes the value at `index`.
    pub fn remove(&mut self, index: u32) -> Option<T> {
        let removed = Self::remove_from(&mut self.root, index, 0)?;
        self.len -= 1;
        Some(removed)
    }

    // Recursion is bounded by the trie height.
    fn remove_from(slot: &mut Option<Node<T>>, index: u32, depth: usize) -> Option<T> {
        let removed = match slot {
            None => return None,
            Some(Node::Leaf(at, _)) => {
                if *at != index {
                    return None;
                }
                let Some(Node::Leaf(_, value)) = slot.take() else {
                    unreachable!()
                };
                return Some(value);
            }
            Some(Node::Branch(branch)) => {
                let child = &mut branch.children[chunk(index, depth)];
                let removed = Self::remove_from(child, index, depth + 1)?;
                if child.is_none() {
                    branch.count -= 1;
                }
                removed
            }
        };
        Self::collapse(slot);
        Some(removed)
    }

    /// Replaces a branch holding a single leaf by that leaf, and drops an
    /// empty branch.
    fn collapse(slot: &mut Option<Node<T>>) {
        let Some(Node::Branch(branch)) = slot else {
            return;
        };
        match branch.count {
            0 => *slot = None,
            1 => {
                let only = branch
                    .children
                    .iter_mut()
                    .find(|child| child.is_some())
                    .expect("count matches occupied children");
                if matches!(only, Some(Node::Leaf(..))) {
                    *slot = only.take();
                }
            }
            _ => {}
        }
    }

    /// Keeps only the values for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(u32, &mut T) -> bool) {
        let removed = Self::retain_in(&mut self.root, &mut keep);
        self.len -= removed;
    }

    fn retain_in(slot: &mut Option<Node<T>>, keep: &mut impl FnMut(u32, &mut T) -> bool) -> usize {
        let removed = match slot {
            None => 0,
            Some(Node::Leaf(at, value)) => {
                if keep(*at, value) {
                    return 0;
                }
                *slot = None;
                return 1;
            }
            Some(Node::Branch(branch)) => {
                let mut removed = 0;
                for child in branch.children.iter_mut() {
                    if child.is_some() {
                        removed += Self::retain_in(child, keep);
                        if child.is_none() {
                            branch.count -= 1;
                        }
                    }
                }
                removed
            }
        };
        Self::collapse(slot);
        removed
    }

    pub fn first(&self) -> Option<(u32, &T)> {
        self.root.as_ref().map(Node::min)
    }

    pub fn last(&self) -> Option<(u32, &T)> {
        self.root.as_ref().map(Node::max)
    }

    /// Entry with the smallest index `>= index`.
    pub fn ceiling(&self, index: u32) -> Option<(u32, &T)> {
        let mut node = self.root.as_ref()?;
        let mut depth = 0;
        // Subtree whose minimum is the best answer found so far.
        let mut next: Option<&Node<T>> = None;
        loop {
            match node {
                Node::Leaf(at, value) if *at >= index => return Some((*at, value)),
                Node::Leaf(..) => break,
                Node::Branch(branch) => {
                    let child = chunk(index, depth);
                    if let Some(sibling) = branch.children[child + 1..].iter().flatten().next() {
                        next = Some(sibling);
                    }
                    match &branch.children[child] {
                        Some(below) => node = below,
                        None => break,
                    }
                    depth += 1;
                }
            }
        }
        next.map(Node::min)
    }

    /// Entry with the largest index `<= index`.
    pub fn floor(&self, index: u32) -> Option<(u32, &T)> {
        let mut node = self.root.as_ref()?;
        let mut depth = 0;
        let mut previous: Option<&Node<T>> = None;
        loop {
            match node {
                Node::Leaf(at, value) if *at <= index => return Some((*at, value)),
                Node::Leaf(..) => break,
                Node::Branch(branch) => {
                    let child = chunk(index, depth);
                    if let Some(sibling) = branch.children[..child].iter().rev().flatten().next() {
                        previous = Some(sibling);
                    }
                    match &branch.children[child] {
                        Some(below) => node = below,
                        None => break,
                    }
                    depth += 1;
                }
            }
        }
        previous.map(Node::max)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            stack: SmallVec::new(),
            pending: self.root.as_ref(),
        }
    }

    /// Iterates entries with index `>= index` in ascending order.
    pub fn iter_from(&self, index: u32) -> Iter<'_, T> {
        let mut iter = Iter {
            stack: SmallVec::new(),
            pending: None,
        };
        let mut node = self.root.as_ref();
        let mut depth = 0;
        while let Some(current) = node {
            match current {
                Node::Leaf(at, _) => {
                    if *at >= index {
                        iter.pending = Some(current);
                    }
                    break;
                }
                Node::Branch(branch) => {
                    let child = chunk(index, depth);
                    iter.stack.push(branch.children[child + 1..].iter());
                    node = branch.children[child].as_ref();
                    depth += 1;
                }
            }
        }
        iter
    }

    pub fn iter_rev(&self) -> IterRev<'_, T> {
        IterRev {
            stack: SmallVec::new(),
            pending: self.root.as_ref(),
        }
    }

    /// Iterates entries with index `<= index` in descending order.
    pub fn iter_back_from(&self, index: u32) -> IterRev<'_, T> {
        let mut iter = IterRev {
            stack: SmallVec::new(),
            pending: None,
        };
        let mut node = self.root.as_ref();
        let mut depth = 0;
        while let Some(current) = node {
            match current {
                Node::Leaf(at, _) => {
                    if *at <= index {
                        iter.pending = Some(current);
                    }
                    break;
                }
                Node::Branch(branch) => {
                    let child = chunk(index, depth);
                    iter.stack.push(branch.children[..child].iter().rev());
                    node = branch.children[child].as_ref();
                    depth += 1;
                }
            }
        }
        iter
    }
}

impl<T: fmt::Debug> fmt::Debug for SparseArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Ascending iterator over `(index, &value)`.
pub struct Iter<'a, T> {
    /// Remaining siblings per level, deepest last.
    stack: SmallVec<[std::slice::Iter<'a, Option<Node<T>>>; DEPTH]>,
    pending: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (u32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.pending.take() {
                match node {
                    Node::Leaf(index, value) => return Some((*index, value)),
                    Node::Branch(branch) => self.stack.push(branch.children.iter()),
                }
            }
            let siblings = self.stack.last_mut()?;
            match siblings.next() {
                Some(child) => self.pending = child.as_ref(),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Descending iterator over `(index, &value)`.
pub struct IterRev<'a, T> {
    stack: SmallVec<[Rev<std::slice::Iter<'a, Option<Node<T>>>>; DEPTH]>,
    pending: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for IterRev<'a, T> {
    type Item = (u32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.pending.take() {
                match node {
                    Node::Leaf(index, value) => return Some((*index, value)),
                    Node::Branch(branch) => self.stack.push(branch.children.iter().rev()),
                }
            }
            let siblings = self.stack.last_mut()?;
            match siblings.next() {
                Some(child) => self.pending = child.as_ref(),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl<'a, T> IntoIterator for &'a SparseArray<T> {
    type Item = (u32, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Consuming ascending iterator.
pub struct IntoIter<T> {
    stack: Vec<std::array::IntoIter<Option<Node<T>>, FANOUT>>,
    pending: Option<Node<T>>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = (u32, T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.pending.take() {
                match node {
                    Node::Leaf(index, value) => return Some((index, value)),
                    Node::Branch(branch) => self.stack.push(branch.children.into_iter()),
                }
            }
            let siblings = self.stack.last_mut()?;
            match siblings.next() {
                Some(child) => self.pending = child,
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl<T> IntoIterator for SparseArray<T> {
    type Item = (u32, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            stack: Vec::new(),
            pending: self.root,
        }
    }
}
