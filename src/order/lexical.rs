//! Lexicographic orders over strings.
//!
//! Both orders pack the characters following an offset into the 32-bit
//! index, most significant first, padding with zero so that a shorter string
//! sorts before a longer one sharing its prefix. Their sub-order advances the
//! offset, which lets a sparse map descend through long keys one index at a
//! time instead of comparing whole strings at every level.

use std::cmp::Ordering;

use super::{intern, Order, OrderRef};

/// Packs fixed-width codes from the most significant bit down.
struct Packer {
    index: u32,
    free: u32,
}

impl Packer {
    fn new() -> Self {
        Self { index: 0, free: 32 }
    }

    #[inline]
    fn fits(&self, width: u32) -> bool {
        self.free >= width
    }

    #[inline]
    fn push(&mut self, code: u32, width: u32) {
        debug_assert!(self.fits(width) && u64::from(code) < 1u64 << width);
        self.free -= width;
        self.index |= code << self.free;
    }
}

// =============================================================================
// Lexical (UTF-8 bytes)
// =============================================================================

/// Byte-wise lexicographic order, identical to `str::cmp`.
///
/// Four UTF-8 bytes per index, each stored as `byte + 1` so the zero code is
/// left for padding. UTF-8 never uses `0xFF`, so the mapping is exact.
#[derive(Debug, Clone, Copy)]
pub struct LexicalOrder {
    offset: usize,
}

impl LexicalOrder {
    pub const BYTES_PER_INDEX: usize = 4;

    pub(crate) fn at(offset: usize) -> Self {
        Self { offset }
    }

    /// Byte offset of the first packed byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    fn tail<'s>(&self, value: &'s str) -> &'s [u8] {
        value.as_bytes().get(self.offset..).unwrap_or(&[])
    }
}

impl<T: AsRef<str> + ?Sized> Order<T> for LexicalOrder {
    fn index_of(&self, value: &T) -> u32 {
        let tail = self.tail(value.as_ref());
        let mut packer = Packer::new();
        for i in 0..Self::BYTES_PER_INDEX {
            let code = tail.get(i).map_or(0, |&b| u32::from(b) + 1);
            packer.push(code, 8);
        }
        packer.index
    }

    fn compare(&self, left: &T, right: &T) -> Ordering {
        self.tail(left.as_ref()).cmp(self.tail(right.as_ref()))
    }

    fn are_equal(&self, left: &T, right: &T) -> bool {
        let (left, right) = (left.as_ref(), right.as_ref());
        // Differences sit near the end more often than at the offset.
        left.len() == right.len() && self.tail(left).iter().rev().eq(self.tail(right).iter().rev())
    }

    fn sub_order(&self, value: &T) -> Option<OrderRef<T>> {
        let next = self.offset + Self::BYTES_PER_INDEX;
        if value.as_ref().len() <= next {
            return None;
        }
        Some(intern::table().lexical(next))
    }
}

// =============================================================================
// Case-insensitive (5-bit letter frequency codes)
// =============================================================================

/// Simple upper-case folding; characters whose upper case is not a single
/// character are kept as is.
#[inline]
fn fold(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// 5-bit code of a folded character and whether other characters share it.
///
/// Codes are monotonic in character order. Digits and the most frequent
/// letters get a code of their own; punctuation, rare letters (merged with
/// their alphabetical neighbour) and everything past `Z` share codes.
fn letter_code(c: char) -> (u32, bool) {
    match c {
        c if c < '0' => (1, true),
        '0'..='9' => (2 + (c as u32 - '0' as u32), false),
        ':'..='@' => (12, true),
        'A' => (13, false),
        'B' | 'C' => (14, true),
        'D' => (15, false),
        'E' => (16, false),
        'F' | 'G' => (17, true),
        'H' => (18, false),
        'I' => (19, false),
        'J' | 'K' => (20, true),
        'L' => (21, false),
        'M' => (22, false),
        'N' => (23, false),
        'O' => (24, false),
        'P' | 'Q' => (25, true),
        'R' => (26, false),
        'S' => (27, false),
        'T' => (28, false),
        'U' => (29, false),
        'V'..='Z' => (30, true),
        _ => (31, true),
    }
}

/// How an index window ended; decides the sub-order.
enum Window {
    /// The string ended inside the window.
    Exhausted,
    /// Packing stopped after a shared code at this char position.
    Shared(usize),
    /// Every field holds an exact character; the next window starts here.
    Full(usize),
}

/// Case-insensitive lexicographic order.
///
/// Characters are folded to upper case and packed as 5-bit letter-frequency
/// codes, six per index. A shared code ends the window early (what follows it
/// would no longer be ordered consistently) and the next level restarts at
/// that character with its exact 21-bit code in the lead position.
#[derive(Debug, Clone, Copy)]
pub struct CaseInsensitiveOrder {
    offset: usize,
    exact_lead: bool,
}

impl CaseInsensitiveOrder {
    pub const CHARS_PER_INDEX: usize = 6;

    pub(crate) fn at(offset: usize, exact_lead: bool) -> Self {
        Self { offset, exact_lead }
    }

    /// Char offset of the first packed character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn folded<'s>(&self, value: &'s str) -> impl Iterator<Item = char> + 's {
        value.chars().skip(self.offset).map(fold)
    }

    fn window(&self, value: &str) -> (u32, Window) {
        let mut packer = Packer::new();
        let mut chars = self.folded(value);
        let mut position = self.offset;

        if self.exact_lead {
            match chars.next() {
                Some(c) => packer.push(c as u32 + 1, 21),
                None => return (0, Window::Exhausted),
            }
            position += 1;
        }

        while packer.fits(5) {
            let Some(c) = chars.next() else {
                return (packer.index, Window::Exhausted);
            };
            let (code, shared) = letter_code(c);
            packer.push(code, 5);
            if shared {
                return (packer.index, Window::Shared(position));
            }
            position += 1;
        }

        if chars.next().is_none() {
            (packer.index, Window::Exhausted)
        } else {
            (packer.index, Window::Full(position))
        }
    }
}

impl<T: AsRef<str> + ?Sized> Order<T> for CaseInsensitiveOrder {
    fn index_of(&self, value: &T) -> u32 {
        self.window(value.as_ref()).0
    }

    fn compare(&self, left: &T, right: &T) -> Ordering {
        self.folded(left.as_ref()).cmp(self.folded(right.as_ref()))
    }

    fn are_equal(&self, left: &T, right: &T) -> bool {
        self.folded(left.as_ref()).eq(self.folded(right.as_ref()))
    }

    fn sub_order(&self, value: &T) -> Option<OrderRef<T>> {
        match self.window(value.as_ref()).1 {
            Window::Exhausted => None,
            Window::Shared(position) => Some(intern::table().case_insensitive(position, true)),
            Window::Full(position) => Some(intern::table().case_insensitive(position, false)),
        }
    }
}
