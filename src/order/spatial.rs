//! Morton (Z-order) orders over unsigned coordinates.
//!
//! Coordinates are bit-interleaved into one code, `x` most significant. The
//! code is wider than an index, so the top 32 bits form the level-0 index and
//! each sub-order exposes the next 32 bits.

use std::cmp::Ordering;

use super::{intern, Order, OrderRef};

/// Spreads the bits of `v` so that bit `i` lands at bit `2 * i`.
#[inline]
fn spread2(v: u32) -> u64 {
    let mut v = u64::from(v);
    v = (v | (v << 16)) & 0x0000_FFFF_0000_FFFF;
    v = (v | (v << 8)) & 0x00FF_00FF_00FF_00FF;
    v = (v | (v << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    v = (v | (v << 2)) & 0x3333_3333_3333_3333;
    v = (v | (v << 1)) & 0x5555_5555_5555_5555;
    v
}

/// Spreads the bits of `v` so that bit `i` lands at bit `3 * i`.
#[inline]
fn spread3(v: u32) -> u128 {
    let v = u128::from(v);
    (0..32).fold(0, |code, bit| code | ((v >> bit) & 1) << (3 * bit))
}

#[inline]
fn morton2(&(x, y): &(u32, u32)) -> u64 {
    spread2(x) << 1 | spread2(y)
}

#[inline]
fn morton3(&(x, y, z): &(u32, u32, u32)) -> u128 {
    spread3(x) << 2 | spread3(y) << 1 | spread3(z)
}

/// Two-dimensional Morton order, one 32-bit slice of the 64-bit code per
/// level.
#[derive(Debug, Clone, Copy)]
pub struct QuadtreeOrder {
    level: usize,
}

impl QuadtreeOrder {
    pub const LEVELS: usize = 2;

    pub(crate) fn at_level(level: usize) -> Self {
        assert!(level < Self::LEVELS, "quadtree level {level} out of range");
        Self { level }
    }
}

impl Order<(u32, u32)> for QuadtreeOrder {
    #[inline]
    fn index_of(&self, value: &(u32, u32)) -> u32 {
        (morton2(value) >> (32 * (Self::LEVELS - 1 - self.level))) as u32
    }

    fn compare(&self, left: &(u32, u32), right: &(u32, u32)) -> Ordering {
        morton2(left).cmp(&morton2(right))
    }

    fn are_equal(&self, left: &(u32, u32), right: &(u32, u32)) -> bool {
        left == right
    }

    fn sub_order(&self, _value: &(u32, u32)) -> Option<OrderRef<(u32, u32)>> {
        (self.level + 1 < Self::LEVELS).then(|| intern::table().quadtree(self.level + 1))
    }
}

/// Three-dimensional Morton order, one 32-bit slice of the 96-bit code per
/// level.
#[derive(Debug, Clone, Copy)]
pub struct OctreeOrder {
    level: usize,
}

impl OctreeOrder {
    pub const LEVELS: usize = 3;

    pub(crate) fn at_level(level: usize) -> Self {
        assert!(level < Self::LEVELS, "octree level {level} out of range");
        Self { level }
    }
}

impl Order<(u32, u32, u32)> for OctreeOrder {
    #[inline]
    fn index_of(&self, value: &(u32, u32, u32)) -> u32 {
        (morton3(value) >> (32 * (Self::LEVELS - 1 - self.level))) as u32
    }

    fn compare(&self, left: &(u32, u32, u32), right: &(u32, u32, u32)) -> Ordering {
        morton3(left).cmp(&morton3(right))
    }

    fn are_equal(&self, left: &(u32, u32, u32), right: &(u32, u32, u32)) -> bool {
        left == right
    }

    fn sub_order(&self, _value: &(u32, u32, u32)) -> Option<OrderRef<(u32, u32, u32)>> {
        (self.level + 1 < Self::LEVELS).then(|| intern::table().octree(self.level + 1))
    }
}
