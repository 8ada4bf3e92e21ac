use super::*;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::order::{Order, OrderRef};

/// Collides on the high bits and refines with the exact value.
struct Coarse;

impl Order<u32> for Coarse {
    fn index_of(&self, value: &u32) -> u32 {
        value >> 4
    }

    fn compare(&self, left: &u32, right: &u32) -> Ordering {
        left.cmp(right)
    }

    fn sub_order(&self, _value: &u32) -> Option<OrderRef<u32>> {
        Some(order::index())
    }
}

/// Collides on the high bits with nothing to refine: sorted buckets.
struct Bucketed;

impl Order<u32> for Bucketed {
    fn index_of(&self, value: &u32) -> u32 {
        value >> 4
    }

    fn compare(&self, left: &u32, right: &u32) -> Ordering {
        left.cmp(right)
    }
}

fn key_orders() -> Vec<OrderRef<u32>> {
    vec![order::index(), Arc::new(Coarse), Arc::new(Bucketed)]
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 4)]
    Insert(#[proptest(strategy = "0u32..512")] u32, u8),
    #[proptest(weight = 2)]
    Remove(#[proptest(strategy = "0u32..512")] u32),
    Get(#[proptest(strategy = "0u32..512")] u32),
    Ceiling(#[proptest(strategy = "0u32..512")] u32),
    Higher(#[proptest(strategy = "0u32..512")] u32),
    Floor(#[proptest(strategy = "0u32..512")] u32),
    Lower(#[proptest(strategy = "0u32..512")] u32),
    RetainOdd,
}

fn check_map_model(order: OrderRef<u32>, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut map = FastMap::with_order(order);
    let mut model = BTreeMap::new();

    for op in ops {
        match *op {
            Op::Insert(key, value) => {
                prop_assert_eq!(map.insert(key, value), model.insert(key, value));
            }
            Op::Remove(key) => {
                prop_assert_eq!(map.remove(&key), model.remove(&key));
            }
            Op::Get(key) => {
                prop_assert_eq!(map.get(&key), model.get(&key));
            }
            Op::Ceiling(key) => {
                prop_assert_eq!(map.ceiling_entry(&key), model.range(key..).next());
            }
            Op::Higher(key) => {
                let expected = model.range((Bound::Excluded(key), Bound::Unbounded)).next();
                prop_assert_eq!(map.higher_entry(&key), expected);
            }
            Op::Floor(key) => {
                prop_assert_eq!(map.floor_entry(&key), model.range(..=key).next_back());
            }
            Op::Lower(key) => {
                prop_assert_eq!(map.lower_entry(&key), model.range(..key).next_back());
            }
            Op::RetainOdd => {
                map.retain(|_, value| *value % 2 == 1);
                model.retain(|_, value| *value % 2 == 1);
            }
        }

        prop_assert_eq!(map.len(), model.len());
    }

    prop_assert_eq!(map.first_entry(), model.iter().next());
    prop_assert_eq!(map.last_entry(), model.iter().next_back());
    prop_assert!(map.iter().eq(model.iter()));
    Ok(())
}

/// One wrapper in a randomly built view chain over an `i32` table.
#[derive(Clone, Debug, Arbitrary)]
enum Layer {
    #[proptest(weight = 3)]
    Range(
        #[proptest(strategy = "-40i32..40")] i32,
        #[proptest(strategy = "-40i32..40")] i32,
    ),
    Distinct,
    Negate,
    Modulo(#[proptest(strategy = "1i32..6")] i32),
    Even,
    Reversed,
    Unmodifiable,
}

impl Layer {
    fn wrap<'a>(&self, view: View<'a, i32>) -> View<'a, i32> {
        match *self {
            Layer::Range(lo, hi) => view.range(Bound::Included(lo), Bound::Excluded(hi)),
            Layer::Distinct => view.distinct(),
            Layer::Negate => view.map(|x| -x, order::natural()),
            Layer::Modulo(m) => view.map(move |x| x % m, order::natural()),
            Layer::Even => view.filter(|x| x % 2 == 0),
            Layer::Reversed => view.reversed(),
            Layer::Unmodifiable => view.unmodifiable(),
        }
    }

    /// The same wrapper applied to the expected iteration sequence.
    fn apply(&self, model: Vec<i32>) -> Vec<i32> {
        match *self {
            Layer::Range(lo, hi) => model.into_iter().filter(|v| lo <= *v && *v < hi).collect(),
            Layer::Distinct => {
                let mut seen = BTreeSet::new();
                model.into_iter().filter(|v| seen.insert(*v)).collect()
            }
            Layer::Negate => model.into_iter().map(|v| -v).collect(),
            Layer::Modulo(m) => model.into_iter().map(|v| v % m).collect(),
            Layer::Even => model.into_iter().filter(|v| v % 2 == 0).collect(),
            Layer::Reversed => model.into_iter().rev().collect(),
            Layer::Unmodifiable => model,
        }
    }
}

fn check_view_model(view: &View<'_, i32>, model: &[i32]) -> Result<(), TestCaseError> {
    prop_assert_eq!(view.to_vec(), model.to_vec());
    prop_assert_eq!(view.len(), model.len());
    prop_assert_eq!(view.is_empty(), model.is_empty());
    for (i, value) in model.iter().enumerate() {
        prop_assert_eq!(view.get(i), Ok(*value));
    }
    prop_assert_eq!(
        view.get(model.len()),
        Err(Error::IndexOutOfBounds { index: model.len(), len: model.len() })
    );
    prop_assert!(view.iter_rev().eq(model.iter().rev().copied()));
    for needle in (-42..42).step_by(3) {
        prop_assert_eq!(view.contains(&needle), model.contains(&needle));
        prop_assert_eq!(view.rank(&needle, false), model.iter().filter(|v| **v < needle).count());
        prop_assert_eq!(view.rank(&needle, true), model.iter().filter(|v| **v <= needle).count());
        prop_assert!(view
            .iter_from(Bound::Included(&needle))
            .eq(model.iter().copied().filter(|v| *v >= needle)));
        prop_assert!(view
            .iter_back_from(Bound::Excluded(&needle))
            .eq(model.iter().rev().copied().filter(|v| *v < needle)));
    }
    Ok(())
}

/// Checks the order contract on `x`, `y` and down the sub-order chain for as
/// long as they collide.
fn check_contract<T: ?Sized>(order: OrderRef<T>, x: &T, y: &T) -> Result<(), TestCaseError> {
    let mut current = Some(order);
    while let Some(order) = current {
        let (ix, iy) = (order.index_of(x), order.index_of(y));
        let ordering = order.compare(x, y);
        if order.are_equal(x, y) {
            prop_assert_eq!(ordering, Ordering::Equal);
        }
        if ordering == Ordering::Equal {
            prop_assert_eq!(ix, iy);
        }
        if ix < iy {
            prop_assert_eq!(ordering, Ordering::Less);
        }
        if ix != iy {
            break;
        }
        current = order.sub_order(x).or_else(|| order.sub_order(y));
    }
    Ok(())
}

fn morton2(x: u32, y: u32) -> u64 {
    (0..32).fold(0, |code, bit| {
        let xb = u64::from(x >> bit & 1);
        let yb = u64::from(y >> bit & 1);
        code | xb << (2 * bit + 1) | yb << (2 * bit)
    })
}

fn words() -> impl Strategy<Value = String> {
    // Small alphabet with shared case-insensitive codes, to force collisions.
    "[abcAB0_é]{0,12}"
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_map_matches_btreemap(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        for order in key_orders() {
            check_map_model(order, &ops)?;
        }
    }

    #[test]
    fn prop_table_matches_sorted_vec(values in prop::collection::vec(0i32..32, 0..64), removals in prop::collection::vec(0i32..32, 0..32)) {
        let mut table = FastTable::new();
        let mut model: Vec<i32> = Vec::new();
        for value in values {
            let slot = table.add(value);
            prop_assert_eq!(slot, model.partition_point(|v| *v < value));
            model.insert(slot, value);
        }
        for value in removals {
            let expected = model.iter().position(|v| *v == value).map(|i| model.remove(i));
            prop_assert_eq!(table.remove(&value), expected);
        }
        prop_assert_eq!(table.as_slice(), model.as_slice());
    }

    #[test]
    fn prop_range_view_matches_filter(values in prop::collection::vec(0i32..50, 0..40), lo in 0i32..50, hi in 0i32..50) {
        let table: FastTable<i32> = values.into_iter().collect();
        let expected: Vec<i32> = table.iter().copied().filter(|v| lo <= *v && *v < hi).collect();
        let view = table.view().range(Bound::Included(lo), Bound::Excluded(hi));
        prop_assert_eq!(view.to_vec(), expected.clone());
        prop_assert_eq!(view.len(), expected.len());
        for (i, value) in expected.iter().enumerate() {
            prop_assert_eq!(view.get(i), Ok(*value));
        }
        prop_assert!(view.get(expected.len()).is_err());
        prop_assert_eq!(view.rank(&hi, false), expected.len());
    }

    #[test]
    fn prop_view_stacks_match_model(values in prop::collection::vec(-20i32..40, 0..40), layers in prop::collection::vec(any::<Layer>(), 0..5)) {
        let table: FastTable<i32> = values.into_iter().collect();
        let view = layers.iter().fold(table.view(), |view, layer| layer.wrap(view));
        let model = layers.iter().fold(table.as_slice().to_vec(), |model, layer| layer.apply(model));
        check_view_model(&view, &model)?;
    }

    #[test]
    fn prop_lexical_contract(x in "\\PC{0,10}", y in "\\PC{0,10}") {
        let o = order::lexical::<str>();
        prop_assert_eq!(o.compare(x.as_str(), y.as_str()), x.cmp(&y));
        prop_assert_eq!(o.are_equal(x.as_str(), y.as_str()), x == y);
        check_contract(o, x.as_str(), y.as_str())?;
    }

    #[test]
    fn prop_lexical_contract_on_collisions(x in words(), y in words()) {
        check_contract(order::lexical::<str>(), x.as_str(), y.as_str())?;
        check_contract(order::lexical_case_insensitive::<str>(), x.as_str(), y.as_str())?;
    }

    #[test]
    fn prop_case_insensitive_contract(x in "\\PC{0,14}", y in "\\PC{0,14}") {
        check_contract(order::lexical_case_insensitive::<str>(), x.as_str(), y.as_str())?;
    }

    #[test]
    fn prop_case_insensitive_ignores_ascii_case(s in "[a-zA-Z0-9 ]{0,16}") {
        let o = order::lexical_case_insensitive::<str>();
        let upper = s.to_ascii_uppercase();
        prop_assert!(o.are_equal(s.as_str(), upper.as_str()));
        prop_assert_eq!(o.index_of(s.as_str()), o.index_of(upper.as_str()));
    }

    #[test]
    fn prop_spatial_contract(a in any::<(u32, u32, u32)>(), b in any::<(u32, u32, u32)>()) {
        check_contract(order::quadtree(), &(a.0, a.1), &(b.0, b.1))?;
        check_contract(order::octree(), &a, &b)?;
        // Same high bits, to reach the finer levels.
        let near = (a.0 ^ (b.0 & 0xFF), a.1 ^ (b.1 & 0xFF), a.2 ^ (b.2 & 0xFF));
        check_contract(order::quadtree(), &(a.0, a.1), &(near.0, near.1))?;
        check_contract(order::octree(), &a, &near)?;
    }

    #[test]
    fn prop_hash_contract(x in any::<u64>(), y in any::<u64>()) {
        check_contract(order::hash::<u64>(), &x, &y)?;
        check_contract(order::hash::<u64>(), &x, &x)?;
    }

    #[test]
    fn prop_lexical_set_iterates_sorted(list in prop::collection::vec(words(), 0..60)) {
        let set: FastSet<String> = {
            let mut set = FastSet::with_order(order::lexical());
            set.extend(list.iter().cloned());
            set
        };
        let model: BTreeSet<String> = list.into_iter().collect();
        prop_assert_eq!(set.len(), model.len());
        prop_assert!(set.iter().eq(model.iter()));
    }

    #[test]
    fn prop_case_insensitive_set_folds(list in prop::collection::vec("[a-dA-D0-9_ ]{0,9}", 0..60)) {
        let mut set = FastSet::with_order(order::lexical_case_insensitive::<String>());
        set.extend(list.iter().cloned());
        let model: BTreeSet<String> = list.iter().map(|w| w.to_ascii_uppercase()).collect();
        prop_assert_eq!(set.len(), model.len());
        prop_assert!(set.iter().map(|w| w.to_ascii_uppercase()).eq(model.into_iter()));
    }

    #[test]
    fn prop_quadtree_set_iterates_in_morton_order(points in prop::collection::vec((0u32..64, 0u32..64), 0..80)) {
        let mut set = FastSet::with_order(order::quadtree());
        set.extend(points.iter().copied());
        let model: BTreeMap<u64, (u32, u32)> = points.iter().map(|&(x, y)| (morton2(x, y), (x, y))).collect();
        prop_assert_eq!(set.len(), model.len());
        prop_assert!(set.iter().eq(model.values()));
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

/// Keys sharing four-byte prefixes, so lexical maps nest several levels.
fn nesting_keys() -> Vec<String> {
    ["abc", "abcd", "abcde", "abcdf", "abcdefghij", "b"]
        .map(String::from)
        .to_vec()
}

#[test]
fn exhaustive_insert_order_lexical_map() {
    for_each_permutation(&nesting_keys(), |perm| {
        let mut map = FastMap::with_order(order::lexical::<String>());
        let mut model = BTreeMap::new();
        for (i, key) in perm.into_iter().enumerate() {
            assert_eq!(map.insert(key.clone(), i), model.insert(key, i));
        }
        assert!(map.iter().eq(model.iter()));
    });
}

#[test]
fn exhaustive_remove_order_lexical_map() {
    let keys = nesting_keys();
    let mut base_map = FastMap::with_order(order::lexical::<String>());
    let mut base_model = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(base_map.insert(key.clone(), i), base_model.insert(key.clone(), i));
    }

    for_each_permutation(&keys, |perm| {
        let mut map = base_map.clone();
        let mut model = base_model.clone();
        for key in perm {
            assert_eq!(map.remove(&key), model.remove(&key));
            assert_eq!(map.len(), model.len());
            assert!(map.iter().eq(model.iter()));
        }
        assert!(map.is_empty());
        assert_eq!(map.first_entry(), None);
    });
}

#[test]
fn exhaustive_insert_order_case_insensitive_set() {
    let words = ["abx", "acx", "ab", "ADEHILM", "adehil", "b"].map(String::from);
    let mut expected: Vec<String> = words.iter().map(|w| w.to_ascii_uppercase()).collect();
    expected.sort();

    for_each_permutation(&words, |perm| {
        let mut set = FastSet::with_order(order::lexical_case_insensitive::<String>());
        for word in perm {
            assert!(set.insert(word));
        }
        let got: Vec<String> = set.iter().map(|w| w.to_ascii_uppercase()).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_insert_order_table() {
    for_each_permutation(&[3, 1, 4, 1, 5, 9], |perm| {
        let table: FastTable<i32> = perm.into_iter().collect();
        assert_eq!(table.as_slice(), [1, 1, 3, 4, 5, 9]);
    });
}
