//! Occupancy Set - hierarchical bitset of non-empty price levels.
//!
//! Layer 0 holds one bit per level. Each bit of layer `k + 1` is set iff
//! the matching 64-bit word of layer `k` is non-zero, and the top layer is
//! a single word. Finding the nearest occupied level in either direction
//! touches at most two words per layer, so a million-level grid needs four
//! layers and the search never walks empty levels one at a time.

const WORD_BITS: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancySet {
    /// `layers[0]` is the leaf layer; the last layer has exactly one word
    layers: Vec<Vec<u64>>,
    len: usize,
}

impl OccupancySet {
    /// Empty set over indices `0..len`.
    pub fn new(len: usize) -> Self {
        let mut layers = Vec::new();
        let mut bits = len;
        loop {
            let words = bits.div_ceil(WORD_BITS).max(1);
            layers.push(vec![0u64; words]);
            if words == 1 {
                break;
            }
            bits = words;
        }
        Self { layers, len }
    }

    /// Size of the index universe.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Number of layers a search may climb.
    #[inline]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers[self.layers.len() - 1][0] == 0
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.layers[0][index / WORD_BITS] & bit(index) != 0
    }

    /// Mark `index` occupied.
    #[inline]
    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < self.len);
        let mut pos = index;
        for layer in &mut self.layers {
            let word = &mut layer[pos / WORD_BITS];
            let was_empty = *word == 0;
            *word |= bit(pos);
            if !was_empty {
                break; // upper layers already see this word
            }
            pos /= WORD_BITS;
        }
    }

    /// Mark `index` empty.
    #[inline]
    pub fn remove(&mut self, index: usize) {
        debug_assert!(index < self.len);
        let mut pos = index;
        for layer in &mut self.layers {
            let word = &mut layer[pos / WORD_BITS];
            *word &= !bit(pos);
            if *word != 0 {
                break;
            }
            pos /= WORD_BITS;
        }
    }

    /// Lowest occupied index `>= from`.
    #[inline]
    pub fn first_at_or_after(&self, from: usize) -> Option<usize> {
        self.seek_up(from).0
    }

    /// Highest occupied index `<= from`.
    #[inline]
    pub fn last_at_or_before(&self, from: usize) -> Option<usize> {
        self.seek_down(from).0
    }

    /// Ascending search; also reports how many words were read.
    fn seek_up(&self, from: usize) -> (Option<usize>, usize) {
        let mut reads = 0;
        let mut depth = 0;
        let mut pos = from;

        // Climb until some word holds a set bit at or after `pos`
        loop {
            let Some(layer) = self.layers.get(depth) else {
                return (None, reads);
            };
            let word_index = pos / WORD_BITS;
            let Some(&word) = layer.get(word_index) else {
                return (None, reads);
            };
            reads += 1;
            let masked = word & (u64::MAX << (pos % WORD_BITS));
            if masked != 0 {
                pos = word_index * WORD_BITS + masked.trailing_zeros() as usize;
                break;
            }
            pos = word_index + 1;
            depth += 1;
        }

        // Descend along the lowest set bits
        while depth > 0 {
            depth -= 1;
            let word = self.layers[depth][pos];
            reads += 1;
            pos = pos * WORD_BITS + word.trailing_zeros() as usize;
        }
        (Some(pos), reads)
    }

    /// Descending search; also reports how many words were read.
    fn seek_down(&self, from: usize) -> (Option<usize>, usize) {
        if self.len == 0 {
            return (None, 0);
        }
        let mut reads = 0;
        let mut depth = 0;
        let mut pos = from.min(self.len - 1);

        loop {
            let Some(layer) = self.layers.get(depth) else {
                return (None, reads);
            };
            let word_index = pos / WORD_BITS;
            let word = layer[word_index];
            reads += 1;
            let masked = word & (u64::MAX >> (WORD_BITS - 1 - pos % WORD_BITS));
            if masked != 0 {
                pos = word_index * WORD_BITS + highest_bit(masked);
                break;
            }
            if word_index == 0 {
                return (None, reads);
            }
            pos = word_index - 1;
            depth += 1;
        }

        while depth > 0 {
            depth -= 1;
            let word = self.layers[depth][pos];
            reads += 1;
            pos = pos * WORD_BITS + highest_bit(word);
        }
        (Some(pos), reads)
    }
}

#[inline]
fn bit(index: usize) -> u64 {
    1u64 << (index % WORD_BITS)
}

#[inline]
fn highest_bit(word: u64) -> usize {
    WORD_BITS - 1 - word.leading_zeros() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_layers() {
        assert_eq!(OccupancySet::new(0).depth(), 1);
        assert_eq!(OccupancySet::new(64).depth(), 1);
        assert_eq!(OccupancySet::new(65).depth(), 2);
        assert_eq!(OccupancySet::new(4096).depth(), 2);
        assert_eq!(OccupancySet::new(1_000_000).depth(), 4);
    }

    #[test]
    fn test_empty_searches() {
        let set = OccupancySet::new(1_000);
        assert!(set.is_empty());
        assert_eq!(set.first_at_or_after(0), None);
        assert_eq!(set.last_at_or_before(999), None);
        assert_eq!(OccupancySet::new(0).last_at_or_before(0), None);
    }

    #[test]
    fn test_insert_remove() {
        let mut set = OccupancySet::new(10_000);
        set.insert(0);
        set.insert(9_999);
        set.insert(4_160);
        assert!(set.contains(4_160));
        assert!(!set.contains(4_161));
        assert!(!set.contains(10_000));

        assert_eq!(set.first_at_or_after(1), Some(4_160));
        assert_eq!(set.first_at_or_after(4_161), Some(9_999));
        assert_eq!(set.last_at_or_before(9_998), Some(4_160));
        assert_eq!(set.last_at_or_before(4_159), Some(0));

        set.remove(4_160);
        assert_eq!(set.first_at_or_after(1), Some(9_999));
        set.remove(9_999);
        assert_eq!(set.first_at_or_after(1), None);
        set.remove(0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_shared_word_stays_visible() {
        let mut set = OccupancySet::new(200);
        set.insert(70);
        set.insert(71);
        set.remove(70);
        assert_eq!(set.first_at_or_after(0), Some(71));
        assert_eq!(set.last_at_or_before(199), Some(71));
    }

    #[test]
    fn test_search_cost_bounded_by_depth() {
        // A lone level at each end of a million-level grid
        let mut set = OccupancySet::new(1_000_000);
        set.insert(999_999);
        let (found, reads) = set.seek_up(0);
        assert_eq!(found, Some(999_999));
        assert!(reads <= 2 * set.depth(), "read {reads} words");

        set.remove(999_999);
        set.insert(0);
        let (found, reads) = set.seek_down(999_999);
        assert_eq!(found, Some(0));
        assert!(reads <= 2 * set.depth(), "read {reads} words");

        set.remove(0);
        let (found, reads) = set.seek_up(0);
        assert_eq!(found, None);
        assert!(reads <= set.depth());
    }

    #[test]
    fn test_matches_ordered_set() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let len = 20_000;
        let mut set = OccupancySet::new(len);
        let mut reference = BTreeSet::new();

        for _ in 0..20_000 {
            let index = rng.gen_range(0..len);
            if rng.gen_bool(0.5) {
                set.insert(index);
                reference.insert(index);
            } else {
                set.remove(index);
                reference.remove(&index);
            }

            let from = rng.gen_range(0..len);
            assert_eq!(set.first_at_or_after(from), reference.range(from..).next().copied());
            assert_eq!(set.last_at_or_before(from), reference.range(..=from).next_back().copied());
        }
    }
}
