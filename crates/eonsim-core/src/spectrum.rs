//! Per-link optical spectrum: slot occupancy and the free-slice ledger.

use std::cmp::Reverse;

use crate::prng::Prng;

/// One frequency slot on a link. `occupancy` counts every allocation the
/// slot has ever been part of and is never decremented.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fsu {
    pub allocated: bool,
    pub occupancy: u64,
}

/// An inclusive interval of slot indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    start: usize,
    end: usize,
}

impl Slice {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted slice [{start}, {end}]");
        Self { start, end }
    }

    pub fn start(self) -> usize {
        self.start
    }

    pub fn end(self) -> usize {
        self.end
    }

    pub fn width(self) -> usize {
        self.end - self.start + 1
    }

    /// Whether `other` lies entirely inside this slice.
    pub fn contains(self, other: Slice) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// The spectrum of a single link: a fixed-length slot vector and an ordered
/// free list.
///
/// Invariants, maintained by [`allocate`](Self::allocate) and
/// [`deallocate`](Self::deallocate):
///
/// - Free slices are sorted by start and pairwise disjoint.
/// - Two free slices are never adjacent; touching slices are merged.
/// - A slot is allocated iff no free slice contains its index.
#[derive(Debug, Clone)]
pub struct Spectrum {
    slots: Vec<Fsu>,
    free: Vec<Slice>,
}

impl Spectrum {
    /// A spectrum of `width` unallocated slots covered by one free slice.
    pub fn new(width: usize) -> Self {
        debug_assert!(width > 0, "a link must carry at least one slot");
        Self {
            slots: vec![Fsu::default(); width],
            free: vec![Slice::new(0, width - 1)],
        }
    }

    /// The total number of slots.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// The number of unallocated slots.
    pub fn available(&self) -> usize {
        self.free.iter().map(|slice| slice.width()).sum()
    }

    /// Whether some free slice contains the whole of `slice`.
    pub fn available_at(&self, slice: Slice) -> bool {
        self.free.iter().any(|free| free.contains(slice))
    }

    /// The free slices, sorted by start.
    pub fn free_slices(&self) -> &[Slice] {
        &self.free
    }

    /// The slot at `index`.
    pub fn at(&self, index: usize) -> Fsu {
        self.slots[index]
    }

    /// Marks every slot in `slice` allocated and splits the containing free
    /// slice around it.
    ///
    /// `slice` must lie entirely inside one free slice; violating this is a
    /// programming error checked by a debug assertion.
    pub fn allocate(&mut self, slice: Slice) {
        debug_assert!(
            self.available_at(slice),
            "allocating [{}, {}] outside any free slice",
            slice.start(),
            slice.end(),
        );
        for slot in &mut self.slots[slice.start()..=slice.end()] {
            slot.allocated = true;
            slot.occupancy += 1;
        }
        let Some(position) = self.free.iter().position(|free| free.contains(slice)) else {
            return;
        };
        let host = self.free[position];
        match (slice.start() == host.start(), slice.end() == host.end()) {
            (true, true) => {
                self.free.remove(position);
            }
            (true, false) => {
                self.free[position] = Slice::new(slice.end() + 1, host.end());
            }
            (false, true) => {
                self.free[position] = Slice::new(host.start(), slice.start() - 1);
            }
            (false, false) => {
                self.free[position] = Slice::new(host.start(), slice.start() - 1);
                self.free
                    .insert(position + 1, Slice::new(slice.end() + 1, host.end()));
            }
        }
    }

    /// Clears every slot in `slice` and returns it to the free list, merging
    /// with contiguous neighbors. Occupancy counters are left untouched.
    ///
    /// Every slot in `slice` must currently be allocated; violating this is
    /// a programming error checked by a debug assertion.
    pub fn deallocate(&mut self, slice: Slice) {
        debug_assert!(
            self.slots[slice.start()..=slice.end()]
                .iter()
                .all(|slot| slot.allocated),
            "releasing [{}, {}] which is not fully allocated",
            slice.start(),
            slice.end(),
        );
        for slot in &mut self.slots[slice.start()..=slice.end()] {
            slot.allocated = false;
        }
        let position = self.free.partition_point(|free| free.end() < slice.start());
        let merges_left = position > 0 && self.free[position - 1].end() + 1 == slice.start();
        let merges_right =
            position < self.free.len() && slice.end() + 1 == self.free[position].start();
        match (merges_left, merges_right) {
            (true, true) => {
                self.free[position - 1] =
                    Slice::new(self.free[position - 1].start(), self.free[position].end());
                self.free.remove(position);
            }
            (true, false) => {
                self.free[position - 1] =
                    Slice::new(self.free[position - 1].start(), slice.end());
            }
            (false, true) => {
                self.free[position] = Slice::new(slice.start(), self.free[position].end());
            }
            (false, false) => {
                self.free.insert(position, slice);
            }
        }
    }

    /// One character per slot, `#` for allocated and `.` for free.
    pub fn render(&self) -> String {
        self.slots
            .iter()
            .map(|slot| if slot.allocated { '#' } else { '.' })
            .collect()
    }
}

/// Spectrum fit policies. The set is closed, so policies are enum variants
/// selected by name in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpectrumAllocator {
    BestFit,
    FirstFit,
    LastFit,
    RandomFit,
    WorstFit,
}

impl SpectrumAllocator {
    /// Selects an entirely-free slice of exactly `width` slots, or `None`
    /// when no free slice is wide enough. The slice always starts at the
    /// chosen free slice's first slot.
    ///
    /// `RandomFit` picks uniformly among the fitting free slices, driven by
    /// the `"random_fit"` stream.
    pub fn select(self, spectrum: &Spectrum, width: usize, prng: &mut Prng) -> Option<Slice> {
        if width == 0 {
            return None;
        }
        let free = spectrum.free_slices();
        let host = match self {
            Self::FirstFit => free.iter().find(|slice| slice.width() >= width).copied(),
            Self::LastFit => free
                .iter()
                .rev()
                .find(|slice| slice.width() >= width)
                .copied(),
            Self::BestFit => free
                .iter()
                .filter(|slice| slice.width() >= width)
                .min_by_key(|slice| (slice.width(), slice.start()))
                .copied(),
            Self::WorstFit => free
                .iter()
                .filter(|slice| slice.width() >= width)
                .min_by_key(|slice| (Reverse(slice.width()), slice.start()))
                .copied(),
            Self::RandomFit => {
                let candidates = free
                    .iter()
                    .filter(|slice| slice.width() >= width)
                    .copied()
                    .collect::<Vec<_>>();
                if candidates.is_empty() {
                    None
                } else {
                    let draw = prng.next("random_fit");
                    let index = ((draw * candidates.len() as f64) as usize)
                        .min(candidates.len() - 1);
                    Some(candidates[index])
                }
            }
        }?;
        Some(Slice::new(host.start(), host.start() + width - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Width 10 with `[0, 1]` and `[5, 7]` taken; free = `[2, 4]`, `[8, 9]`.
    fn fragmented() -> Spectrum {
        let mut spectrum = Spectrum::new(10);
        spectrum.allocate(Slice::new(0, 1));
        spectrum.allocate(Slice::new(5, 7));
        spectrum
    }

    fn prng() -> Prng {
        let mut prng = Prng::seeded(13);
        prng.set_uniform("random_fit", 0.0, 1.0).unwrap();
        prng
    }

    #[test]
    fn allocation_splits_the_free_list() {
        let spectrum = fragmented();
        assert_eq!(
            spectrum.free_slices(),
            &[Slice::new(2, 4), Slice::new(8, 9)]
        );
        assert_eq!(spectrum.available(), 5);
        assert_eq!(spectrum.render(), "##...###..");
    }

    #[test]
    fn allocation_in_the_middle_splits_in_two() {
        let mut spectrum = Spectrum::new(10);
        spectrum.allocate(Slice::new(4, 5));
        assert_eq!(
            spectrum.free_slices(),
            &[Slice::new(0, 3), Slice::new(6, 9)]
        );
    }

    #[test]
    fn release_merges_both_neighbors() {
        let mut spectrum = fragmented();
        spectrum.allocate(Slice::new(2, 4));
        spectrum.deallocate(Slice::new(2, 4));
        spectrum.deallocate(Slice::new(5, 7));
        // [2,4] and [5,7] and [8,9] collapse into one slice.
        assert_eq!(
            spectrum.free_slices(),
            &[Slice::new(2, 9)]
        );
        assert_eq!(spectrum.available(), 8);
    }

    #[test]
    fn release_merges_left_only() {
        let mut spectrum = fragmented();
        spectrum.deallocate(Slice::new(5, 6));
        assert_eq!(
            spectrum.free_slices(),
            &[Slice::new(2, 6), Slice::new(8, 9)]
        );
    }

    #[test]
    fn release_merges_right_only() {
        let mut spectrum = fragmented();
        spectrum.deallocate(Slice::new(7, 7));
        assert_eq!(
            spectrum.free_slices(),
            &[Slice::new(2, 4), Slice::new(7, 9)]
        );
    }

    #[test]
    fn release_without_neighbors_inserts() {
        let mut spectrum = fragmented();
        spectrum.deallocate(Slice::new(6, 6));
        assert_eq!(
            spectrum.free_slices(),
            &[Slice::new(2, 4), Slice::new(6, 6), Slice::new(8, 9)]
        );
    }

    #[test]
    fn allocate_release_round_trips() {
        let mut spectrum = fragmented();
        let before = spectrum.free_slices().to_vec();
        spectrum.allocate(Slice::new(3, 4));
        spectrum.deallocate(Slice::new(3, 4));
        assert_eq!(spectrum.free_slices(), &before[..]);
        spectrum.allocate(Slice::new(3, 4));
        assert_eq!(
            spectrum.free_slices(),
            &[Slice::new(2, 2), Slice::new(8, 9)]
        );
    }

    #[test]
    fn occupancy_counts_history() {
        let mut spectrum = Spectrum::new(4);
        spectrum.allocate(Slice::new(0, 1));
        spectrum.deallocate(Slice::new(0, 1));
        spectrum.allocate(Slice::new(0, 3));
        assert_eq!(spectrum.at(0).occupancy, 2);
        assert_eq!(spectrum.at(3).occupancy, 1);
    }

    #[test]
    fn availability_accounting_stays_consistent() {
        let mut spectrum = fragmented();
        spectrum.allocate(Slice::new(8, 8));
        let allocated = (0..spectrum.size())
            .filter(|&index| spectrum.at(index).allocated)
            .count();
        assert_eq!(spectrum.available() + allocated, spectrum.size());
        assert!(!spectrum.available_at(Slice::new(8, 9)));
        assert!(spectrum.available_at(Slice::new(9, 9)));
    }

    #[test]
    fn best_fit_takes_the_tightest_slice() {
        let maybe = SpectrumAllocator::BestFit.select(&fragmented(), 2, &mut prng());
        assert_eq!(maybe, Some(Slice::new(8, 9)));
    }

    #[test]
    fn first_fit_takes_the_lowest_start() {
        let maybe = SpectrumAllocator::FirstFit.select(&fragmented(), 2, &mut prng());
        assert_eq!(maybe, Some(Slice::new(2, 3)));
    }

    #[test]
    fn last_fit_takes_the_highest_start() {
        let maybe = SpectrumAllocator::LastFit.select(&fragmented(), 2, &mut prng());
        assert_eq!(maybe, Some(Slice::new(8, 9)));
    }

    #[test]
    fn worst_fit_takes_the_widest_slice() {
        let maybe = SpectrumAllocator::WorstFit.select(&fragmented(), 2, &mut prng());
        assert_eq!(maybe, Some(Slice::new(2, 3)));
    }

    #[test]
    fn random_fit_lands_on_a_free_slot() {
        let spectrum = fragmented();
        let mut prng = prng();
        let expected = [
            Slice::new(2, 2),
            Slice::new(8, 8),
        ];
        for _ in 0..50 {
            let slice = SpectrumAllocator::RandomFit
                .select(&spectrum, 1, &mut prng)
                .unwrap();
            assert!(expected.contains(&slice));
        }
    }

    #[test]
    fn no_fit_when_demand_exceeds_every_slice() {
        let spectrum = fragmented();
        let mut prng = prng();
        for allocator in [
            SpectrumAllocator::BestFit,
            SpectrumAllocator::FirstFit,
            SpectrumAllocator::LastFit,
            SpectrumAllocator::RandomFit,
            SpectrumAllocator::WorstFit,
        ] {
            assert_eq!(allocator.select(&spectrum, 4, &mut prng), None);
        }
    }
}
