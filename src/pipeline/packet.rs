//! Messages exchanged between pipeline stages.
//!
//! A `Matrix` is produced once by the source and then only ever shared
//! behind an `Arc`; every later message points back at it instead of
//! copying samples. `Neighborhood` is a fixed-size inline buffer so the
//! per-position work of the stage-2 branches does not allocate.

use crate::pipeline::id::{ItemId, Tagged};
use crate::pipeline::nodes::analysis::AnalysisKind;
use std::sync::Arc;

/// Immutable H×W grid of byte samples, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    id: ItemId,
    rows: usize,
    cols: usize,
    samples: Box<[u8]>,
}

impl Matrix {
    /// Wrap `samples` as a `rows`×`cols` grid.
    ///
    /// # Panics
    /// If `samples.len() != rows * cols`.
    pub fn new(id: ItemId, rows: usize, cols: usize, samples: Vec<u8>) -> Self {
        assert_eq!(
            samples.len(),
            rows * cols,
            "matrix {id} has {} samples, expected {rows}x{cols}",
            samples.len()
        );
        Self {
            id,
            rows,
            cols,
            samples: samples.into_boxed_slice(),
        }
    }

    /// A grid with every sample equal to `value`.
    pub fn filled(id: ItemId, rows: usize, cols: usize, value: u8) -> Self {
        Self::new(id, rows, cols, vec![value; rows * cols])
    }

    #[inline]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// The up-to-8 grid neighbors of `pos` followed by the sample at `pos`.
    ///
    /// Neighbors are visited NW, N, NE, W, E, SW, S, SE; those falling off the
    /// grid are omitted, rows never wrap.
    ///
    /// # Panics
    /// If `pos` is outside the matrix.
    pub fn neighborhood(&self, pos: usize) -> Neighborhood {
        assert!(
            pos < self.samples.len(),
            "position {pos} outside matrix {} of {} samples",
            self.id,
            self.samples.len()
        );

        let row = pos / self.cols;
        let col = pos % self.cols;
        let mut hood = Neighborhood::default();

        for (dr, dc) in NEIGHBOR_OFFSETS {
            let Some(r) = row.checked_add_signed(dr) else {
                continue;
            };
            let Some(c) = col.checked_add_signed(dc) else {
                continue;
            };
            if r < self.rows && c < self.cols {
                hood.push(self.samples[r * self.cols + c]);
            }
        }
        hood.push(self.samples[pos]);
        hood
    }
}

impl Tagged for Matrix {
    fn item(&self) -> ItemId {
        self.id
    }
}

impl Tagged for Arc<Matrix> {
    fn item(&self) -> ItemId {
        self.id
    }
}

impl std::fmt::Debug for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("id", &self.id)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish_non_exhaustive()
    }
}

const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Maximum samples in a neighborhood: 8 neighbors plus the center.
pub const MAX_NEIGHBORHOOD: usize = 9;

/// Up to 8 neighbor samples followed by the center sample.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighborhood {
    samples: [u8; MAX_NEIGHBORHOOD],
    len: u8,
}

impl Neighborhood {
    #[inline]
    fn push(&mut self, sample: u8) {
        self.samples[self.len as usize] = sample;
        self.len += 1;
    }

    /// Neighbors and center.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.samples[..self.len as usize]
    }

    /// Neighbors only (everything but the trailing center sample).
    #[inline]
    pub fn neighbors(&self) -> &[u8] {
        let len = self.len as usize;
        &self.samples[..len.saturating_sub(1)]
    }

    #[inline]
    pub fn center(&self) -> Option<u8> {
        self.as_slice().last().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn sum(&self) -> u64 {
        self.as_slice().iter().map(|&s| s as u64).sum()
    }

    /// Copy with every sample replaced by `255 - sample`.
    pub fn inverted(&self) -> Neighborhood {
        let mut out = *self;
        for s in &mut out.samples[..self.len as usize] {
            *s = u8::MAX - *s;
        }
        out
    }
}

impl std::fmt::Debug for Neighborhood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Ordered linear indices into a matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionSet(Vec<usize>);

impl PositionSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn push(&mut self, pos: usize) {
        self.0.push(pos);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<usize>> for PositionSet {
    fn from(positions: Vec<usize>) -> Self {
        Self(positions)
    }
}

impl FromIterator<usize> for PositionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One finder's output: the shared matrix and the positions it flagged.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub kind: AnalysisKind,
    pub matrix: Arc<Matrix>,
    pub positions: PositionSet,
}

impl AnalysisResult {
    /// Neighborhood of every flagged position, in position order.
    pub fn neighborhoods(&self) -> impl Iterator<Item = Neighborhood> + '_ {
        self.positions.iter().map(|pos| self.matrix.neighborhood(pos))
    }
}

impl Tagged for AnalysisResult {
    fn item(&self) -> ItemId {
        self.matrix.id()
    }
}

/// The joined (max, equal, min) results for one matrix.
#[derive(Debug, Clone)]
pub struct CombinedRecord {
    pub max: AnalysisResult,
    pub equal: AnalysisResult,
    pub min: AnalysisResult,
}

impl CombinedRecord {
    pub fn results(&self) -> [&AnalysisResult; 3] {
        [&self.max, &self.equal, &self.min]
    }

    /// Total flagged positions across all three analyses.
    pub fn flagged_count(&self) -> usize {
        self.results().iter().map(|r| r.positions.len()).sum()
    }

    /// Every flagged neighborhood: max positions, then equal, then min.
    pub fn neighborhoods(&self) -> impl Iterator<Item = Neighborhood> + '_ {
        self.results().into_iter().flat_map(|r| r.neighborhoods())
    }
}

impl Tagged for CombinedRecord {
    fn item(&self) -> ItemId {
        self.max.item()
    }
}

impl Tagged for Arc<CombinedRecord> {
    fn item(&self) -> ItemId {
        self.max.item()
    }
}

/// Completion token of one stage-2 branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub item: ItemId,
}

impl Tagged for Completion {
    fn item(&self) -> ItemId {
        self.item
    }
}

/// Both stage-2 branches finished for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinedCompletion {
    pub item: ItemId,
}

/// Returns one unit of admission capacity to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecrementPulse {
    pub item: ItemId,
}
