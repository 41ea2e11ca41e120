//! Detector output: submatrices whose rows/columns carry a fresh sub-symmetry

use serde::{Deserialize, Serialize};

/// Orbitope variant the installer should enforce on the submatrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrbitopeKind {
    Full,
    Packing,
    Partitioning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submatrix {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub kind: OrbitopeKind,
}

impl Submatrix {
    pub fn new(rows: Vec<usize>, cols: Vec<usize>, kind: OrbitopeKind) -> Self {
        Self { rows, cols, kind }
    }

    /// Submatrix covering the contiguous row range `first..nrows`.
    pub fn trailing_rows(first: usize, nrows: usize, cols: Vec<usize>, kind: OrbitopeKind) -> Self {
        Self {
            rows: (first..nrows).collect(),
            cols,
            kind,
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.cols.len()
    }
}

/// Records of one detection call, in emission order.
///
/// The caller owns the list; dropping it releases every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmatrixList {
    records: Vec<Submatrix>,
}

impl SubmatrixList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, submatrix: Submatrix) {
        self.records.push(submatrix);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Submatrix> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Submatrix] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<Submatrix> {
        self.records
    }
}

impl IntoIterator for SubmatrixList {
    type Item = Submatrix;
    type IntoIter = std::vec::IntoIter<Submatrix>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a SubmatrixList {
    type Item = &'a Submatrix;
    type IntoIter = std::slice::Iter<'a, Submatrix>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Submatrix> for SubmatrixList {
    fn from_iter<I: IntoIterator<Item = Submatrix>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
