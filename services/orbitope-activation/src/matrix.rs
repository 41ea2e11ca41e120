use crate::bounds::{VarRef, VarTransform};
use crate::error::{alloc_vec, ActivationError, Result};

/// Dense row-major copy of a caller's variable matrix.
///
/// Dimensions never change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarMatrix {
    nrows: usize,
    ncols: usize,
    vars: Vec<VarRef>,
}

impl VarMatrix {
    /// Deep-copy `rows`, rejecting empty or ragged input.
    pub fn from_rows(rows: &[Vec<VarRef>]) -> Result<Self> {
        let nrows = rows.len();
        if nrows == 0 {
            return Err(ActivationError::InvalidParameter(
                "matrix must have at least one row".to_string(),
            ));
        }

        let ncols = rows[0].len();
        if ncols == 0 {
            return Err(ActivationError::InvalidParameter(
                "matrix must have at least one column".to_string(),
            ));
        }

        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(ActivationError::InvalidParameter(format!(
                "matrix row {} has {} entries, expected {}",
                i,
                row.len(),
                ncols
            )));
        }

        let mut vars = alloc_vec(nrows * ncols, "variable matrix")?;
        for row in rows {
            vars.extend_from_slice(row);
        }

        Ok(Self { nrows, ncols, vars })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> VarRef {
        debug_assert!(row < self.nrows && col < self.ncols);
        self.vars[row * self.ncols + col]
    }

    pub fn row(&self, row: usize) -> &[VarRef] {
        &self.vars[row * self.ncols..(row + 1) * self.ncols]
    }

    /// Replace every entry by its transformed counterpart.
    ///
    /// Either all entries are rebound or, on error, none are.
    pub fn rebind(&mut self, transform: &dyn VarTransform) -> Result<()> {
        let mut rebound = alloc_vec(self.vars.len(), "rebound variable matrix")?;
        for &var in &self.vars {
            let tvar = transform
                .transformed_var(var)
                .ok_or(ActivationError::UnknownVariable(var))?;
            rebound.push(tvar);
        }
        self.vars = rebound;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sequential_rows(nrows: usize, ncols: usize) -> Vec<Vec<VarRef>> {
    (0..nrows)
        .map(|r| (0..ncols).map(|c| VarRef(r * ncols + c)).collect())
        .collect()
}
