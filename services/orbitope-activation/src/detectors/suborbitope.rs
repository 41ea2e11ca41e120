//! Sub-orbitope activation handler
//!
//! Columns sharing a run of equal fixings that ends in the same row agree on
//! everything above that row. Once the run is long enough, the trailing rows
//! of those columns form a full sub-orbitope.

use std::any::Any;
use tracing::debug;

use crate::bounds::{BoundOracle, SharedTransform, VarRef, VarTransform};
use crate::error::{alloc_vec, ActivationError, Result};
use crate::handler::{ActivationHandler, HandlerRegistry};
use crate::matrix::VarMatrix;
use crate::payload::{ConstraintId, Payload, PayloadMap};
use crate::submatrix::{OrbitopeKind, Submatrix, SubmatrixList};

pub const NAME: &str = "suborbitope";
pub const DESC: &str = "sub-orbitope activation handler";

#[derive(Debug, Clone, Copy)]
pub struct PatternParams<'a> {
    pub matrix: &'a [Vec<VarRef>],
    /// Run of zero fixings a column needs before it is reported.
    pub zero_height: usize,
    /// Run of one fixings a column needs before it is reported.
    pub one_height: usize,
}

#[derive(Debug)]
struct TowerScratch {
    zero_heights: Vec<usize>,
    one_heights: Vec<usize>,
    tall_cols: Vec<usize>,
}

impl TowerScratch {
    fn new(ncols: usize) -> Result<Self> {
        Ok(Self {
            zero_heights: alloc_vec(ncols, "zero tower heights")?,
            one_heights: alloc_vec(ncols, "one tower heights")?,
            tall_cols: alloc_vec(ncols, "tall tower columns")?,
        })
    }

    fn reset(&mut self, ncols: usize) {
        self.zero_heights.clear();
        self.zero_heights.resize(ncols, 0);
        self.one_heights.clear();
        self.one_heights.resize(ncols, 0);
        self.tall_cols.clear();
    }
}

#[derive(Debug)]
pub struct PatternPayload {
    matrix: VarMatrix,
    zero_height: usize,
    one_height: usize,
    scratch: TowerScratch,
}

impl PatternPayload {
    pub fn new(params: &PatternParams<'_>) -> Result<Self> {
        if params.zero_height == 0 || params.one_height == 0 {
            return Err(ActivationError::InvalidParameter(format!(
                "tower heights must be positive, got zero {} and one {}",
                params.zero_height, params.one_height
            )));
        }

        let matrix = VarMatrix::from_rows(params.matrix)?;
        let scratch = TowerScratch::new(matrix.ncols())?;

        Ok(Self {
            matrix,
            zero_height: params.zero_height,
            one_height: params.one_height,
            scratch,
        })
    }

    pub fn matrix(&self) -> &VarMatrix {
        &self.matrix
    }

    pub fn zero_height(&self) -> usize {
        self.zero_height
    }

    pub fn one_height(&self) -> usize {
        self.one_height
    }

    pub fn detect(&mut self, bounds: &dyn BoundOracle) -> SubmatrixList {
        let Self {
            matrix,
            zero_height,
            one_height,
            scratch,
        } = self;
        let nrows = matrix.nrows();
        let ncols = matrix.ncols();
        let mut result = SubmatrixList::new();

        scratch.reset(ncols);

        for i in 0..nrows {
            for c in 0..ncols {
                let var = matrix.get(i, c);
                if bounds.is_fixed_to_zero(var) {
                    scratch.zero_heights[c] += 1;
                    scratch.one_heights[c] = 0;
                } else if bounds.is_fixed_to_one(var) {
                    scratch.one_heights[c] += 1;
                    scratch.zero_heights[c] = 0;
                } else {
                    scratch.zero_heights[c] = 0;
                    scratch.one_heights[c] = 0;
                }
            }

            for (heights, threshold) in [
                (&scratch.zero_heights, *zero_height),
                (&scratch.one_heights, *one_height),
            ] {
                scratch.tall_cols.clear();
                scratch
                    .tall_cols
                    .extend((0..ncols).filter(|&c| heights[c] >= threshold));
                if scratch.tall_cols.len() >= 2 {
                    result.push(Submatrix::trailing_rows(
                        i,
                        nrows,
                        scratch.tall_cols.clone(),
                        OrbitopeKind::Full,
                    ));
                }
            }
        }

        result
    }
}

impl Payload for PatternPayload {
    fn rebind(&mut self, transform: &dyn VarTransform) -> Result<()> {
        self.matrix.rebind(transform)
    }
}

#[derive(Debug, Default)]
pub struct SuborbitopeHandler {
    payloads: PayloadMap<PatternPayload>,
}

impl SuborbitopeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_cons(&mut self, cons: ConstraintId, params: &PatternParams<'_>) -> Result<()> {
        let payload = PatternPayload::new(params)?;
        self.payloads.register(cons, payload)
    }

    pub fn payloads(&self) -> &PayloadMap<PatternPayload> {
        &self.payloads
    }
}

impl ActivationHandler for SuborbitopeHandler {
    fn copy(&self) -> Option<Box<dyn ActivationHandler>> {
        Some(Box::new(SuborbitopeHandler::new()))
    }

    fn free(&mut self) -> Result<()> {
        self.payloads.release_all();
        Ok(())
    }

    fn init(&mut self, transform: &SharedTransform) -> Result<()> {
        self.payloads.rebind_after_transform(transform)?;
        Ok(())
    }

    fn is_active(&self, cons: ConstraintId) -> bool {
        self.payloads.contains(cons)
    }

    fn find_activation_data(
        &mut self,
        cons: ConstraintId,
        bounds: &dyn BoundOracle,
    ) -> Result<SubmatrixList> {
        let Some(payload) = self.payloads.get_mut(cons) else {
            return Ok(SubmatrixList::new());
        };

        let result = payload.detect(bounds);
        if !result.is_empty() {
            debug!("Found {} sub-orbitopes for {}", result.len(), cons);
        }
        Ok(result)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub fn include(registry: &mut HandlerRegistry) -> Result<()> {
    registry.include(NAME, DESC, Box::new(SuborbitopeHandler::new()))
}

/// Register an orbitope constraint with the handler included in `registry`.
pub fn register_cons(
    registry: &mut HandlerRegistry,
    cons: ConstraintId,
    params: &PatternParams<'_>,
) -> Result<()> {
    registry
        .handler_mut::<SuborbitopeHandler>(NAME)?
        .register_cons(cons, params)
}
