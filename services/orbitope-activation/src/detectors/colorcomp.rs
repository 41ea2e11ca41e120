//! Color components activation handler
//!
//! Rows of the matrix are graph vertices, columns are colors. Removing the
//! vertices that a partial fixing excludes from (or forces into) some colors
//! can split the graph; every resulting connected component is symmetric in
//! the affected colors and is reported as a packing sub-orbitope.

use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::debug;

use crate::bounds::{BoundOracle, SharedTransform, VarRef, VarTransform};
use crate::error::{alloc_vec, ActivationError, Result};
use crate::handler::{ActivationHandler, HandlerRegistry};
use crate::matrix::VarMatrix;
use crate::payload::{ConstraintId, Payload, PayloadMap};
use crate::submatrix::{OrbitopeKind, Submatrix, SubmatrixList};

pub const NAME: &str = "colorcomp";
pub const DESC: &str = "color components activation handler";

/// Which vertices are taken out of the graph for a color (pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStrategy {
    /// Remove vertices fixed to zero on both colors of the pair.
    #[default]
    Default,
    /// Remove vertices fixed to one on a single color.
    InvertedSingle,
    /// Remove vertices fixed to one on either color of the pair.
    InvertedPair,
}

/// Registration input; every array is copied.
#[derive(Debug, Clone, Copy)]
pub struct ComponentParams<'a> {
    /// Vertices x colors.
    pub matrix: &'a [Vec<VarRef>],
    /// Neighbours of every vertex.
    pub adjacency: &'a [Vec<usize>],
    /// Consider every color pair instead of consecutive pairs only.
    pub all_color_pairs: bool,
    pub strategy: ComponentStrategy,
}

/// Reusable DFS buffers, sized to the vertex count at registration.
#[derive(Debug)]
struct DfsScratch {
    /// Removed from the graph, or already visited by the current search.
    removed: Vec<bool>,
    dfs_stack: Vec<usize>,
    component: Vec<usize>,
}

impl DfsScratch {
    fn new(nvertices: usize) -> Result<Self> {
        Ok(Self {
            removed: alloc_vec(nvertices, "removed vertex flags")?,
            dfs_stack: alloc_vec(nvertices, "dfs stack")?,
            component: alloc_vec(nvertices, "component buffer")?,
        })
    }

    /// Reset the flags from `is_removed`; returns how many vertices were removed.
    fn mark_removed(&mut self, nvertices: usize, is_removed: impl Fn(usize) -> bool) -> usize {
        self.removed.clear();
        self.removed.extend((0..nvertices).map(is_removed));
        self.removed.iter().filter(|&&r| r).count()
    }

    /// Iterative DFS from `start` over vertices not yet removed/visited.
    /// Returns the component sorted ascending.
    fn explore(&mut self, start: usize, adjacency: &[Vec<usize>]) -> &[usize] {
        self.dfs_stack.clear();
        self.component.clear();

        self.removed[start] = true;
        self.component.push(start);
        self.dfs_stack.push(start);

        while let Some(&top) = self.dfs_stack.last() {
            let removed = &self.removed;
            match adjacency[top].iter().copied().find(|&v| !removed[v]) {
                Some(v) => {
                    self.removed[v] = true;
                    self.component.push(v);
                    self.dfs_stack.push(v);
                }
                None => {
                    self.dfs_stack.pop();
                }
            }
        }

        // rows must follow the parent orbitope's row order
        self.component.sort_unstable();
        &self.component
    }

    /// Emit one record per component of the surviving graph.
    ///
    /// With `skip_connected`, nothing is emitted when the surviving graph is
    /// still a single component.
    fn emit_components(
        &mut self,
        adjacency: &[Vec<usize>],
        nremoved: usize,
        cols: &[usize],
        skip_connected: bool,
        result: &mut SubmatrixList,
    ) {
        let nvertices = adjacency.len();
        let surviving = nvertices - nremoved;

        for start in 0..nvertices {
            if self.removed[start] {
                continue;
            }

            let component = self.explore(start, adjacency);
            if skip_connected && component.len() == surviving {
                return;
            }

            result.push(Submatrix::new(component.to_vec(), cols.to_vec(), OrbitopeKind::Packing));
        }
    }
}

/// Color pairs `(c1, c2)` with `c1 < c2`; consecutive ones only unless `all`.
fn color_pairs(ncolors: usize, all: bool) -> impl Iterator<Item = (usize, usize)> {
    (0..ncolors).flat_map(move |c1| {
        let end = if all { ncolors } else { (c1 + 2).min(ncolors) };
        (c1 + 1..end).map(move |c2| (c1, c2))
    })
}

#[derive(Debug)]
pub struct ComponentPayload {
    matrix: VarMatrix,
    adjacency: Vec<Vec<usize>>,
    all_color_pairs: bool,
    strategy: ComponentStrategy,
    scratch: DfsScratch,
}

impl ComponentPayload {
    pub fn new(params: &ComponentParams<'_>) -> Result<Self> {
        let nvertices = params.matrix.len();
        if params.adjacency.len() != nvertices {
            return Err(ActivationError::InvalidParameter(format!(
                "adjacency has {} entries but matrix has {} vertices",
                params.adjacency.len(),
                nvertices
            )));
        }
        for (v, neighbours) in params.adjacency.iter().enumerate() {
            if let Some(&w) = neighbours.iter().find(|&&w| w >= nvertices) {
                return Err(ActivationError::InvalidParameter(format!(
                    "vertex {} has neighbour {} out of range 0..{}",
                    v, w, nvertices
                )));
            }
        }

        let matrix = VarMatrix::from_rows(params.matrix)?;

        let mut adjacency = alloc_vec(nvertices, "adjacency lists")?;
        for neighbours in params.adjacency {
            let mut copy = alloc_vec(neighbours.len(), "adjacency list")?;
            copy.extend_from_slice(neighbours);
            adjacency.push(copy);
        }

        Ok(Self {
            matrix,
            adjacency,
            all_color_pairs: params.all_color_pairs,
            strategy: params.strategy,
            scratch: DfsScratch::new(nvertices)?,
        })
    }

    pub fn nvertices(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncolors(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn strategy(&self) -> ComponentStrategy {
        self.strategy
    }

    pub fn matrix(&self) -> &VarMatrix {
        &self.matrix
    }

    pub fn detect(&mut self, bounds: &dyn BoundOracle) -> SubmatrixList {
        let mut result = SubmatrixList::new();
        match self.strategy {
            ComponentStrategy::Default => self.find_color_pair_components(bounds, &mut result),
            ComponentStrategy::InvertedSingle => self.find_inverted_single_components(bounds, &mut result),
            ComponentStrategy::InvertedPair => self.find_inverted_pair_components(bounds, &mut result),
        }
        result
    }

    fn find_color_pair_components(&mut self, bounds: &dyn BoundOracle, result: &mut SubmatrixList) {
        let Self {
            matrix,
            adjacency,
            all_color_pairs,
            scratch,
            ..
        } = self;
        let nvertices = matrix.nrows();

        for (c1, c2) in color_pairs(matrix.ncols(), *all_color_pairs) {
            let nremoved = scratch.mark_removed(nvertices, |v| {
                bounds.is_fixed_to_zero(matrix.get(v, c1)) && bounds.is_fixed_to_zero(matrix.get(v, c2))
            });
            // nothing removed: only the original component remains
            if nremoved == 0 {
                continue;
            }

            scratch.emit_components(adjacency, nremoved, &[c1, c2], true, result);
        }
    }

    fn find_inverted_single_components(&mut self, bounds: &dyn BoundOracle, result: &mut SubmatrixList) {
        let Self {
            matrix,
            adjacency,
            scratch,
            ..
        } = self;
        let nvertices = matrix.nrows();
        let ncolors = matrix.ncols();

        for c1 in 0..ncolors {
            let cols: Vec<usize> = (0..ncolors).filter(|&c| c != c1).collect();
            if cols.is_empty() {
                continue;
            }

            let nremoved = scratch.mark_removed(nvertices, |v| bounds.is_fixed_to_one(matrix.get(v, c1)));
            if nremoved == 0 {
                continue;
            }

            scratch.emit_components(adjacency, nremoved, &cols, false, result);
        }
    }

    fn find_inverted_pair_components(&mut self, bounds: &dyn BoundOracle, result: &mut SubmatrixList) {
        let Self {
            matrix,
            adjacency,
            all_color_pairs,
            scratch,
            ..
        } = self;
        let nvertices = matrix.nrows();
        let ncolors = matrix.ncols();

        for (c1, c2) in color_pairs(ncolors, *all_color_pairs) {
            let cols: Vec<usize> = (0..ncolors).filter(|&c| c != c1 && c != c2).collect();
            if cols.is_empty() {
                continue;
            }

            let nremoved = scratch.mark_removed(nvertices, |v| {
                bounds.is_fixed_to_one(matrix.get(v, c1)) || bounds.is_fixed_to_one(matrix.get(v, c2))
            });
            if nremoved == 0 {
                continue;
            }

            scratch.emit_components(adjacency, nremoved, &cols, false, result);
        }
    }
}

impl Payload for ComponentPayload {
    fn rebind(&mut self, transform: &dyn VarTransform) -> Result<()> {
        self.matrix.rebind(transform)
    }
}

#[derive(Debug, Default)]
pub struct ColorCompHandler {
    payloads: PayloadMap<ComponentPayload>,
}

impl ColorCompHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store `params` for `cons`, replacing any earlier payload.
    /// On error the previous payload stays in place.
    pub fn register_cons(&mut self, cons: ConstraintId, params: &ComponentParams<'_>) -> Result<()> {
        let payload = ComponentPayload::new(params)?;
        self.payloads.register(cons, payload)
    }

    pub fn payloads(&self) -> &PayloadMap<ComponentPayload> {
        &self.payloads
    }
}

impl ActivationHandler for ColorCompHandler {
    fn copy(&self) -> Option<Box<dyn ActivationHandler>> {
        Some(Box::new(ColorCompHandler::new()))
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
            debug!("Found {} color component submatrices for {}", result.len(), cons);
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
    registry.include(NAME, DESC, Box::new(ColorCompHandler::new()))
}

/// Register a coloring constraint with the handler included in `registry`.
pub fn register_cons(
    registry: &mut HandlerRegistry,
    cons: ConstraintId,
    params: &ComponentParams<'_>,
) -> Result<()> {
    registry
        .handler_mut::<ColorCompHandler>(NAME)?
        .register_cons(cons, params)
}
