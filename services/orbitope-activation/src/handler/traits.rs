use std::any::Any;

use crate::bounds::{BoundOracle, SharedTransform};
use crate::error::Result;
use crate::payload::ConstraintId;
use crate::submatrix::SubmatrixList;

/// Capability set of an activation handler.
///
/// Only `find_activation_data` is mandatory; every other callback defaults to
/// a no-op.
pub trait ActivationHandler: Any {
    /// Fresh handler for a sub-solver, or `None` if the handler is not copied.
    /// Registered payloads are not carried over.
    fn copy(&self) -> Option<Box<dyn ActivationHandler>> {
        None
    }

    /// Release handler-local state before the handler is destroyed.
    fn free(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once the problem has been transformed.
    fn init(&mut self, _transform: &SharedTransform) -> Result<()> {
        Ok(())
    }

    /// Called before the transformed problem is freed.
    fn exit(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_active(&self, _cons: ConstraintId) -> bool {
        false
    }

    /// Detect submatrices activated by the fixings in `bounds`.
    ///
    /// Returns an empty list when nothing is registered for `cons`.
    fn find_activation_data(
        &mut self,
        cons: ConstraintId,
        bounds: &dyn BoundOracle,
    ) -> Result<SubmatrixList>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
