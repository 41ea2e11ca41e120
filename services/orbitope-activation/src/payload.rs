//! Per-constraint payload bookkeeping shared by every built-in handler

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::bounds::{SharedTransform, VarTransform};
use crate::error::Result;

/// Identity of a symmetry constraint owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u64);

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cons#{}", self.0)
    }
}

/// Detector-specific data stored for one constraint.
pub trait Payload {
    /// Swap every stored variable for its transformed counterpart.
    fn rebind(&mut self, transform: &dyn VarTransform) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarSpace {
    Original,
    Transformed,
}

#[derive(Debug)]
struct Entry<P> {
    payload: P,
    space: VarSpace,
}

/// Constraint → payload map; at most one payload per constraint.
///
/// Once a transform has been applied, it is kept so that payloads registered
/// afterwards are rebound on arrival.
pub struct PayloadMap<P> {
    entries: BTreeMap<ConstraintId, Entry<P>>,
    transform: Option<SharedTransform>,
}

impl<P: fmt::Debug> fmt::Debug for PayloadMap<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadMap")
            .field("entries", &self.entries)
            .field("transformed", &self.transform.is_some())
            .finish()
    }
}

impl<P> Default for PayloadMap<P> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            transform: None,
        }
    }
}

impl<P: Payload> PayloadMap<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `payload` for `cons`, dropping any payload registered before.
    ///
    /// The payload is expected to reference original-space variables. After
    /// a transform it is rebound before being stored; if that fails, the
    /// previous payload stays in place.
    pub fn register(&mut self, cons: ConstraintId, mut payload: P) -> Result<()> {
        let space = match &self.transform {
            Some(transform) => {
                payload.rebind(transform.as_ref())?;
                VarSpace::Transformed
            }
            None => VarSpace::Original,
        };

        let previous = self.entries.insert(cons, Entry { payload, space });
        if previous.is_some() {
            debug!("Replaced activation payload for {}", cons);
        } else {
            debug!("Registered activation payload for {}", cons);
        }
        Ok(())
    }

    pub fn get(&self, cons: ConstraintId) -> Option<&P> {
        self.entries.get(&cons).map(|e| &e.payload)
    }

    pub fn get_mut(&mut self, cons: ConstraintId) -> Option<&mut P> {
        self.entries.get_mut(&cons).map(|e| &mut e.payload)
    }

    pub fn contains(&self, cons: ConstraintId) -> bool {
        self.entries.contains_key(&cons)
    }

    pub fn is_transformed(&self, cons: ConstraintId) -> bool {
        self.entries
            .get(&cons)
            .map(|e| e.space == VarSpace::Transformed)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebind every payload still in original space and keep `transform` for
    /// later registrations.
    ///
    /// Does nothing while the problem is untransformed; payloads already
    /// rebound are skipped, so repeated calls are harmless. Returns the number
    /// of payloads rebound by this call.
    pub fn rebind_after_transform(&mut self, transform: &SharedTransform) -> Result<usize> {
        if !transform.is_transformed() {
            return Ok(0);
        }

        let mut rebound = 0;
        for (cons, entry) in self.entries.iter_mut() {
            if entry.space == VarSpace::Transformed {
                continue;
            }
            entry.payload.rebind(transform.as_ref())?;
            entry.space = VarSpace::Transformed;
            debug!("Rebound payload of {} to transformed variables", cons);
            rebound += 1;
        }

        self.transform = Some(transform.clone());
        Ok(rebound)
    }

    /// Drop every payload and clear the map.
    pub fn release_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{VarMapping, VarRef};
    use crate::error::ActivationError;
    use crate::matrix::{sequential_rows, VarMatrix};
    use std::sync::Arc;

    struct MatrixPayload {
        matrix: VarMatrix,
    }

    impl Payload for MatrixPayload {
        fn rebind(&mut self, transform: &dyn VarTransform) -> Result<()> {
            self.matrix.rebind(transform)
        }
    }

    fn payload(nrows: usize, ncols: usize) -> MatrixPayload {
        MatrixPayload {
            matrix: VarMatrix::from_rows(&sequential_rows(nrows, ncols)).unwrap(),
        }
    }

    fn shifted_mapping(nvars: usize, offset: usize) -> SharedTransform {
        let mut mapping = VarMapping::default();
        for i in 0..nvars {
            mapping.insert(VarRef(i), VarRef(i + offset));
        }
        Arc::new(mapping)
    }

    #[test]
    fn test_register_replaces() {
        let mut map = PayloadMap::new();
        map.register(ConstraintId(1), payload(2, 2)).unwrap();
        map.register(ConstraintId(1), payload(3, 2)).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(ConstraintId(1)).unwrap().matrix.nrows(), 3);
        assert!(map.get(ConstraintId(2)).is_none());
    }

    #[test]
    fn test_rebind_is_idempotent() {
        let mut map = PayloadMap::new();
        map.register(ConstraintId(1), payload(1, 2)).unwrap();
        let mapping = shifted_mapping(2, 10);

        assert_eq!(map.rebind_after_transform(&mapping).unwrap(), 1);
        let once = map.get(ConstraintId(1)).unwrap().matrix.clone();

        assert_eq!(map.rebind_after_transform(&mapping).unwrap(), 0);
        let twice = map.get(ConstraintId(1)).unwrap().matrix.clone();

        assert_eq!(once, twice);
        assert_eq!(twice.row(0), &[VarRef(10), VarRef(11)]);
        assert!(map.is_transformed(ConstraintId(1)));
    }

    #[test]
    fn test_rebind_skipped_in_original_space() {
        let mut map = PayloadMap::new();
        map.register(ConstraintId(1), payload(1, 2)).unwrap();

        let original: SharedTransform = Arc::new(VarMapping::original());
        assert_eq!(map.rebind_after_transform(&original).unwrap(), 0);
        assert!(!map.is_transformed(ConstraintId(1)));
        assert_eq!(map.get(ConstraintId(1)).unwrap().matrix.get(0, 1), VarRef(1));

        // later registrations stay in original space as well
        map.register(ConstraintId(2), payload(1, 2)).unwrap();
        assert!(!map.is_transformed(ConstraintId(2)));
    }

    #[test]
    fn test_register_after_transform_rebinds() {
        let mut map = PayloadMap::new();
        map.rebind_after_transform(&shifted_mapping(4, 100)).unwrap();

        map.register(ConstraintId(1), payload(2, 2)).unwrap();
        assert!(map.is_transformed(ConstraintId(1)));
        assert_eq!(
            map.get(ConstraintId(1)).unwrap().matrix.row(1),
            &[VarRef(102), VarRef(103)]
        );
        // nothing left to rebind
        assert_eq!(map.rebind_after_transform(&shifted_mapping(4, 100)).unwrap(), 0);
    }

    #[test]
    fn test_register_after_transform_unknown_variable() {
        let mut map = PayloadMap::new();
        map.rebind_after_transform(&shifted_mapping(2, 100)).unwrap();
        map.register(ConstraintId(1), payload(1, 2)).unwrap();

        let err = map.register(ConstraintId(1), payload(2, 2)).unwrap_err();
        assert_eq!(err, ActivationError::UnknownVariable(VarRef(2)));
        assert_eq!(map.get(ConstraintId(1)).unwrap().matrix.nrows(), 1);
    }

    #[test]
    fn test_release_all() {
        let mut map = PayloadMap::new();
        map.register(ConstraintId(1), payload(1, 1)).unwrap();
        map.register(ConstraintId(2), payload(1, 1)).unwrap();

        assert_eq!(map.release_all(), 2);
        assert!(map.is_empty());
    }
}
