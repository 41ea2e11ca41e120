//! Read-only view on variable fixings at the current search node, and the
//! original → transformed variable hook.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque handle of a binary decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarRef(pub usize);

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Local bound state of the node being searched.
///
/// Implementations must answer consistently for the whole duration of one
/// detection call.
pub trait BoundOracle {
    fn is_fixed_to_zero(&self, var: VarRef) -> bool;

    fn is_fixed_to_one(&self, var: VarRef) -> bool;

    fn is_free(&self, var: VarRef) -> bool {
        !self.is_fixed_to_zero(var) && !self.is_fixed_to_one(var)
    }
}

/// Fired once when the problem moves from original to transformed space.
pub trait VarTransform {
    fn is_transformed(&self) -> bool;

    fn transformed_var(&self, var: VarRef) -> Option<VarRef>;
}

/// Transform handed to handlers at init and kept for later registrations.
pub type SharedTransform = Arc<dyn VarTransform + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fixing {
    #[default]
    Free,
    Zero,
    One,
}

impl Fixing {
    /// `0` and `1` fix the variable, anything else leaves it free.
    pub fn from_char(c: char) -> Self {
        match c {
            '0' => Fixing::Zero,
            '1' => Fixing::One,
            _ => Fixing::Free,
        }
    }
}

/// Fixings of every variable at one node, indexed by `VarRef`.
#[derive(Debug, Clone, Default)]
pub struct NodeFixings {
    fixings: Vec<Fixing>,
}

impl NodeFixings {
    pub fn new(nvars: usize) -> Self {
        Self {
            fixings: vec![Fixing::Free; nvars],
        }
    }

    pub fn from_fixings(fixings: Vec<Fixing>) -> Self {
        Self { fixings }
    }

    pub fn fix(&mut self, var: VarRef, fixing: Fixing) {
        if var.0 >= self.fixings.len() {
            self.fixings.resize(var.0 + 1, Fixing::Free);
        }
        self.fixings[var.0] = fixing;
    }

    pub fn get(&self, var: VarRef) -> Fixing {
        self.fixings.get(var.0).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fixings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixings.is_empty()
    }
}

impl BoundOracle for NodeFixings {
    fn is_fixed_to_zero(&self, var: VarRef) -> bool {
        self.get(var) == Fixing::Zero
    }

    fn is_fixed_to_one(&self, var: VarRef) -> bool {
        self.get(var) == Fixing::One
    }
}

/// Explicit original → transformed variable table.
#[derive(Debug, Clone, Default)]
pub struct VarMapping {
    transformed: bool,
    map: HashMap<VarRef, VarRef>,
}

impl VarMapping {
    /// Problem still in original space: nothing gets rebound.
    pub fn original() -> Self {
        Self::default()
    }

    /// Transformed problem where every variable keeps its handle.
    pub fn identity(nvars: usize) -> Self {
        Self {
            transformed: true,
            map: (0..nvars).map(|i| (VarRef(i), VarRef(i))).collect(),
        }
    }

    pub fn transformed(map: HashMap<VarRef, VarRef>) -> Self {
        Self {
            transformed: true,
            map,
        }
    }

    pub fn insert(&mut self, original: VarRef, transformed: VarRef) {
        self.transformed = true;
        self.map.insert(original, transformed);
    }
}

impl VarTransform for VarMapping {
    fn is_transformed(&self) -> bool {
        self.transformed
    }

    fn transformed_var(&self, var: VarRef) -> Option<VarRef> {
        self.map.get(&var).copied()
    }
}
