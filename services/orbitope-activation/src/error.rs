//! Error taxonomy shared by the handler registry, payload management and detectors

use thiserror::Error;

use crate::bounds::VarRef;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("activation handler <{0}> already included")]
    DuplicateName(String),

    #[error("could not find activation handler <{0}>")]
    NotFound(String),

    #[error("activation handler <{0}> already initialized")]
    AlreadyInitialized(String),

    #[error("activation handler <{0}> not initialized")]
    NotInitialized(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    #[error("no transformed counterpart for variable {0}")]
    UnknownVariable(VarRef),
}

pub type Result<T> = std::result::Result<T, ActivationError>;

/// Reserve exactly `len` slots up front so a failed allocation is reported
/// instead of aborting the process.
pub(crate) fn alloc_vec<T>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| ActivationError::AllocationFailure(format!("{} ({} entries): {}", what, len, e)))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ActivationError::DuplicateName("colorcomp".to_string());
        assert_eq!(err.to_string(), "activation handler <colorcomp> already included");

        let err = ActivationError::UnknownVariable(VarRef(7));
        assert_eq!(err.to_string(), "no transformed counterpart for variable x7");
    }

    #[test]
    fn test_alloc_vec_reserves() {
        let v: Vec<u32> = alloc_vec(16, "test buffer").unwrap();
        assert!(v.capacity() >= 16);
        assert!(v.is_empty());

        let err = alloc_vec::<u64>(usize::MAX, "huge buffer").unwrap_err();
        assert!(matches!(err, ActivationError::AllocationFailure(_)));
    }
}
