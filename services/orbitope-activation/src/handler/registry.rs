use tracing::{info, warn};

use super::record::HandlerRecord;
use super::traits::ActivationHandler;
use crate::bounds::{BoundOracle, SharedTransform};
use crate::error::{ActivationError, Result};
use crate::payload::ConstraintId;
use crate::submatrix::SubmatrixList;

/// Activation handlers of one solver instance, in registration order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    records: Vec<HandlerRecord>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, name: &str, desc: &str, handler: Box<dyn ActivationHandler>) -> Result<()> {
        if self.position(name).is_some() {
            return Err(ActivationError::DuplicateName(name.to_string()));
        }
        self.records.push(HandlerRecord::new(name, desc, handler));
        info!("Included activation handler <{}>: {}", name, desc);
        Ok(())
    }

    pub fn find(&self, name: &str) -> Result<&HandlerRecord> {
        self.records
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| ActivationError::NotFound(name.to_string()))
    }

    pub fn find_mut(&mut self, name: &str) -> Result<&mut HandlerRecord> {
        self.records
            .iter_mut()
            .find(|r| r.name() == name)
            .ok_or_else(|| ActivationError::NotFound(name.to_string()))
    }

    /// Typed access to a handler; `NotFound` if the name is unknown or the
    /// handler stored under it is of a different type.
    pub fn handler<T: ActivationHandler>(&self, name: &str) -> Result<&T> {
        self.find(name)?
            .handler()
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| ActivationError::NotFound(name.to_string()))
    }

    pub fn handler_mut<T: ActivationHandler>(&mut self, name: &str) -> Result<&mut T> {
        self.find_mut(name)?
            .handler_mut()
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| ActivationError::NotFound(name.to_string()))
    }

    pub fn init(&mut self, name: &str, transform: SharedTransform) -> Result<()> {
        self.find_mut(name)?.init(&transform)
    }

    pub fn exit(&mut self, name: &str) -> Result<()> {
        self.find_mut(name)?.exit()
    }

    pub fn init_all(&mut self, transform: SharedTransform) -> Result<()> {
        for record in self.records.iter_mut() {
            record.init(&transform)?;
        }
        Ok(())
    }

    pub fn exit_all(&mut self) -> Result<()> {
        for record in self.records.iter_mut() {
            record.exit()?;
        }
        Ok(())
    }

    /// Destroy a handler. It must not be initialized.
    pub fn free(&mut self, name: &str) -> Result<()> {
        let idx = self
            .position(name)
            .ok_or_else(|| ActivationError::NotFound(name.to_string()))?;
        self.records[idx].free()?;
        self.records.remove(idx);
        info!("Freed activation handler <{}>", name);
        Ok(())
    }

    /// Exit every initialized handler, then free all of them.
    pub fn shutdown(&mut self) -> Result<()> {
        for record in self.records.iter_mut().filter(|r| r.is_initialized()) {
            record.exit()?;
        }
        while let Some(record) = self.records.first() {
            let name = record.name().to_string();
            self.free(&name)?;
        }
        Ok(())
    }

    /// Include copies of every copyable handler into `target`.
    ///
    /// Handlers whose name already exists in `target` are skipped. Returns the
    /// number of handlers copied.
    pub fn copy_into(&self, target: &mut HandlerRegistry) -> Result<usize> {
        let mut copied = 0;
        for record in &self.records {
            let Some(copy) = record.copy() else {
                continue;
            };
            if target.position(copy.name()).is_some() {
                warn!("Activation handler <{}> already present in target, not copied", copy.name());
                continue;
            }
            info!("Copied activation handler <{}>", copy.name());
            target.records.push(copy);
            copied += 1;
        }
        Ok(copied)
    }

    pub fn is_active(&self, name: &str, cons: ConstraintId) -> Result<bool> {
        Ok(self.find(name)?.is_active(cons))
    }

    pub fn find_activation_data(
        &mut self,
        name: &str,
        cons: ConstraintId,
        bounds: &dyn BoundOracle,
    ) -> Result<SubmatrixList> {
        self.find_mut(name)?.find_activation_data(cons, bounds)
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HandlerRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name() == name)
    }
}
