use tracing::debug;

use super::traits::ActivationHandler;
use crate::bounds::{BoundOracle, SharedTransform};
use crate::error::{ActivationError, Result};
use crate::payload::ConstraintId;
use crate::submatrix::SubmatrixList;

/// A handler plus its identity and lifecycle flag.
pub struct HandlerRecord {
    name: String,
    desc: String,
    handler: Box<dyn ActivationHandler>,
    initialized: bool,
}

impl std::fmt::Debug for HandlerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("name", &self.name)
            .field("desc", &self.desc)
            .field("handler", &"<dyn ActivationHandler>")
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl HandlerRecord {
    pub fn new(name: &str, desc: &str, handler: Box<dyn ActivationHandler>) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            handler,
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn handler(&self) -> &dyn ActivationHandler {
        self.handler.as_ref()
    }

    pub fn handler_mut(&mut self) -> &mut dyn ActivationHandler {
        self.handler.as_mut()
    }

    pub fn init(&mut self, transform: &SharedTransform) -> Result<()> {
        if self.initialized {
            return Err(ActivationError::AlreadyInitialized(self.name.clone()));
        }
        self.handler.init(transform)?;
        self.initialized = true;
        debug!("Initialized activation handler <{}>", self.name);
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(ActivationError::NotInitialized(self.name.clone()));
        }
        self.handler.exit()?;
        self.initialized = false;
        debug!("Exited activation handler <{}>", self.name);
        Ok(())
    }

    /// Run the handler's destructor. Only allowed while not initialized.
    pub(crate) fn free(&mut self) -> Result<()> {
        if self.initialized {
            return Err(ActivationError::AlreadyInitialized(self.name.clone()));
        }
        self.handler.free()
    }

    pub fn is_active(&self, cons: ConstraintId) -> bool {
        self.handler.is_active(cons)
    }

    pub fn find_activation_data(
        &mut self,
        cons: ConstraintId,
        bounds: &dyn BoundOracle,
    ) -> Result<SubmatrixList> {
        self.handler.find_activation_data(cons, bounds)
    }

    /// Copy for a sub-solver, keeping name and description.
    pub(crate) fn copy(&self) -> Option<HandlerRecord> {
        self.handler
            .copy()
            .map(|handler| HandlerRecord::new(&self.name, &self.desc, handler))
    }
}
