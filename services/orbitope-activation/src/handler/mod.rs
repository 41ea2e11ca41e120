pub mod record;
pub mod registry;
pub mod traits;

pub use record::HandlerRecord;
pub use registry::HandlerRegistry;
pub use traits::ActivationHandler;
