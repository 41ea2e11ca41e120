pub mod colorcomp;
pub mod makespan;
pub mod suborbitope;

pub use colorcomp::{ColorCompHandler, ComponentParams, ComponentStrategy};
pub use makespan::{MakespanHandler, MakespanParams};
pub use suborbitope::{PatternParams, SuborbitopeHandler};

use crate::config::HandlersConfig;
use crate::error::Result;
use crate::handler::HandlerRegistry;

/// Include the built-in handlers enabled in `config`.
pub fn include_default_handlers(registry: &mut HandlerRegistry, config: &HandlersConfig) -> Result<()> {
    if config.colorcomp {
        colorcomp::include(registry)?;
    }
    if config.makespan {
        makespan::include(registry)?;
    }
    if config.suborbitope {
        suborbitope::include(registry)?;
    }
    Ok(())
}
