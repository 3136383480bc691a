pub mod cli;
pub mod driver;
pub mod engine;
pub mod handoff;
pub mod metrics;
pub mod net;
pub mod pool;
pub mod snapshot;
pub mod wire;

pub mod prelude {
    pub use crate::cli::*;
    pub use crate::engine::book::*;
    pub use crate::engine::error::*;
    pub use crate::engine::matching::*;
    pub use crate::engine::types::*;
    pub use crate::handoff::*;
    pub use crate::pool::*;
    pub use crate::wire::*;
}
