pub use tracing::{
    Level,
    debug,
    error,
    event,
    info,
    trace,
    warn,
};
pub use tracing_core::LevelFilter;
