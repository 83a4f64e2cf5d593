//! Observability utilities: subscriber setup and span timing.

mod logging;
mod timer;

pub use logging::init_tracing;
pub use timer::SpanTimer;
