pub mod config;
pub mod detectors;
pub mod error;
pub mod filters;
pub mod frequency;
pub mod io;
pub mod metrics;
pub mod monitor;
pub mod packet;
pub mod pipeline;
pub mod plot;
pub mod signal;
pub mod source;
pub mod synth;
pub mod window;

pub use config::PulseConfig;
pub use detectors::*;
pub use error::EstimateError;
pub use metrics::*;
pub use signal::*;
