pub mod bandpass;

pub use bandpass::*;
