pub mod hr;
pub mod spo2;
pub mod stability;

pub use hr::*;
pub use spo2::*;
pub use stability::*;
