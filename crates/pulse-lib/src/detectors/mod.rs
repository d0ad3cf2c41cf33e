pub mod ppg;

pub use ppg::*;
