//! Small helpers shared by the cpmsim crates.

pub mod hexprint;
