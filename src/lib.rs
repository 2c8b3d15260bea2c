// LAZYBENCH LIBRARY
// PURE-RUST CORE SHARED BY THE BINARY AND THE INTEGRATION TESTS

pub mod admission;
pub mod catalog;
pub mod controller;
pub mod error;
pub mod family;
pub mod matrix;
pub mod process;
pub mod report;
pub mod results;
pub mod samples;
pub mod store;
pub mod tuning;
