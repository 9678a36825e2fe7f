//! Helpers shared by the unit tests: throwaway chains on sled or in memory,
//! and one-call transfers.

pub mod test_utils;

pub use test_utils::*;
