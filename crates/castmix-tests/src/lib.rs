//! Integration test crate for Castmix.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the castmix crates to verify they work together.


#[cfg(test)]
mod scenarios;

#[cfg(test)]
mod export;

#[cfg(test)]
mod session;
