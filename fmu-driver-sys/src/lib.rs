#![doc = include_str!("../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

#[cfg(feature = "fmi1")]
pub mod fmi1;
#[cfg(feature = "fmi2")]
pub mod fmi2;
pub mod logger;
