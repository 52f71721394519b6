// src/lib.rs

#[macro_use]
pub mod macros;

pub mod config;
pub mod core;
pub mod error;
pub mod log;

pub mod catalog;
pub mod table;
pub mod store;
pub mod cache;
pub mod records;

pub mod fields;
pub mod reports;

pub mod csv;
pub mod data;
pub mod file;
pub mod progress;
pub mod runner;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};
