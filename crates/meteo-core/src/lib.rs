//! Hardware-independent core library for meteo-rs
//!
//! This crate contains all platform-agnostic logic for the weather station
//! node: register-level sensor drivers, light sensor auto-detection, the
//! sensor aggregator, network-corrected time keeping, the CSV sample log
//! format and the HTTP presentation layer.
//!
//! It is `no_std` with `extern crate alloc` so it compiles on both embedded
//! targets and desktop hosts (for the station simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod async_i2c_bus;
pub mod bus;
pub mod config;
pub mod sensors;
pub mod storage;
pub mod time;
pub mod web;

#[cfg(test)]
pub(crate) mod mock;
