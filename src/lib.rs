//! Sensor descriptions for RCT Power inverters and batteries.
//!
//! [`entities`] lists which registers of the device are exposed as sensors, how they are named
//! and how often they should be refreshed. [`state`] turns the raw register values read from the
//! device into the reported sensor state, and [`registers`] is the catalogue of registers those
//! descriptions refer to.

pub mod commands;
pub mod config;
pub mod device_info;
pub mod entities;
pub mod output;
pub mod registers;
pub mod state;
