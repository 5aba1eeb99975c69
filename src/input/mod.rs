//! External input sources.
//!
//! Current input sources:
//! - `mqtt`: occupancy counts published by the vision sensor

pub mod mqtt;
