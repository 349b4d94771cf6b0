//! Grid Traffic Library
//!
//! Road-tile topology, lane graph and vehicle simulation core for a
//! grid-based city builder. Rendering is delegated to an external backend.

pub mod simulation;
