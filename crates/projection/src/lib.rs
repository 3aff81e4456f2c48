//! Planar projection for poster geometry.
//!
//! Geographic coordinates are projected into the local UTM zone before any
//! cropping or drawing happens.

pub mod utm;

pub use utm::UtmProjection;
