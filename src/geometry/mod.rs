//! Scene primitives

pub mod triangle;

pub use triangle::Triangle;
