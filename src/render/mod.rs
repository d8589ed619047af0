//! Grid markup rendering

pub mod grid;

pub use grid::{render, ROW_START};
