//! Grid orchestration

pub mod grid;

pub use grid::{GridService, PageChooser};
