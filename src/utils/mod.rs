//! Utility functions and types

pub mod data_loader;
mod parallel;

pub use data_loader::{class_counts, DataLoader, Dataset, NumericTable};
pub use parallel::{derive_seed, with_thread_pool};
