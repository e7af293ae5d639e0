// Grid state store: owns the grid, runs, and autosave

pub mod backend;
pub mod runner;
pub mod store;

pub use backend::{data_dir, open_backend};
pub use runner::{RunCompletion, RunScheduler};
pub use store::{GridStateStore, StartupSource};
