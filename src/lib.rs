#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod layout;
pub mod model;
pub mod render;
pub mod text_metrics;
pub mod theme;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::DocumentError;
pub use model::{Node, NodeId, Workspace};
