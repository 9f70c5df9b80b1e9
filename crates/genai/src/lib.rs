pub mod client;
pub mod discovery;
pub mod types;

pub use client::{GeminiClient, DEFAULT_API_BASE};
pub use discovery::{select_model, SelectedModel, SelectionReason, PRIORITY_MODELS};
pub use types::{ModelCatalog, ModelEntry};
