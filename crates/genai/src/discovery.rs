use meridian_core::DeskError;
use serde::Serialize;

use crate::types::ModelEntry;

/// Known-free-tier models, in strict preference order. The first of these
/// present in the catalog wins regardless of catalog order.
pub const PRIORITY_MODELS: [&str; 4] = [
    "gemini-1.5-flash-001",
    "gemini-1.5-flash-002",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
];

/// Accepted only when nothing better is in the catalog.
const DEFAULT_MODEL: &str = "gemini-pro";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    PriorityMatch,
    FallbackMatch,
    LastResort,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedModel {
    pub model_id: String,
    pub reason: SelectionReason,
}

/// Picks a generation model from an already-fetched catalog.
///
/// Deterministic over its input: priority list first, then the first
/// catalog id containing "flash" that is neither a "latest" alias nor an
/// "exp" preview, then the generic default.
pub fn select_model(catalog: &[ModelEntry]) -> Result<SelectedModel, DeskError> {
    let usable: Vec<&ModelEntry> = catalog
        .iter()
        .filter(|entry| entry.supports_generation())
        .collect();

    for wanted in PRIORITY_MODELS {
        if usable.iter().any(|entry| entry.model_id() == wanted) {
            return Ok(SelectedModel {
                model_id: wanted.to_string(),
                reason: SelectionReason::PriorityMatch,
            });
        }
    }

    if let Some(entry) = usable.iter().find(|entry| {
        let id = entry.model_id();
        id.contains("flash") && !id.contains("latest") && !id.contains("exp")
    }) {
        return Ok(SelectedModel {
            model_id: entry.model_id().to_string(),
            reason: SelectionReason::FallbackMatch,
        });
    }

    if usable.iter().any(|entry| entry.model_id() == DEFAULT_MODEL) {
        return Ok(SelectedModel {
            model_id: DEFAULT_MODEL.to_string(),
            reason: SelectionReason::LastResort,
        });
    }

    Err(DeskError::NoModelAvailable)
}
