//! API data models

use serde::{Deserialize, Serialize};

use crate::media::SUPPORTED_UPLOAD_TYPES;
use crate::style::{LensProfile, ShotDynamic, StyleParams};

/// One selectable style value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StyleOption {
    pub id: String,
    pub label: String,
}

/// Everything a client needs to render its style pickers
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub lenses: Vec<StyleOption>,
    pub dynamics: Vec<StyleOption>,
    pub accepted_types: Vec<String>,
    pub defaults: StyleParams,
}

impl OptionsResponse {
    pub fn current() -> Self {
        Self {
            lenses: LensProfile::ALL
                .iter()
                .map(|lens| StyleOption {
                    id: lens.id().to_string(),
                    label: lens.label().to_string(),
                })
                .collect(),
            dynamics: ShotDynamic::ALL
                .iter()
                .map(|dynamic| StyleOption {
                    id: dynamic.id().to_string(),
                    label: dynamic.label().to_string(),
                })
                .collect(),
            accepted_types: SUPPORTED_UPLOAD_TYPES.iter().map(|t| t.to_string()).collect(),
            defaults: StyleParams::default(),
        }
    }
}

/// Parsed multipart body of `POST /api/process`
#[derive(Debug, Default)]
pub struct ProcessForm {
    pub image: Option<(String, Vec<u8>)>,
    pub location: Option<String>,
    pub lens: Option<String>,
    pub dynamic: Option<String>,
    pub include_interiors: Option<String>,
}

impl ProcessForm {
    /// Unknown or missing style ids fall back to the defaults.
    /// Interiors are only included for the literal value "true".
    pub fn style(&self) -> StyleParams {
        let location = self
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| StyleParams::default().location);

        StyleParams {
            lens: self.lens.as_deref().map(LensProfile::resolve).unwrap_or_default(),
            dynamic: self.dynamic.as_deref().map(ShotDynamic::resolve).unwrap_or_default(),
            location,
            include_interiors: self.include_interiors.as_deref() == Some("true"),
        }
    }
}
