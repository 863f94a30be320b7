//! Style parameters: lens profiles, shot dynamics and the per-pass snapshot

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_LOCATION: &str = "Local waterways";

/// Camera/lens treatment for the generated shot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LensProfile {
    #[default]
    WideImmersive,
    ActionZoom,
    LuxuryShowcase,
}

impl LensProfile {
    pub const ALL: [LensProfile; 3] = [
        LensProfile::WideImmersive,
        LensProfile::ActionZoom,
        LensProfile::LuxuryShowcase,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            LensProfile::WideImmersive => "wide-immersive",
            LensProfile::ActionZoom => "action-zoom",
            LensProfile::LuxuryShowcase => "luxury-showcase",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LensProfile::WideImmersive => "Wide Immersive",
            LensProfile::ActionZoom => "Action Zoom",
            LensProfile::LuxuryShowcase => "Luxury Showcase",
        }
    }

    /// Prompt phrase for this profile
    pub fn directive(&self) -> &'static str {
        match self {
            LensProfile::WideImmersive => {
                "Shot on a 24mm wide-angle lens from just above the waterline, immersive perspective with open sky and a distant horizon."
            }
            LensProfile::ActionZoom => {
                "Shot on a 200mm telephoto lens with compressed perspective, tight framing on the hull and a fast shutter freezing spray against a softly blurred background."
            }
            LensProfile::LuxuryShowcase => {
                "Shot on a 50mm prime lens at a flattering three-quarter angle, editorial yacht-brochure composition with refined, elegant styling."
            }
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id.trim())
    }

    /// Unrecognized ids fall back to the default profile
    pub fn resolve(id: &str) -> Self {
        Self::from_id(id).unwrap_or_default()
    }
}

impl fmt::Display for LensProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// What the boat is doing in the generated shot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ShotDynamic {
    #[default]
    Running,
    Anchored,
    Harbor,
}

impl ShotDynamic {
    pub const ALL: [ShotDynamic; 3] = [
        ShotDynamic::Running,
        ShotDynamic::Anchored,
        ShotDynamic::Harbor,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ShotDynamic::Running => "running",
            ShotDynamic::Anchored => "anchored",
            ShotDynamic::Harbor => "harbor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShotDynamic::Running => "Running",
            ShotDynamic::Anchored => "Anchored",
            ShotDynamic::Harbor => "Harbor",
        }
    }

    /// Prompt phrase for this dynamic
    pub fn directive(&self) -> &'static str {
        match self {
            ShotDynamic::Running => {
                "The boat is underway at cruising speed, bow slightly raised, carving a clean white wake with natural spray."
            }
            ShotDynamic::Anchored => {
                "The boat sits at anchor in calm, gently rippling water with soft reflections beneath the hull."
            }
            ShotDynamic::Harbor => {
                "The boat is moored alongside a marina dock in a picturesque harbor, calm water and waterfront ambience around it."
            }
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.id() == id.trim())
    }

    /// Unrecognized ids fall back to the default dynamic
    pub fn resolve(id: &str) -> Self {
        Self::from_id(id).unwrap_or_default()
    }
}

impl fmt::Display for ShotDynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Style selection captured once per orchestrator pass.
///
/// The orchestrator receives this by value, so changes made to the selection
/// after a pass starts only affect later passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleParams {
    pub lens: LensProfile,
    pub dynamic: ShotDynamic,
    pub location: String,
    pub include_interiors: bool,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            lens: LensProfile::default(),
            dynamic: ShotDynamic::default(),
            location: DEFAULT_LOCATION.to_string(),
            include_interiors: false,
        }
    }
}

impl StyleParams {
    pub fn with_lens(mut self, lens: LensProfile) -> Self {
        self.lens = lens;
        self
    }

    pub fn with_dynamic(mut self, dynamic: ShotDynamic) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_interiors(mut self, include_interiors: bool) -> Self {
        self.include_interiors = include_interiors;
        self
    }
}
