//! Stage 2 prompt assembly

use super::analysis::BoatInsights;
use crate::style::StyleParams;

pub const TRANSFORMATION_DIRECTIVE: &str = "Transform this boat from a trailer photo into a professional on-water marketing photograph. Place the exact same boat floating naturally on open water, with the trailer, tow vehicle, parking lot and every piece of dealership clutter completely removed.";

pub const REINFORCEMENT_CLAUSE: &str = "Keep the hull shape, proportions, colors, graphics, windshield, railings and engines identical to the source boat. The hull must sit in the water at a realistic waterline with no trailer fragments, bunks, rollers or straps anywhere in frame.";

pub const INTERIOR_CLAUSE: &str = "Use a slightly elevated angle that showcases the cockpit, seating and deck layout.";

pub const EXTERIOR_CLAUSE: &str = "Focus on the exterior profile of the boat.";

pub const QUALITY_CLAUSE: &str = "Photorealistic professional marine photography, natural golden-hour lighting, accurate water physics with believable wake, spray and reflections, sharp focus, high dynamic range, magazine-quality detail.";

const FALLBACK_OVERVIEW: &str = "the boat exactly as it appears in the source photo";
const FALLBACK_FOCAL_POINTS: &str = "hull lines, color scheme, decals and deck hardware";

/// Build the single natural-language prompt sent to the image model
pub fn build_generation_prompt(style: &StyleParams, insights: &BoatInsights) -> String {
    let location = style.location.trim();

    let overview = insights.boat_overview.as_deref().unwrap_or(FALLBACK_OVERVIEW);
    let focal_points = insights.focal_points.as_deref().unwrap_or(FALLBACK_FOCAL_POINTS);
    let location_adaptation = match insights.location_adaptation.as_deref() {
        Some(text) => text.to_string(),
        None => format!(
            "match the water color, light and shoreline character typical of {}",
            location
        ),
    };

    let showcase = if style.include_interiors {
        INTERIOR_CLAUSE
    } else {
        EXTERIOR_CLAUSE
    };

    [
        TRANSFORMATION_DIRECTIVE.to_string(),
        format!("Location: {}.", location),
        style.lens.directive().to_string(),
        style.dynamic.directive().to_string(),
        format!("Boat: {}.", overview),
        format!("Preserve these details: {}.", focal_points),
        format!("Scene styling: {}.", location_adaptation),
        format!("{} {}", REINFORCEMENT_CLAUSE, showcase),
        QUALITY_CLAUSE.to_string(),
    ]
    .join("\n")
}
