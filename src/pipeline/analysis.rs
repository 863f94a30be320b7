//! Stage 1: source photo assessment and parsing of the model's answer

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const FALLBACK_SUMMARY: &str = "Boat analyzed; no structured assessment was returned.";
pub const FALLBACK_REJECTION_REASON: &str = "The photo cannot be used to stage the boat on the water.";

/// Structured notes about the boat that steer generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoatInsights {
    #[serde(default, deserialize_with = "text_or_list", skip_serializing_if = "Option::is_none")]
    pub boat_overview: Option<String>,

    #[serde(default, deserialize_with = "text_or_list", skip_serializing_if = "Option::is_none")]
    pub focal_points: Option<String>,

    #[serde(default, deserialize_with = "text_or_list", skip_serializing_if = "Option::is_none")]
    pub location_adaptation: Option<String>,
}

impl BoatInsights {
    pub fn is_empty(&self) -> bool {
        self.boat_overview.is_none() && self.focal_points.is_none() && self.location_adaptation.is_none()
    }
}

/// Parsed stage-1 answer
#[derive(Debug, Clone, PartialEq)]
pub struct BoatAnalysis {
    pub should_reject: bool,
    pub rejection_reason: Option<String>,
    pub summary: String,
    pub insights: BoatInsights,
}

impl Default for BoatAnalysis {
    fn default() -> Self {
        Self {
            should_reject: false,
            rejection_reason: None,
            summary: FALLBACK_SUMMARY.to_string(),
            insights: BoatInsights::default(),
        }
    }
}

impl BoatAnalysis {
    /// Reason to report when the photo is rejected
    pub fn rejection_reason(&self) -> String {
        self.rejection_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(FALLBACK_REJECTION_REASON)
            .to_string()
    }
}

/// Instruction sent with the source photo
pub fn analysis_instruction(location: &str) -> String {
    format!(
        r#"You are preparing a dealership photo of a boat for an on-water marketing shot set in "{location}".

Inspect the photo and decide whether the boat can be cleanly staged on the water:
- Identify the trailer, tow vehicle, straps, jack stands, pavement, fences, price stickers and other dealership clutter that must be removed.
- Reject the photo only if the boat itself is not clearly visible, is heavily cropped, or is too obstructed to reconstruct faithfully.

Respond with a single JSON object and nothing else:
{{
  "shouldReject": false,
  "rejectionReason": "why the photo cannot be used, or empty",
  "summary": "one or two sentences describing the boat and what must be removed",
  "insights": {{
    "boatOverview": "make, hull type, size class, colors and graphics",
    "focalPoints": "the visual details that must be preserved exactly",
    "locationAdaptation": "how water color, light and scenery should reflect {location}"
  }}
}}"#
    )
}

/// Find the first balanced `{...}` span in free text.
///
/// Braces inside JSON string literals are ignored. When a `{` never closes the
/// scan moves on to the next one.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..=i]);
                    }
                }
                _ => {}
            }
        }

        search_from = start + 1;
    }

    None
}

/// Parse the model's stage-1 answer, degrading to a non-rejecting default.
///
/// Fields are read one at a time so a null or mistyped secondary field never
/// hides `shouldReject`.
pub fn parse_analysis(text: &str) -> BoatAnalysis {
    let Some(candidate) = extract_json_object(text) else {
        warn!("Analysis response contained no JSON object, using default assessment");
        return BoatAnalysis::default();
    };

    let fields = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            warn!("Analysis JSON was not an object, using default assessment");
            return BoatAnalysis::default();
        }
        Err(e) => {
            warn!("Failed to parse analysis JSON ({}), using default assessment", e);
            return BoatAnalysis::default();
        }
    };

    let should_reject = match fields.get("shouldReject") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    let rejection_reason = fields
        .get("rejectionReason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    let summary = fields
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_SUMMARY)
        .to_string();

    let insights = match fields.get("insights") {
        Some(value @ Value::Object(_)) => BoatInsights::deserialize(value).unwrap_or_else(|e| {
            warn!("Ignoring malformed insights ({})", e);
            BoatInsights::default()
        }),
        _ => BoatInsights::default(),
    };

    debug!("Parsed analysis: reject={} summary={}", should_reject, summary);
    BoatAnalysis {
        should_reject,
        rejection_reason,
        summary,
        insights,
    }
}

/// Accept either a string or a list of strings; blanks become `None`
fn text_or_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        Some(Value::String(s)) => s,
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };

    let text = text.trim();
    Ok(if text.is_empty() { None } else { Some(text.to_string()) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        let text = r#"{"shouldReject": false}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_from_markdown_and_prose() {
        let text = "Here is my assessment:\n```json\n{\"summary\": \"ok\", \"insights\": {\"focalPoints\": \"rails\"}}\n```\nThanks!";
        assert_eq!(
            extract_json_object(text),
            Some("{\"summary\": \"ok\", \"insights\": {\"focalPoints\": \"rails\"}}")
        );
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"summary": "hull has a } shaped decal \" and {", "shouldReject": false} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"summary": "hull has a } shaped decal \" and {", "shouldReject": false}"#)
        );
    }

    #[test]
    fn test_extract_none() {
        assert_eq!(extract_json_object("no structure here"), None);
        assert_eq!(extract_json_object("{ never closed"), None);
    }

    #[test]
    fn test_parse_full_analysis() {
        let text = r#"{
            "shouldReject": false,
            "rejectionReason": "",
            "summary": "White center console on a bunk trailer.",
            "insights": {
                "boatOverview": "22ft center console",
                "focalPoints": ["T-top", "twin outboards"],
                "locationAdaptation": "turquoise shallows"
            }
        }"#;

        let analysis = parse_analysis(text);
        assert!(!analysis.should_reject);
        assert_eq!(analysis.summary, "White center console on a bunk trailer.");
        assert_eq!(analysis.insights.boat_overview.as_deref(), Some("22ft center console"));
        assert_eq!(analysis.insights.focal_points.as_deref(), Some("T-top, twin outboards"));
        assert_eq!(analysis.insights.location_adaptation.as_deref(), Some("turquoise shallows"));
    }

    #[test]
    fn test_parse_rejection() {
        let analysis = parse_analysis(r#"{"shouldReject": true, "rejectionReason": "trailer visible"}"#);
        assert!(analysis.should_reject);
        assert_eq!(analysis.rejection_reason(), "trailer visible");

        let no_reason = parse_analysis(r#"{"shouldReject": true}"#);
        assert_eq!(no_reason.rejection_reason(), FALLBACK_REJECTION_REASON);
    }

    #[test]
    fn test_malformed_analysis_degrades_to_default() {
        let analysis = parse_analysis("I think the boat looks great, no JSON for you.");
        assert!(!analysis.should_reject);
        assert!(analysis.insights.is_empty());

        let broken = parse_analysis(r#"{"shouldReject": "maybe", "summary": 12}"#);
        assert_eq!(broken, BoatAnalysis::default());
    }

    #[test]
    fn test_rejection_survives_null_fields() {
        let analysis = parse_analysis(
            r#"{"shouldReject": true, "rejectionReason": "trailer visible", "summary": null, "insights": null}"#,
        );
        assert!(analysis.should_reject);
        assert_eq!(analysis.rejection_reason(), "trailer visible");
        assert_eq!(analysis.summary, FALLBACK_SUMMARY);
        assert!(analysis.insights.is_empty());
    }

    #[test]
    fn test_null_insights_on_accepted_photo() {
        let analysis = parse_analysis(r#"{"shouldReject": false, "summary": "Grey pontoon", "insights": null}"#);
        assert!(!analysis.should_reject);
        assert_eq!(analysis.summary, "Grey pontoon");
        assert!(analysis.insights.is_empty());
    }

    #[test]
    fn test_blank_insights_become_none() {
        let analysis = parse_analysis(r#"{"summary": "s", "insights": {"boatOverview": "  ", "focalPoints": []}}"#);
        assert!(analysis.insights.is_empty());
    }

    #[test]
    fn test_empty_insights_serialize_as_empty_object() {
        let json = serde_json::to_value(BoatInsights::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
