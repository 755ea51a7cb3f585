//! Creative recommendations for low-performing campaigns

use super::parse::{array_field, parse_object, ParseError};
use serde::{Deserialize, Serialize};

/// One proposed creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeVariation {
    /// Format, e.g. "video" or "carousel"
    pub creative_type: String,
    /// Headline copy
    pub headline: String,
    /// Body copy
    pub message: String,
    /// Call to action
    pub cta: String,
    /// Why this variation should help
    #[serde(default)]
    pub rationale: String,
    /// Expected effect, free text
    #[serde(default)]
    pub expected_improvement: String,
}

/// Creative variations proposed for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeRecommendation {
    /// Campaign the variations are for
    pub campaign_name: String,
    /// Problem being addressed
    #[serde(default)]
    pub current_issue: String,
    /// Proposed creatives
    pub creative_variations: Vec<CreativeVariation>,
    /// Ids of hypotheses that motivated the recommendation
    #[serde(default)]
    pub linked_hypotheses: Vec<String>,
}

/// Parse a creative-generation response: `{"recommendations": [...]}`.
///
/// Every recommendation must be well formed and carry at least one variation.
///
/// # Errors
///
/// Returns a [`ParseError`] if the response has no `recommendations` array or
/// any entry is malformed.
pub fn parse_recommendations(text: &str) -> Result<Vec<CreativeRecommendation>, ParseError> {
    let value = parse_object(text)?;
    let entries = array_field(&value, "recommendations")?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let recommendation = CreativeRecommendation::deserialize(entry).map_err(|e| {
                ParseError::InvalidJson(format!("recommendations[{index}]: {e}"))
            })?;
            if recommendation.creative_variations.is_empty() {
                return Err(ParseError::WrongType {
                    field: format!("recommendations[{index}].creative_variations"),
                    expected: "a non-empty array",
                });
            }
            Ok(recommendation)
        })
        .collect()
}
