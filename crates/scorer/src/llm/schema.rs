// ABOUTME: The six-feature record returned by the LLM path and the JSON schema sent to the provider.
// ABOUTME: Parses provider output leniently (code fences, single-element arrays) but validates every value.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::LlmError;

/// Feature names with the descriptions the model is asked to follow.
pub const FEATURE_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "statistics_addition",
        "The proportion of sentences that contain numerical data, percentages, or cited figures, with value in the range of 0 to 1",
    ),
    (
        "quotation_addition",
        "The proportion of sentences that contain direct quotations from sources, with value in the range of 0 to 1",
    ),
    (
        "cite_sources",
        "The proportion of sentences that cite sources, with value in the range of 0 to 1",
    ),
    (
        "high_fluency",
        "The proportion of sentences that are written in a high-fluency style, with value in the range of 0 to 1",
    ),
    (
        "accurate_terminology",
        "The proportion of sentences that use accurate terminology, with value in the range of 0 to 1",
    ),
    (
        "non_manipulative_tone",
        "The proportion of sentences that are written in a non-manipulative tone, with value in the range of 0 to 1",
    ),
];

/// Features deduced by the model, each a proportion in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureRecord {
    pub statistics_addition: f64,
    pub quotation_addition: f64,
    pub cite_sources: f64,
    pub high_fluency: f64,
    pub accurate_terminology: f64,
    pub non_manipulative_tone: f64,
}

impl FeatureRecord {
    fn values(&self) -> [(&'static str, f64); 6] {
        [
            ("statistics_addition", self.statistics_addition),
            ("quotation_addition", self.quotation_addition),
            ("cite_sources", self.cite_sources),
            ("high_fluency", self.high_fluency),
            ("accurate_terminology", self.accurate_terminology),
            ("non_manipulative_tone", self.non_manipulative_tone),
        ]
    }

    /// Fail if any feature is not a finite number in `[0, 1]`.
    pub fn validate(&self) -> Result<(), LlmError> {
        for (name, value) in self.values() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(LlmError::Schema(format!(
                    "{} = {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a model reply.
    ///
    /// Accepts a bare JSON object, an object wrapped in a fenced code block,
    /// or an array whose first element is the object.
    pub fn from_reply(reply: &str) -> Result<Self, LlmError> {
        let body = strip_code_fence(reply);
        let value: Value = serde_json::from_str(body)
            .map_err(|e| LlmError::Schema(format!("reply is not JSON: {}", e)))?;
        let value = match value {
            Value::Array(items) => items
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::Schema("reply is an empty array".to_string()))?,
            other => other,
        };
        let record: FeatureRecord = serde_json::from_value(value)
            .map_err(|e| LlmError::Schema(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// JSON schema describing a [`FeatureRecord`].
pub fn feature_schema() -> Value {
    let mut properties = serde_json::Map::new();
    for (name, description) in FEATURE_DESCRIPTIONS {
        properties.insert(
            name.to_string(),
            json!({
                "type": "number",
                "description": description,
                "minimum": 0,
                "maximum": 1
            }),
        );
    }
    let required: Vec<&str> = FEATURE_DESCRIPTIONS.iter().map(|(name, _)| *name).collect();
    json!({
        "title": "Features",
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}
