//! Packaging material records as returned by the analysis proxy.
//!
//! Model output is untrusted, so every field except `type` is optional and
//! deserialised leniently. Fields that the model sometimes sends as a string
//! and sometimes as a list are canonicalised to `Vec<String>` here, once, so
//! nothing downstream has to care.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub chemical_formula: Option<String>,
    /// Always present on the wire, `null` when no diagram was produced.
    #[serde(default, deserialize_with = "lenient_string")]
    pub chemical_structure_image: Option<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub fssai_limits: Vec<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub bis_limits: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub thickness: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub gsm: Option<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub food_applications: Vec<String>,

    // Earlier schema.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(default, deserialize_with = "resin_code")]
    pub plastic_resin_code: Option<u8>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub layer_composition: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub recyclability: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub biodegradable: Option<bool>,
    #[serde(default, deserialize_with = "text_list", skip_serializing_if = "Vec::is_empty")]
    pub common_uses: Vec<String>,
    #[serde(
        default,
        deserialize_with = "sustainability_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub sustainability_rating: Option<u8>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub environmental_impact: Option<String>,
}

impl Material {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            chemical_formula: None,
            chemical_structure_image: None,
            fssai_limits: Vec::new(),
            bis_limits: Vec::new(),
            thickness: None,
            gsm: None,
            food_applications: Vec::new(),
            classification: None,
            plastic_resin_code: None,
            layer_composition: None,
            recyclability: None,
            biodegradable: None,
            common_uses: Vec::new(),
            sustainability_rating: None,
            environmental_impact: None,
        }
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.chemical_formula = Some(formula.into());
        self
    }

    /// The formula, if the model gave a usable one.
    pub fn formula(&self) -> Option<&str> {
        self.chemical_formula
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("n/a"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub materials: Vec<Material>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub overall_analysis: Option<String>,
}

impl AnalysisResult {
    /// Parses model output, tolerating a surrounding Markdown code fence.
    pub fn parse(content: &str) -> Result<Self, AppError> {
        let body = strip_code_fence(content);
        let result: Self = serde_json::from_str(body)
            .map_err(|e| AppError::MalformedAnalysis(e.to_string()))?;
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match self.materials.iter().position(|m| m.kind.trim().is_empty()) {
            Some(idx) => Err(AppError::MalformedAnalysis(format!(
                "material {idx} has no type"
            ))),
            None => Ok(()),
        }
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Canonical list form of a field that may be a scalar, a list or null.
///
/// Applying this to its own output is a no-op.
pub fn normalize_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_list(&value))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value).filter(|s| !s.trim().is_empty()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn bounded_int(value: &Value, range: std::ops::RangeInclusive<u8>) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_start_matches('#').parse::<f64>().ok()?,
        _ => return None,
    };
    if n.fract() != 0.0 || n < f64::from(*range.start()) || n > f64::from(*range.end()) {
        return None;
    }
    Some(n as u8)
}

fn resin_code<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(bounded_int(&value, 1..=7))
}

fn sustainability_rating<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(bounded_int(&value, 1..=5))
}
