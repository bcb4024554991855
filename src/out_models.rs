use serde::{Deserialize, Deserializer, Serialize};

/// Structured part of the judgment. Every field is optional on the wire; models drop
/// fields, rename them, or send numbers as strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgmentPayload {
    #[serde(default, alias = "prediction", alias = "answer")]
    pub verdict: Option<String>,
    #[serde(default, alias = "keyFactors", deserialize_with = "lenient_strings")]
    pub key_factors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub caveats: Vec<String>,
    #[serde(default, alias = "evidenceStrength", deserialize_with = "lenient_number")]
    pub evidence_strength: Option<f64>,
    #[serde(default, alias = "confidenceScore", alias = "confidence", deserialize_with = "lenient_number")]
    pub confidence_score: Option<f64>,
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|i| match i {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        serde_json::Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_aliases_and_string_numbers() {
        let p: JudgmentPayload = serde_json::from_str(
            r#"{"prediction": "YES, likely", "keyFactors": ["a", 3, null, " "],
                "caveats": "single caveat", "evidenceStrength": "25"}"#,
        )
        .unwrap();
        assert_eq!(p.verdict.as_deref(), Some("YES, likely"));
        assert_eq!(p.key_factors, vec!["a", "3"]);
        assert_eq!(p.caveats, vec!["single caveat"]);
        assert_eq!(p.evidence_strength, Some(25.0));
        assert_eq!(p.confidence_score, None);
    }

    #[test]
    fn test_wrong_types_degrade_to_defaults() {
        let p: JudgmentPayload =
            serde_json::from_str(r#"{"key_factors": {"x": 1}, "confidence_score": "high"}"#).unwrap();
        assert!(p.verdict.is_none());
        assert!(p.key_factors.is_empty());
        assert_eq!(p.confidence_score, None);
    }
}
