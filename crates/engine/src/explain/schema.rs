//! Declared output schema for the explanation call and the structural validator
//! that turns a raw JSON reply into typed fields.

use serde_json::{json, Map, Value};

use polisense_common::types::ArticleMetadata;

const METADATA_STRING_FIELDS: [&str; 4] = ["title", "outlet", "publishedDate", "readTime"];

/// Parsed explanation payload. `summary` may be empty; the assembler substitutes a fallback.
#[derive(Clone, Debug, PartialEq)]
pub struct Explanation {
    pub metadata: ArticleMetadata,
    pub summary: String,
}

/// The JSON schema sent with the request (Gemini `responseSchema` dialect).
pub fn explanation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "metadata": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING", "description": "Headline of the article" },
                    "outlet": { "type": "STRING", "description": "Publisher or source" },
                    "publishedDate": { "type": "STRING", "description": "YYYY-MM-DD or Unknown" },
                    "wordCount": { "type": "NUMBER", "description": "Total word count" },
                    "readTime": { "type": "STRING", "description": "Estimated read time string" }
                },
                "required": ["title", "outlet", "publishedDate", "wordCount", "readTime"]
            },
            "summary": {
                "type": "STRING",
                "description": "Layman-friendly explanation of the bias and summary of content"
            }
        },
        "required": ["metadata", "summary"]
    })
}

/// Check required fields and types, then build the typed payload.
/// Every violation is reported, not just the first.
pub fn validate(value: &Value) -> Result<Explanation, Vec<String>> {
    let Some(root) = value.as_object() else {
        return Err(vec!["response is not a JSON object".into()]);
    };

    let mut errors = Vec::new();

    let metadata = match root.get("metadata") {
        None => {
            errors.push("missing required field `metadata`".into());
            None
        }
        Some(Value::Object(fields)) => validate_metadata(fields, &mut errors),
        Some(_) => {
            errors.push("`metadata` must be an object".into());
            None
        }
    };

    let summary = match root.get("summary") {
        None => {
            errors.push("missing required field `summary`".into());
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push("`summary` must be a string".into());
            None
        }
    };

    match (metadata, summary) {
        (Some(metadata), Some(summary)) if errors.is_empty() => Ok(Explanation { metadata, summary }),
        _ => Err(errors),
    }
}

fn validate_metadata(fields: &Map<String, Value>, errors: &mut Vec<String>) -> Option<ArticleMetadata> {
    let before = errors.len();

    let mut strings = Vec::with_capacity(METADATA_STRING_FIELDS.len());
    for name in METADATA_STRING_FIELDS {
        match fields.get(name) {
            Some(Value::String(s)) => strings.push(s.clone()),
            Some(_) => errors.push(format!("`metadata.{}` must be a string", name)),
            None => errors.push(format!("missing required field `metadata.{}`", name)),
        }
    }

    // NUMBER in the schema: models sometimes send 850.0 for a count.
    let word_count = match fields.get("wordCount") {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(count) => Some(count),
            None => match n.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 => Some(f.round() as u64),
                _ => {
                    errors.push("`metadata.wordCount` must be a non-negative number".into());
                    None
                }
            },
        },
        Some(_) => {
            errors.push("`metadata.wordCount` must be a number".into());
            None
        }
        None => {
            errors.push("missing required field `metadata.wordCount`".into());
            None
        }
    };

    if errors.len() > before {
        return None;
    }

    let [title, outlet, published_date, read_time]: [String; 4] = strings.try_into().ok()?;

    Some(ArticleMetadata {
        title,
        outlet,
        published_date,
        word_count: word_count?,
        read_time,
    })
}
