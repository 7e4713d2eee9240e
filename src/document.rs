/// Retrieved passages and the context block built from them.
///
/// Every retrieval backend hands its raw records to [`Document::from_record`]
/// once, so the formatter only ever sees the canonical shape.
use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Context used when retrieval ran but produced nothing.
pub const NO_DOCUMENTS_CONTEXT: &str = "No relevant documents found.";

/// Context used when no knowledge base is configured at all.
pub const NO_KNOWLEDGE_BASE_CONTEXT: &str = "No external knowledge base is configured. \
Answer the question using your general knowledge.";

const TEXT_KEYS: &[&str] = &["text", "chunk_text", "content"];
const SOURCE_KEYS: &[&str] = &["source_display_name", "display_name", "source"];
const SCORE_KEYS: &[&str] = &["relevancy", "score", "_score", "similarity"];

// ── Document ─────────────────────────────────────────────────────────

/// One retrieved passage. Every field is optional; an empty document is legal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevancy: Option<f64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, name: impl Into<String>) -> Self {
        self.source_display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_relevancy(mut self, score: f64) -> Self {
        self.relevancy = Some(score);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Normalize a key/value record from a retrieval backend.
    ///
    /// The first non-empty alias wins for each canonical field. A nested
    /// `metadata` object and every other scalar field end up in `metadata`.
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let text = first_string(record, TEXT_KEYS);
        let source_display_name = first_string(record, SOURCE_KEYS);
        let relevancy = SCORE_KEYS
            .iter()
            .find_map(|key| record.get(*key).and_then(Value::as_f64));

        let mut metadata = BTreeMap::new();
        if let Some(Value::Object(nested)) = record.get("metadata") {
            for (key, value) in nested {
                if let Some(s) = scalar_to_string(value) {
                    metadata.insert(key.clone(), s);
                }
            }
        }

        let consumed = |key: &str| {
            key == "metadata"
                || (text.is_some() && TEXT_KEYS.contains(&key))
                || (source_display_name.is_some() && SOURCE_KEYS.contains(&key))
                || (relevancy.is_some() && SCORE_KEYS.contains(&key))
        };
        for (key, value) in record {
            if consumed(key.as_str()) {
                continue;
            }
            if let Some(s) = scalar_to_string(value) {
                metadata.entry(key.clone()).or_insert(s);
            }
        }

        Self {
            text,
            source_display_name,
            relevancy,
            metadata,
        }
    }

    /// Normalize an arbitrary JSON value. Anything but an object yields an empty document.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::from_record(map),
            _ => Self::default(),
        }
    }
}

fn first_string(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        record
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ── Context formatting ───────────────────────────────────────────────

/// Render documents into the context block handed to the language model.
///
/// Output depends only on input order and field presence, so repeated calls
/// with the same documents are byte-identical.
#[must_use]
pub fn format_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS_CONTEXT.to_string();
    }

    let mut context = String::from("Here are the relevant documents:\n\n");
    for (i, doc) in documents.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = writeln!(context, "Document {}:", i + 1);
        if let Some(text) = &doc.text {
            let _ = writeln!(context, "Content: {text}");
        }
        if let Some(source) = &doc.source_display_name {
            let _ = writeln!(context, "Source: {source}");
        }
        if let Some(score) = doc.relevancy {
            let _ = writeln!(context, "Relevance Score: {}", format_score(score));
        }
        context.push('\n');
    }
    context
}

/// Whole-number scores keep one decimal place (`1.0`, not `1`).
fn format_score(score: f64) -> String {
    if score.is_finite() && score.fract() == 0.0 {
        format!("{score:.1}")
    } else {
        score.to_string()
    }
}
