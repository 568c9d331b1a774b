//! Model response parsing
//!
//! Models are asked for a bare JSON object but often wrap it in a markdown
//! fence or surround it with prose. [`extract_json`] tries a fixed chain of
//! candidate spans and returns the first one that parses as a JSON object.

use serde_json::Value;
use tracing::debug;

/// Max characters of the raw response kept in a [`ParseFailure`]
const EXCERPT_CHARS: usize = 200;

/// Where in the response text the object was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    /// The whole (trimmed) text
    Whole,
    /// Inside a leading ``` fence
    Fenced,
    /// From the first `{` to the last `}`
    Braces,
}

impl ExtractionStage {
    const CHAIN: [ExtractionStage; 3] = [Self::Whole, Self::Fenced, Self::Braces];

    /// The candidate span this stage would parse, if it applies
    fn candidate<'a>(&self, text: &'a str) -> Option<&'a str> {
        let trimmed = text.trim();
        match self {
            Self::Whole => Some(trimmed),
            Self::Fenced => {
                if !trimmed.starts_with("```") {
                    return None;
                }
                // Drop the opening fence line (with its optional language tag)
                let (_, rest) = trimmed.split_once('\n')?;
                let end = rest.rfind("```").unwrap_or(rest.len());
                Some(&rest[..end])
            }
            Self::Braces => {
                let start = trimmed.find('{')?;
                let end = trimmed.rfind('}')?;
                (end > start).then(|| &trimmed[start..=end])
            }
        }
    }
}

/// A response that yielded no JSON object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Leading part of the raw response
    pub excerpt: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no JSON object in model response (starts with {:?})", self.excerpt)
    }
}

impl std::error::Error for ParseFailure {}

/// Outcome of [`extract_json`]
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A JSON object, found by `stage`
    Parsed { value: Value, stage: ExtractionStage },
    Failed(ParseFailure),
}

impl Extraction {
    pub fn into_result(self) -> Result<Value, ParseFailure> {
        match self {
            Self::Parsed { value, .. } => Ok(value),
            Self::Failed(failure) => Err(failure),
        }
    }
}

/// Extract the JSON object a model response carries
///
/// Never panics; text without an object yields [`Extraction::Failed`].
pub fn extract_json(text: &str) -> Extraction {
    debug!(text_len = text.len(), "extract_json: called");
    for stage in ExtractionStage::CHAIN {
        if let Some(value) = stage.candidate(text).and_then(parse_object) {
            debug!(?stage, "extract_json: parsed");
            return Extraction::Parsed { value, stage };
        }
    }

    debug!("extract_json: no stage produced an object");
    Extraction::Failed(ParseFailure {
        excerpt: text.chars().take(EXCERPT_CHARS).collect(),
    })
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate.trim())
        .ok()
        .filter(Value::is_object)
}
