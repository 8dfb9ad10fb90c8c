//! `thoughts:` / `stars:` extraction from free-text judge replies

use crate::rubric::Metric;
use serde::{Deserialize, Serialize};

pub const THOUGHTS_MARKER: &str = "thoughts:";
pub const STARS_MARKER: &str = "stars:";

/// Rating text shown when a reply has no `stars:` marker
pub const MISSING_RATING: &str = "N/A";

/// Rationale and rating pulled out of one judge reply
///
/// The rating is kept exactly as the model wrote it (trimmed). Nothing here guarantees it
/// is a number, let alone one in range; use [`ParsedEvaluation::stars`] and
/// [`ParsedEvaluation::in_range`] to interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEvaluation {
    pub thoughts: String,
    pub rating: Option<String>,
}

impl ParsedEvaluation {
    pub fn rating_text(&self) -> &str {
        self.rating.as_deref().unwrap_or(MISSING_RATING)
    }

    /// First integer in the rating, if any
    pub fn stars(&self) -> Option<u8> {
        let rating = self.rating.as_deref()?;
        let digits: String = rating
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }

    /// Whether the rating is one the metric's rubric allows
    pub fn in_range(&self, metric: Metric) -> bool {
        self.stars()
            .map(|stars| metric.scale().contains(&stars))
            .unwrap_or(false)
    }
}

/// Split a reply on the last `stars:` marker
///
/// The rating is everything after the last `stars:`. The thoughts are the text between the
/// last `thoughts:` before that point and the `stars:` marker itself. A reply echoing the
/// few-shot examples therefore still yields its own final verdict.
pub fn parse_evaluation(reply: &str) -> ParsedEvaluation {
    let (body, rating) = match reply.rfind(STARS_MARKER) {
        Some(pos) => (
            &reply[..pos],
            Some(reply[pos + STARS_MARKER.len()..].trim().to_string()),
        ),
        None => (reply, None),
    };

    let thoughts = body
        .rfind(THOUGHTS_MARKER)
        .map(|pos| body[pos + THOUGHTS_MARKER.len()..].trim().to_string())
        .unwrap_or_default();

    ParsedEvaluation { thoughts, rating }
}
