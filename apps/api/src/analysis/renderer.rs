//! Response Renderer: walks candidate parts and pulls a match percentage out of free text.
//!
//! The model is asked for a "match percentage" but nothing enforces the shape of its answer.
//! A fragment that names the phrase but carries no `<digits>%` gets no indicator and no error.
//! Anything that goes wrong while reading the number becomes a warning; the remaining
//! fragments still render.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::{Candidate, GenerateContentResponse, Part};

const MATCH_PHRASE: &str = "match percentage";

// ASCII digits only. Other scripts' digits are not read as a percentage.
static PERCENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)%").expect("percentage pattern is valid"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("No analysis response received.")]
    NoAnalysis,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PercentageError {
    #[error("cannot read {digits:?} as a number")]
    Unparsable { digits: String },

    #[error("{0}% is outside 0-100")]
    OutOfRange(u64),
}

/// Proportion indicator for a match percentage (matched vs. unmatched share).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchIndicator {
    pub percent: u8,
    pub matched: f32,
    pub unmatched: f32,
}

impl MatchIndicator {
    pub fn new(percent: u8) -> Self {
        let matched = f32::from(percent) / 100.0;
        Self {
            percent,
            matched,
            unmatched: 1.0 - matched,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedFragment {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_indicator: Option<MatchIndicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedAnalysis {
    pub fragments: Vec<RenderedFragment>,
    /// First percentage found across fragments.
    pub match_percentage: Option<u8>,
    pub warnings: Vec<String>,
    /// Every fragment followed by a newline; the export input.
    pub feedback: String,
}

/// Which candidates a plain rendering walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateScope {
    First,
    All,
}

/// Reads the match percentage from a fragment.
///
/// `Ok(None)` when the fragment does not mention a match percentage, or mentions it
/// without any `<digits>%`. The first `<digits>%` anywhere in the fragment wins.
pub fn extract_match_percentage(text: &str) -> Result<Option<u8>, PercentageError> {
    if !text.to_lowercase().contains(MATCH_PHRASE) {
        return Ok(None);
    }
    let Some(captures) = PERCENT_PATTERN.captures(text) else {
        return Ok(None);
    };

    let digits = &captures[1];
    let value: u64 = digits.parse().map_err(|_| PercentageError::Unparsable {
        digits: digits.to_string(),
    })?;
    let percent = u8::try_from(value)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or(PercentageError::OutOfRange(value))?;
    Ok(Some(percent))
}

/// Renders the full-analysis flow from the first candidate.
pub fn render_analysis(response: &GenerateContentResponse) -> Result<RenderedAnalysis, RenderError> {
    let candidate = response
        .candidates()
        .and_then(<[Candidate]>::first)
        .ok_or(RenderError::NoAnalysis)?;

    let mut fragments = Vec::new();
    let mut warnings = Vec::new();
    let mut feedback = String::new();
    let mut match_percentage = None;

    for part in candidate.parts().unwrap_or_default() {
        let text = part.text();
        feedback.push_str(text);
        feedback.push('\n');

        let match_indicator = match extract_match_percentage(text) {
            Ok(percent) => percent.map(MatchIndicator::new),
            Err(e) => {
                warn!("Match percentage extraction failed: {e}");
                warnings.push(format!("Graph error: {e}"));
                None
            }
        };
        if match_percentage.is_none() {
            match_percentage = match_indicator.map(|i| i.percent);
        }

        fragments.push(RenderedFragment {
            text: text.to_string(),
            match_indicator,
        });
    }

    Ok(RenderedAnalysis {
        fragments,
        match_percentage,
        warnings,
        feedback,
    })
}

/// Verbatim fragment texts for the rephrase and skill-gap flows.
pub fn render_fragments(
    response: &GenerateContentResponse,
    scope: CandidateScope,
) -> Result<Vec<String>, RenderError> {
    let candidates = response.candidates().ok_or(RenderError::NoAnalysis)?;
    let selected = match scope {
        CandidateScope::First => &candidates[..1],
        CandidateScope::All => candidates,
    };

    Ok(selected
        .iter()
        .flat_map(|c| c.parts().unwrap_or_default())
        .map(Part::text)
        .map(String::from)
        .collect())
}
