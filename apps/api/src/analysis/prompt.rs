//! Prompt Builder: a typed request (template + named fields) rendered to the final prompt.
//!
//! Rendering is literal substitution: no escaping, no truncation, no length checks.

use serde::Serialize;

use crate::analysis::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, REPHRASE_PROMPT_TEMPLATE, SKILL_GAP_PROMPT_TEMPLATE,
};

/// Which fixed instruction template a prompt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    Analysis,
    Rephrase,
    SkillGap,
}

impl PromptTemplate {
    pub fn text(self) -> &'static str {
        match self {
            PromptTemplate::Analysis => ANALYSIS_PROMPT_TEMPLATE,
            PromptTemplate::Rephrase => REPHRASE_PROMPT_TEMPLATE,
            PromptTemplate::SkillGap => SKILL_GAP_PROMPT_TEMPLATE,
        }
    }
}

/// One prompt to send, with its user-supplied fields.
#[derive(Debug, Clone)]
pub enum PromptRequest {
    Analysis {
        resume_text: String,
        job_description: String,
    },
    Rephrase {
        text: String,
    },
    SkillGap {
        resume_text: String,
        job_description: String,
    },
}

impl PromptRequest {
    pub fn template(&self) -> PromptTemplate {
        match self {
            PromptRequest::Analysis { .. } => PromptTemplate::Analysis,
            PromptRequest::Rephrase { .. } => PromptTemplate::Rephrase,
            PromptRequest::SkillGap { .. } => PromptTemplate::SkillGap,
        }
    }

    /// Named fields in template placeholder form.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            PromptRequest::Analysis {
                resume_text,
                job_description,
            }
            | PromptRequest::SkillGap {
                resume_text,
                job_description,
            } => vec![
                ("resume_text", resume_text.as_str()),
                ("job_description", job_description.as_str()),
            ],
            PromptRequest::Rephrase { text } => vec![("text", text.as_str())],
        }
    }

    pub fn render(&self) -> String {
        fill_template(self.template().text(), &self.fields())
    }
}

/// Replaces `{name}` placeholders in a single pass over the template.
///
/// Inserted values are never rescanned, so a value containing `{resume_text}` stays literal.
/// Braces that do not name a known field are copied through unchanged.
pub fn fill_template(template: &str, fields: &[(&str, &str)]) -> String {
    let extra: usize = fields.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            fields
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, value)| (*value, close))
        });

        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
