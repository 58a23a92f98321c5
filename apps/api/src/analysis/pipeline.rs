//! Per-action orchestration: extract → build prompt → call model → render.
//!
//! Each call is an independent run; nothing is kept between actions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::prompt::PromptRequest;
use crate::analysis::renderer::{render_analysis, render_fragments, CandidateScope, RenderedAnalysis};
use crate::errors::AppError;
use crate::ingest::{extract_text_blocking, UploadedDocument};
use crate::llm_client::TextGenerator;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub analysis_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub rendered: RenderedAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct FragmentsOutcome {
    pub analysis_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub fragments: Vec<String>,
}

/// Full resume analysis against a job description.
pub async fn analyze_resume(
    llm: &dyn TextGenerator,
    document: UploadedDocument,
    job_description: &str,
) -> Result<AnalysisOutcome, AppError> {
    let analysis_id = Uuid::new_v4();
    let span = info_span!("analyze", %analysis_id, filename = %document.filename);

    async move {
        let resume_text = extract_text_blocking(document).await?;
        let prompt = PromptRequest::Analysis {
            resume_text,
            job_description: job_description.to_string(),
        }
        .render();

        let response = llm.generate(&prompt).await?;
        let rendered = render_analysis(&response)?;
        info!(
            model = llm.model(),
            fragments = rendered.fragments.len(),
            match_percentage = ?rendered.match_percentage,
            "Analysis rendered"
        );

        Ok::<_, AppError>(AnalysisOutcome {
            analysis_id,
            created_at: Utc::now(),
            rendered,
        })
    }
    .instrument(span)
    .await
}

/// ATS rephrasing of free text.
pub async fn rephrase(llm: &dyn TextGenerator, text: &str) -> Result<FragmentsOutcome, AppError> {
    let analysis_id = Uuid::new_v4();
    let span = info_span!("rephrase", %analysis_id);

    async move {
        let prompt = PromptRequest::Rephrase {
            text: text.to_string(),
        }
        .render();

        let response = llm.generate(&prompt).await?;
        let fragments = render_fragments(&response, CandidateScope::First)?;
        info!(model = llm.model(), fragments = fragments.len(), "Rephrase rendered");

        Ok::<_, AppError>(FragmentsOutcome {
            analysis_id,
            created_at: Utc::now(),
            fragments,
        })
    }
    .instrument(span)
    .await
}

/// Skill-gap comparison of a resume against a job description.
pub async fn skill_gap(
    llm: &dyn TextGenerator,
    document: UploadedDocument,
    job_description: &str,
) -> Result<FragmentsOutcome, AppError> {
    let analysis_id = Uuid::new_v4();
    let span = info_span!("skill_gap", %analysis_id, filename = %document.filename);

    async move {
        let resume_text = extract_text_blocking(document).await?;
        let prompt = PromptRequest::SkillGap {
            resume_text,
            job_description: job_description.to_string(),
        }
        .render();

        let response = llm.generate(&prompt).await?;
        let fragments = render_fragments(&response, CandidateScope::All)?;
        info!(model = llm.model(), fragments = fragments.len(), "Skill gap rendered");

        Ok::<_, AppError>(FragmentsOutcome {
            analysis_id,
            created_at: Utc::now(),
            fragments,
        })
    }
    .instrument(span)
    .await
}
