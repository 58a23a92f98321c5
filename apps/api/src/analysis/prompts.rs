// All LLM prompt templates for the analysis module.
// Placeholders are filled by `prompt::fill_template`; values are inserted verbatim.

/// Full resume analysis. Replace: {job_description}, {resume_text}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = "\
Please analyze the following resume in the context of the job description provided. Provide:
- Match percentage
- Missing keywords (hard + soft skills)
- Final evaluation in 3 lines
- 3-4 actionable improvement points
Job Description: {job_description}
Resume: {resume_text}";

/// ATS rephrasing of arbitrary resume content. Replace: {text}
pub const REPHRASE_PROMPT_TEMPLATE: &str = "\
Rephrase the following resume content with ATS-optimized phrasing and measurable outcomes:
{text}";

/// Skill-gap comparison. Replace: {resume_text}, {job_description}
pub const SKILL_GAP_PROMPT_TEMPLATE: &str = "\
Compare resume and job description. Return:
- Matched hard and soft skills
- Missing hard and soft skills
- Suggestions to close the skill gaps
Resume: {resume_text}
Job Description: {job_description}";
