// Resume analysis: prompt building, the per-action pipeline, and response rendering.
// All model calls go through llm_client; nothing here talks to the endpoint directly.

pub mod handlers;
pub mod pipeline;
pub mod prompt;
pub mod prompts;
pub mod renderer;
