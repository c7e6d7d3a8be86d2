// Post generation: prompt assembly, tone, model call, and the per-certificate pipeline.
// All LLM calls go through llm_client, no direct Anthropic calls here.

pub mod generator;
pub mod pipeline;
pub mod prompts;
pub mod tone;
