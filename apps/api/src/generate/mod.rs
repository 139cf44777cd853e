// Artifact generation: one orchestration entry point over a tagged request
// variant, so the quota / validation / persistence skeleton lives in one place.
// All upstream calls go through `clients` — no direct API calls here.

pub mod handlers;
pub mod orchestrator;

pub use orchestrator::{run, GenerationRequest, Outcome};
