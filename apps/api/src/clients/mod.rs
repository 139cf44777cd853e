// Upstream service clients. Every third-party call the orchestrator makes goes
// through one of these — no handler talks to an external API directly.

pub mod assets;
pub mod chat;
pub mod identity;
pub mod image_gen;
pub mod prompts;
