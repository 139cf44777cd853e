// Fixed prompt text for chat-completion operations.

/// Instruction prefix for resume review. The extracted PDF text is appended
/// after this prefix before the chat call.
pub const RESUME_REVIEW_PROMPT_PREFIX: &str = "Review the following resume and provide \
    constructive feedback on its strengths, weaknesses, and areas for improvement. \
    Resume Content:\n\n";

/// Prompt recorded against resume-review creations (the resume text itself is
/// not persisted).
pub const RESUME_REVIEW_RECORD_PROMPT: &str = "Review the uploaded resume";
