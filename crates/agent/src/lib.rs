//! Customer analysis through an external text-generation service.
//!
//! The service is reached through [`llm::LlmClient`], with Gemini and Ollama transports
//! provided. [`analyst::CustomerAnalyst`] owns the full request: it segments the customer
//! list, renders the prompt, calls the client and turns whatever comes back (including
//! transport failures and malformed replies) into an [`sachet_core::AnalysisOutcome`].
//!
//! The model never sees contact names or phone numbers; only the reduced digest built in
//! `sachet_core::analytics::analysis` leaves the process.

pub mod analyst;
pub mod llm;

pub use analyst::CustomerAnalyst;
pub use llm::{build_client, GeminiClient, LlmClient, OllamaClient};
