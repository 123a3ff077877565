use eyre::Result;

use crate::{Completion, CompletionApi};

/// Synchronous counterparts of the crate's generation functions, for callers without an async
/// runtime on hand. Each call spins up a throwaway runtime.
pub fn generate_question<C: CompletionApi>(api: &C, topic: Option<&str>, model: &str, max_tokens: u32, debug: bool) -> Result<Completion> {
	let runtime = tokio::runtime::Runtime::new()?;
	runtime.block_on(crate::generate_question(api, topic, model, max_tokens, debug))
}

pub fn generate_answer<C: CompletionApi>(api: &C, question: &str, model: &str, max_tokens: u32, debug: bool) -> Result<Completion> {
	let runtime = tokio::runtime::Runtime::new()?;
	runtime.block_on(crate::generate_answer(api, question, model, max_tokens, debug))
}
