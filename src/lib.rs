use eyre::Result;

pub mod blocking;
mod models;
mod openai;

pub use models::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, FALLBACK_MODELS, ModelRegistry, supports_custom_temperature, uses_max_completion_tokens};
pub use openai::{ChatCompletionChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionApi, OpenAiClient, ResponseMessage, Usage};

/// Trimmed responses shorter than this are treated as weak and may trigger the one-shot
/// default-model substitution.
const MIN_RESPONSE_CHARS: usize = 10;

const QUESTION_TEMPERATURE: f32 = 0.9; // creativity bias
const ANSWER_TEMPERATURE: f32 = 0.7;

/// Asks the model for a question, about `topic` when given and about anything otherwise.
pub async fn generate_question<C: CompletionApi>(api: &C, topic: Option<&str>, model: &str, max_tokens: u32, debug: bool) -> Result<Completion> {
	let prompt = match topic {
		Some(topic) => format!("Generate an interesting and thought-provoking question about {topic}. Only provide the question, no answer."),
		_ => "Generate an interesting and thought-provoking question about any topic. Only provide the question, no answer.".to_owned(),
	};
	complete_with_fallback(api, &prompt, model, max_tokens, QUESTION_TEMPERATURE, debug).await
}

/// Asks the model to answer `question` verbatim.
pub async fn generate_answer<C: CompletionApi>(api: &C, question: &str, model: &str, max_tokens: u32, debug: bool) -> Result<Completion> {
	complete_with_fallback(api, question, model, max_tokens, ANSWER_TEMPERATURE, debug).await
}

/// One completion with the shared retry policy. A bounded loop rather than recursion: every
/// attempted model lands in `tried`, and error candidates come from the finite
/// [`FALLBACK_MODELS`] list, so at most `FALLBACK_MODELS.len() + 1` requests go out.
async fn complete_with_fallback<C: CompletionApi>(api: &C, prompt: &str, model: &str, max_tokens: u32, temperature: f32, debug: bool) -> Result<Completion> {
	let mut conv = Conversation::new();
	conv.add(Role::User, prompt);

	let mut current = model.to_owned();
	let mut tried: Vec<String> = Vec::new();
	let mut weak_retry_spent = false;

	loop {
		tried.push(current.clone());
		let request = ChatCompletionRequest::for_model(&current, &conv, max_tokens, temperature);
		match api.create_completion(&request).await {
			Ok(response) => {
				let text = response.text().trim().to_owned();
				if text.chars().count() < MIN_RESPONSE_CHARS {
					tracing::warn!("model {current} returned an empty or very short response");
					if debug {
						eprintln!("Warning: model {current} returned an empty or very short response");
						eprintln!("Response received: '{text}'");
					}
					// Only the default model gets the one-shot substitution; a weak response
					// from any other model is returned as-is.
					if current == models::DEFAULT_MODEL && !weak_retry_spent {
						weak_retry_spent = true;
						if debug {
							eprintln!("Trying with {} as fallback...", models::SHORT_RESPONSE_FALLBACK);
						}
						current = models::SHORT_RESPONSE_FALLBACK.to_owned();
						continue;
					}
				}
				return Ok(Completion::new(text, current));
			}
			Err(e) => {
				tracing::warn!("completion on {current} failed: {e}");
				match FALLBACK_MODELS.iter().copied().find(|candidate| !tried.iter().any(|t| t.as_str() == *candidate)) {
					Some(candidate) => {
						if debug {
							eprintln!("Error from model {current}: {e}");
							eprintln!("Retrying with {candidate}...");
						}
						current = candidate.to_owned();
					}
					_ => return Err(e),
				}
			}
		}
	}
}

#[derive(Clone, Copy, Debug)]
pub enum Role {
	System,
	User,
	Assistant,
}

#[derive(Clone, Debug)]
pub struct Message {
	role: Role,
	content: String,
}
impl Message {
	fn new<T: AsRef<str>>(role: Role, content: T) -> Self {
		Self {
			role,
			content: content.as_ref().to_string(),
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct Conversation(pub Vec<Message>);

impl Conversation {
	pub fn new() -> Self {
		Self(Vec::new())
	}

	pub fn new_with_system<T: AsRef<str>>(system_message: T) -> Self {
		Self(vec![Message::new(Role::System, system_message)])
	}

	pub fn add<T: AsRef<str>>(&mut self, role: Role, content: T) {
		self.0.push(Message::new(role, content));
	}
}

/// What came back, and from which model: after a fallback the answering model is not
/// necessarily the one the caller requested.
#[derive(Debug, derive_new::new)]
pub struct Completion {
	pub text: String,
	pub model: String,
}
