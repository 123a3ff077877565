use eyre::{Result, bail};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::{Conversation, Message, Role, models};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// The narrow slice of the provider this crate needs. Keeping the generation driver generic
/// over it lets tests run against a scripted double instead of the network.
#[allow(async_fn_in_trait)]
pub trait CompletionApi {
	async fn create_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse>;
	async fn list_models(&self) -> Result<Vec<String>>;
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatCompletionRequest {
	pub model: String,
	pub messages: Vec<ChatMessage>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_completion_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
	/// Shapes the request for the target model: newer families take the token cap as
	/// `max_completion_tokens` instead of `max_tokens`, and some reject a custom temperature
	/// outright, in which case the field is omitted and the server default applies.
	pub fn for_model(model: &str, conversation: &Conversation, max_tokens: u32, temperature: f32) -> Self {
		let (legacy_cap, renamed_cap) = match models::uses_max_completion_tokens(model) {
			true => (None, Some(max_tokens)),
			false => (Some(max_tokens), None),
		};
		Self {
			model: model.to_owned(),
			messages: conversation.0.iter().map(ChatMessage::from).collect(),
			max_tokens: legacy_cap,
			max_completion_tokens: renamed_cap,
			temperature: models::supports_custom_temperature(model).then_some(temperature),
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
	pub role: &'static str,
	pub content: String,
}

impl From<&Message> for ChatMessage {
	fn from(message: &Message) -> Self {
		let role = match message.role {
			Role::System => "system",
			Role::User => "user",
			Role::Assistant => "assistant",
		};
		Self { role, content: message.content.clone() }
	}
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
	pub id: Option<String>,
	pub model: Option<String>,
	pub choices: Vec<ChatCompletionChoice>,
	pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
	/// Content of the first choice. The API nulls the field out on some refusals, which callers
	/// see as an empty text.
	pub fn text(&self) -> &str {
		self.choices.first().and_then(|choice| choice.message.content.as_deref()).unwrap_or_default()
	}
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChoice {
	pub message: ResponseMessage,
	pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
	pub role: Option<String>,
	pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
	pub prompt_tokens: u32,
	pub completion_tokens: u32,
	pub total_tokens: u32,
}

///docs: https://platform.openai.com/docs/api-reference/chat
pub struct OpenAiClient {
	http: reqwest::Client,
	api_key: String,
	base: String,
}

impl OpenAiClient {
	/// Reads the key from `OPENAI_API_KEY`. A missing key is a configuration error the caller
	/// should treat as fatal, reported before any network activity.
	pub fn from_env() -> Result<Self> {
		match std::env::var(API_KEY_VAR) {
			Ok(api_key) if !api_key.is_empty() => Ok(Self::new(api_key)),
			_ => bail!("{API_KEY_VAR} environment variable not set"),
		}
	}

	pub fn new(api_key: impl Into<String>) -> Self {
		Self {
			http: reqwest::Client::new(),
			api_key: api_key.into(),
			base: DEFAULT_BASE_URL.to_owned(),
		}
	}

	fn headers(&self) -> Result<HeaderMap> {
		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", self.api_key))?);
		Ok(headers)
	}
}

impl CompletionApi for OpenAiClient {
	async fn create_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
		tracing::debug!("requesting completion from {}", request.model);
		let response = self.http.post(format!("{}/chat/completions", self.base)).headers(self.headers()?).json(request).send().await?;

		if !response.status().is_success() {
			let status = response.status();
			let body = response.text().await.unwrap_or_default();
			bail!("OpenAI returned {status}: {body}");
		}
		Ok(response.json::<ChatCompletionResponse>().await?)
	}

	async fn list_models(&self) -> Result<Vec<String>> {
		let response = self.http.get(format!("{}/models", self.base)).headers(self.headers()?).send().await?;

		if !response.status().is_success() {
			bail!("OpenAI returned {} for the model listing", response.status());
		}
		let listing = response.json::<ModelListing>().await?;
		Ok(listing.data.into_iter().map(|entry| entry.id).collect())
	}
}

#[derive(Debug, Deserialize)]
struct ModelListing {
	data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
	id: String,
}

#[cfg(test)]
mod tests {
	use crate::{Conversation, Role};

	use super::*;

	#[test]
	fn renamed_token_cap_and_no_temperature_for_gpt_5() {
		let mut conv = Conversation::new();
		conv.add(Role::User, "hello");
		let request = ChatCompletionRequest::for_model("gpt-5", &conv, 512, 0.9);

		assert_eq!(request.max_completion_tokens, Some(512));
		assert_eq!(request.max_tokens, None);
		assert_eq!(request.temperature, None);

		let value = serde_json::to_value(&request).unwrap();
		assert!(value.get("max_tokens").is_none());
		assert!(value.get("temperature").is_none());
		assert_eq!(value["max_completion_tokens"], 512);
	}

	#[test]
	fn legacy_token_cap_and_temperature_for_gpt_3_5_turbo() {
		let mut conv = Conversation::new();
		conv.add(Role::User, "hello");
		let request = ChatCompletionRequest::for_model("gpt-3.5-turbo", &conv, 256, 0.7);

		assert_eq!(request.max_tokens, Some(256));
		assert_eq!(request.max_completion_tokens, None);
		assert_eq!(request.temperature, Some(0.7));

		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["max_tokens"], 256);
		assert!(value["temperature"].as_f64().is_some());
		assert!(value.get("max_completion_tokens").is_none());
	}

	#[test]
	fn gpt_4o_takes_renamed_cap_but_keeps_temperature() {
		let mut conv = Conversation::new();
		conv.add(Role::User, "hello");
		let request = ChatCompletionRequest::for_model("gpt-4o", &conv, 512, 0.7);

		assert_eq!(request.max_completion_tokens, Some(512));
		assert_eq!(request.temperature, Some(0.7));
	}

	#[test]
	fn conversation_roles_serialize_to_api_names() {
		let mut conv = Conversation::new_with_system("be terse");
		conv.add(Role::User, "hello");
		let request = ChatCompletionRequest::for_model("gpt-4", &conv, 64, 0.0);

		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["messages"][0]["role"], "system");
		assert_eq!(value["messages"][0]["content"], "be terse");
		assert_eq!(value["messages"][1]["role"], "user");
	}

	#[test]
	fn response_text_is_first_choice_content() {
		let raw = r#"{
			"id": "chatcmpl-123",
			"model": "gpt-4o",
			"choices": [{
				"message": {"role": "assistant", "content": "  What makes a question interesting?  "},
				"finish_reason": "stop"
			}],
			"usage": {"prompt_tokens": 20, "completion_tokens": 9, "total_tokens": 29}
		}"#;

		let response = serde_json::from_str::<ChatCompletionResponse>(raw).unwrap();
		assert_eq!(response.text().trim(), "What makes a question interesting?");
		assert_eq!(response.usage.unwrap().total_tokens, 29);
	}

	#[test]
	fn null_content_reads_as_empty_text() {
		let raw = r#"{"choices": [{"message": {"role": "assistant", "content": null}, "finish_reason": "content_filter"}]}"#;
		let response = serde_json::from_str::<ChatCompletionResponse>(raw).unwrap();
		assert_eq!(response.text(), "");
	}

	#[test]
	fn model_listing_parses_ids_in_order() {
		let raw = r#"{"object": "list", "data": [{"id": "gpt-4o", "object": "model"}, {"id": "gpt-5", "object": "model"}]}"#;
		let listing = serde_json::from_str::<ModelListing>(raw).unwrap();
		let ids: Vec<String> = listing.data.into_iter().map(|entry| entry.id).collect();
		assert_eq!(ids, ["gpt-4o", "gpt-5"]);
	}
}
