use crate::openai::CompletionApi;

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gpt-5";
/// Substituted for [`DEFAULT_MODEL`] when it answers with a suspiciously short text.
pub const SHORT_RESPONSE_FALLBACK: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Known-good models in fallback order. Validation falls back to this list whenever the live
/// listing can't be fetched, and provider errors walk it front to back.
pub const FALLBACK_MODELS: &[&str] = &["gpt-5", "gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"];

const MAX_COMPLETION_TOKENS_FAMILIES: &[&str] = &["gpt-5", "gpt-4o", "o1", "o3", "o4", "gpt-4.1"];
const FIXED_TEMPERATURE_FAMILIES: &[&str] = &["gpt-5", "o1", "o3", "o4"];

/// Newer model families renamed the token cap from `max_tokens` to `max_completion_tokens`.
/// Prefix match, case-sensitive.
pub fn uses_max_completion_tokens(model: &str) -> bool {
	MAX_COMPLETION_TOKENS_FAMILIES.iter().any(|family| model.starts_with(family))
}

/// Reasoning-line models reject any temperature but the server default.
pub fn supports_custom_temperature(model: &str) -> bool {
	!FIXED_TEMPERATURE_FAMILIES.iter().any(|family| model.starts_with(family))
}

/// Ordered, deduplicated set of model ids the user is allowed to request. Populated once per
/// process and read-only after.
#[derive(Clone, Debug, derive_more::Deref)]
pub struct ModelRegistry(Vec<String>);

impl ModelRegistry {
	pub fn fallback() -> Self {
		Self::from_ids(FALLBACK_MODELS.iter().map(|id| id.to_string()))
	}

	/// Asks the provider for its current model listing, which supersedes [`FALLBACK_MODELS`] on
	/// success. Any failure (or an empty listing) is logged and swallowed, leaving the static
	/// list in charge of validation.
	pub async fn resolve<C: CompletionApi>(api: &C) -> Self {
		match api.list_models().await {
			Ok(ids) if !ids.is_empty() => Self::from_ids(ids),
			Ok(_) => {
				tracing::warn!("provider returned an empty model listing, using the fallback list");
				Self::fallback()
			}
			Err(e) => {
				tracing::warn!("error fetching models: {e}");
				Self::fallback()
			}
		}
	}

	fn from_ids(ids: impl IntoIterator<Item = String>) -> Self {
		let mut seen: Vec<String> = Vec::new();
		for id in ids {
			if !seen.contains(&id) {
				seen.push(id);
			}
		}
		Self(seen)
	}

	pub fn contains(&self, model: &str) -> bool {
		self.0.iter().any(|id| id == model)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn newer_families_use_max_completion_tokens() {
		for model in ["gpt-5", "gpt-5-mini", "gpt-4o", "o1-mini", "o3-mini", "o4-mini", "gpt-4.1", "gpt-4.1-nano"] {
			assert!(uses_max_completion_tokens(model), "{model}");
		}
	}

	#[test]
	fn older_families_use_max_tokens() {
		for model in ["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "davinci-002"] {
			assert!(!uses_max_completion_tokens(model), "{model}");
		}
	}

	#[test]
	fn reasoning_families_reject_custom_temperature() {
		for model in ["gpt-5", "gpt-5-nano", "o1-mini", "o3-mini", "o4-mini"] {
			assert!(!supports_custom_temperature(model), "{model}");
		}
	}

	#[test]
	fn chat_families_accept_custom_temperature() {
		for model in ["gpt-4o", "gpt-4o-mini", "gpt-4", "gpt-3.5-turbo", "davinci-002"] {
			assert!(supports_custom_temperature(model), "{model}");
		}
	}

	// `gpt-4` is a prefix of `gpt-4o` too, so order inside the family lists must not matter.
	#[test]
	fn prefix_matching_is_per_identifier_not_per_family_order() {
		assert!(uses_max_completion_tokens("gpt-4o-2024-08-06"));
		assert!(!uses_max_completion_tokens("gpt-4-0613"));
	}

	#[test]
	fn registry_deduplicates_preserving_first_occurrence() {
		let registry = ModelRegistry::from_ids(["b", "a", "b", "c", "a"].map(String::from));
		assert_eq!(*registry, ["b", "a", "c"].map(String::from));
	}

	#[test]
	fn fallback_registry_carries_the_default() {
		let registry = ModelRegistry::fallback();
		assert!(registry.contains(DEFAULT_MODEL));
		assert_eq!(registry.len(), FALLBACK_MODELS.len());
		assert!(!registry.contains("gpt-2"));
	}
}
