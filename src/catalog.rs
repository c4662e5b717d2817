use crate::client::OpenAiClient;
use crate::models::ModelOption;
use tracing::{debug, info};

/// Model families offered in the picker; other ids (embeddings, audio, ...) are dropped.
pub const MODEL_FAMILIES: &[&str] = &["gpt-3.5", "gpt-4"];

pub fn is_chat_model(id: &str) -> bool {
    MODEL_FAMILIES.iter().any(|family| id.contains(family))
}

pub fn default_options() -> Vec<ModelOption> {
    vec![
        ModelOption::new("gpt-3.5-turbo", "GPT-3.5 Turbo"),
        ModelOption::new("gpt-4", "GPT-4"),
        ModelOption::new("gpt-4-turbo", "GPT-4 Turbo"),
        ModelOption::new("gpt-4o", "GPT-4o"),
    ]
}

/// Outcome of a best-effort refresh of the model list.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelListing {
    Fetched(Vec<ModelOption>),
    KeepPrevious(String),
}

fn label_for(id: &str) -> String {
    match id.strip_prefix("gpt") {
        Some(rest) => format!("GPT{}", rest),
        None => id.to_string(),
    }
}

/// Keeps ids from the known families and sorts them by label.
pub fn select_options<I, S>(ids: I) -> Vec<ModelOption>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options: Vec<ModelOption> = ids
        .into_iter()
        .filter(|id| is_chat_model(id.as_ref()))
        .map(|id| ModelOption::new(id.as_ref(), label_for(id.as_ref())))
        .collect();
    options.sort_by(|a, b| a.label.cmp(&b.label));
    options
}

pub async fn fetch(client: &OpenAiClient, credential: &str) -> ModelListing {
    match client.list_models(credential).await {
        Ok(ids) => {
            let options = select_options(ids);
            if options.is_empty() {
                ModelListing::KeepPrevious("no chat models in listing".to_string())
            } else {
                ModelListing::Fetched(options)
            }
        }
        Err(e) => ModelListing::KeepPrevious(e.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    options: Vec<ModelOption>,
    pub loading: bool,
    pub loaded: bool,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            options: default_options(),
            loading: false,
            loaded: false,
        }
    }
}

impl ModelCatalog {
    pub fn options(&self) -> &[ModelOption] {
        &self.options
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    /// Returns true when the option set was replaced.
    pub fn apply(&mut self, listing: ModelListing) -> bool {
        self.loading = false;
        match listing {
            ModelListing::Fetched(options) if !options.is_empty() => {
                info!(count = options.len(), "model options refreshed");
                self.options = options;
                self.loaded = true;
                true
            }
            ModelListing::Fetched(_) => false,
            ModelListing::KeepPrevious(reason) => {
                debug!(%reason, "keeping previous model options");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{self, MockTransport};
    use std::sync::Arc;

    #[test]
    fn filters_families_and_sorts_by_label() {
        let options = select_options([
            "whisper-1",
            "gpt-4o",
            "text-embedding-3-small",
            "gpt-3.5-turbo",
            "dall-e-3",
            "gpt-4",
        ]);
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["gpt-3.5-turbo", "gpt-4", "gpt-4o"]);
        assert_eq!(options[0].label, "GPT-3.5-turbo");
    }

    #[test]
    fn chat_model_check_follows_families() {
        assert!(is_chat_model("gpt-4o-mini"));
        assert!(is_chat_model("gpt-3.5-turbo-16k"));
        assert!(!is_chat_model("davinci-002"));
        assert!(!is_chat_model(""));
    }

    #[test]
    fn empty_listing_keeps_defaults() {
        let mut catalog = ModelCatalog::default();
        assert!(!catalog.apply(ModelListing::Fetched(Vec::new())));
        assert_eq!(catalog.options(), default_options().as_slice());
        assert!(!catalog.loaded);
    }

    #[tokio::test]
    async fn unrelated_models_yield_keep_previous() {
        let transport = Arc::new(MockTransport::new(vec![mock::ok(
            r#"{"data":[{"id":"whisper-1"},{"id":"tts-1"}]}"#,
        )]));
        let client = OpenAiClient::new(transport);

        let listing = fetch(&client, "sk-a").await;
        assert!(matches!(listing, ModelListing::KeepPrevious(_)));

        let mut catalog = ModelCatalog::default();
        let before = catalog.options().to_vec();
        catalog.apply(listing);
        assert_eq!(catalog.options(), before.as_slice());
    }

    #[tokio::test]
    async fn failure_is_typed_not_raised() {
        let transport = Arc::new(MockTransport::new(vec![mock::status(500, "")]));
        let client = OpenAiClient::new(transport);

        assert_eq!(
            fetch(&client, "sk-a").await,
            ModelListing::KeepPrevious("HTTP 500 Internal Server Error".to_string())
        );
    }

    #[tokio::test]
    async fn successful_listing_replaces_options() {
        let transport = Arc::new(MockTransport::new(vec![mock::ok(
            r#"{"data":[{"id":"gpt-4o-mini"},{"id":"gpt-4"}]}"#,
        )]));
        let client = OpenAiClient::new(transport);

        let mut catalog = ModelCatalog::default();
        assert!(catalog.apply(fetch(&client, "sk-a").await));
        assert!(catalog.loaded);
        assert_eq!(catalog.options().len(), 2);
        assert!(catalog.contains("gpt-4o-mini"));
        assert!(!catalog.contains("gpt-3.5-turbo"));
    }
}
