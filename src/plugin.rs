//! Plugin descriptor and host entry point.
//!
//! The host hands everything the widgets need to `Plugin::init` through a
//! `HostContext`: the HTTP runtime, the initial key and greeting. Nothing is
//! looked up from process-wide state.

use crate::client::OpenAiClient;
use crate::config::{Settings, DEFAULT_REFRESH_SECS};
use crate::session::{
    ChatSession, RollbackPolicy, SessionConfig, DEFAULT_GREETING, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use crate::status::StatusMonitor;
use crate::transport::Transport;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const PLUGIN_NAME: &str = "OpenAIPlugin";
pub const STATUS_MODULE: &str = "ComponentOpenAIStatus";
pub const CHAT_MODULE: &str = "ComponentOpenAIChat";

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
    pub default: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub min_width: u32,
    pub min_height: u32,
    pub default_width: u32,
    pub default_height: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleManifest {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: &'static str,
    pub priority: u32,
    pub props: BTreeMap<&'static str, FieldSpec>,
    pub config_fields: BTreeMap<&'static str, FieldSpec>,
    /// HTTP methods this module needs from the host's API service.
    pub required_methods: Vec<&'static str>,
    pub layout: Layout,
    pub tags: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginManifest {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub icon: &'static str,
    pub category: &'static str,
    pub permissions: Vec<&'static str>,
    pub modules: Vec<ModuleManifest>,
}

fn field(kind: &'static str, description: &'static str, default: Value) -> FieldSpec {
    FieldSpec { kind, description, default }
}

impl PluginManifest {
    pub fn new() -> Self {
        let status = ModuleManifest {
            name: STATUS_MODULE,
            display_name: "OpenAI API Status Monitor",
            description: "Monitor OpenAI API status and API key validity",
            icon: "ApiKey",
            category: "ai",
            priority: 1,
            props: BTreeMap::new(),
            config_fields: BTreeMap::from([(
                "refresh_interval",
                field("number", "Auto-refresh interval in seconds", json!(DEFAULT_REFRESH_SECS)),
            )]),
            required_methods: vec!["get"],
            layout: Layout { min_width: 3, min_height: 2, default_width: 4, default_height: 3 },
            tags: vec!["ai", "openai", "api", "status", "key"],
        };

        let chat = ModuleManifest {
            name: CHAT_MODULE,
            display_name: "OpenAI Chat Interface",
            description: "Interactive chat interface with OpenAI models including dynamic model selection",
            icon: "MessageSquare",
            category: "ai",
            priority: 2,
            props: BTreeMap::from([
                ("initialGreeting", field("string", "Initial greeting message", json!(DEFAULT_GREETING))),
                ("apiKey", field("string", "OpenAI API Key", json!(""))),
            ]),
            config_fields: BTreeMap::from([
                ("default_model", field("string", "Default OpenAI model to use", json!(DEFAULT_MODEL))),
                ("max_tokens", field("number", "Maximum tokens per response", json!(DEFAULT_MAX_TOKENS))),
                ("temperature", field("number", "Response creativity (0-1)", json!(DEFAULT_TEMPERATURE))),
            ]),
            required_methods: vec!["post"],
            layout: Layout { min_width: 4, min_height: 4, default_width: 6, default_height: 6 },
            tags: vec!["ai", "openai", "chat", "conversation", "models"],
        };

        Self {
            name: PLUGIN_NAME,
            description: "OpenAI API status and key validity monitoring",
            version: env!("CARGO_PKG_VERSION"),
            kind: "frontend",
            icon: "ApiKey",
            category: "ai",
            permissions: vec!["network.read", "storage.read", "storage.write"],
            modules: vec![status, chat],
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleManifest> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the host provides when loading the plugin.
pub struct HostContext {
    pub transport: Arc<dyn Transport>,
    pub settings: Settings,
    pub require_validated_key: bool,
    pub rollback: RollbackPolicy,
}

impl HostContext {
    pub fn new(transport: Arc<dyn Transport>, settings: Settings) -> Self {
        Self {
            transport,
            settings,
            require_validated_key: false,
            rollback: RollbackPolicy::default(),
        }
    }
}

/// The two independently usable widgets built from one `HostContext`.
pub struct Plugin {
    pub manifest: PluginManifest,
    pub status: StatusMonitor,
    pub chat: ChatSession,
    pub refresh_interval: Duration,
}

impl Plugin {
    pub fn init(host: HostContext) -> Self {
        let settings = host.settings;
        let client = Arc::new(OpenAiClient::with_base_url(host.transport, settings.base_url.clone()));

        let config = SessionConfig {
            greeting: settings.greeting.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            require_validated_key: host.require_validated_key,
            rollback: host.rollback,
        };

        Self {
            manifest: PluginManifest::new(),
            status: StatusMonitor::new(client.clone(), settings.api_key.clone()),
            chat: ChatSession::new(client, config, settings.api_key),
            refresh_interval: settings.refresh_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn manifest_lists_both_modules_with_defaults() {
        let manifest = PluginManifest::new();
        assert_eq!(manifest.modules.len(), 2);

        let status = manifest.module(STATUS_MODULE).unwrap();
        assert_eq!(status.config_fields["refresh_interval"].default, json!(30));

        let chat = manifest.module(CHAT_MODULE).unwrap();
        assert_eq!(chat.props["initialGreeting"].default, json!(DEFAULT_GREETING));
        assert_eq!(chat.config_fields["max_tokens"].default, json!(1000));
        assert_eq!(chat.config_fields["default_model"].default, json!("gpt-3.5-turbo"));
    }

    #[test]
    fn manifest_serializes_host_field_names() {
        let value = serde_json::to_value(PluginManifest::new()).unwrap();
        assert_eq!(value["type"], "frontend");
        assert_eq!(value["modules"][0]["layout"]["defaultWidth"], 4);
        assert_eq!(value["modules"][1]["config_fields"]["temperature"]["type"], "number");
    }

    #[test]
    fn init_threads_host_settings_into_widgets() {
        let settings = Settings {
            api_key: "sk-host".into(),
            greeting: "Hi from host".into(),
            model: "gpt-4".into(),
            refresh_interval: Duration::from_secs(10),
            ..Settings::default()
        };
        let mut host = HostContext::new(Arc::new(MockTransport::default()), settings);
        host.require_validated_key = true;

        let plugin = Plugin::init(host);
        let snap = plugin.chat.snapshot();
        assert_eq!(snap.credential, "sk-host");
        assert_eq!(snap.selected_model, "gpt-4");
        assert_eq!(snap.messages[0].content, "Hi from host");
        assert!(plugin.chat.config().require_validated_key);
        assert_eq!(plugin.refresh_interval, Duration::from_secs(10));
    }
}
