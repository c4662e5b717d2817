pub mod catalog;
pub mod client;
pub mod config;
pub mod models;
pub mod plugin;
pub mod session;
pub mod status;
pub mod transport;
pub mod ui;

pub use client::OpenAiClient;
pub use models::{ChatMessage, ChatRequest, ChatResponse, Error, ModelOption, Role};
pub use plugin::{HostContext, Plugin, PluginManifest};
pub use session::{ChatSession, RollbackPolicy, SendOutcome, SessionConfig};
pub use status::{ApiStatus, StatusMonitor};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};
