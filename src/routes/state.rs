use std::sync::Arc;

use crate::{
    auth::SessionStore,
    config::Config,
    db::AccountStore,
    services::{
        Assistant, ConversationLog, MovieCatalog, OpenAiAssistant, PollOptions, TmdbCatalog,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn MovieCatalog>,
    pub assistant: Arc<dyn Assistant>,
    pub accounts: AccountStore,
    pub sessions: SessionStore,
    pub conversations: ConversationLog,
    pub poll: PollOptions,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        assistant: Arc<dyn Assistant>,
        accounts: AccountStore,
        poll: PollOptions,
    ) -> Self {
        Self {
            catalog,
            assistant,
            accounts,
            sessions: SessionStore::default(),
            conversations: ConversationLog::new(),
            poll,
        }
    }

    /// Builds the production clients from configuration
    pub fn from_config(config: &Config, accounts: AccountStore) -> Self {
        let catalog = TmdbCatalog::new(
            config.tmdb_api_key.clone(),
            config.tmdb_access_token.clone(),
            config.tmdb_api_url.clone(),
        );
        let assistant = OpenAiAssistant::new(
            config.openai_api_key.clone(),
            config.openai_assistant_id.clone(),
            config.openai_api_url.clone(),
        );
        let poll = PollOptions {
            interval: config.poll_interval(),
            timeout: config.poll_timeout(),
        };

        Self {
            sessions: SessionStore::new(config.session_ttl()),
            ..Self::new(Arc::new(catalog), Arc::new(assistant), accounts, poll)
        }
    }
}
