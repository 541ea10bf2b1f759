pub mod assistant;
pub mod catalog;
pub mod history;
pub mod recommendations;

pub use assistant::{Assistant, OpenAiAssistant, PollOptions};
pub use catalog::{MovieCatalog, TmdbCatalog};
pub use history::ConversationLog;
