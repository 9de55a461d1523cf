//! Production collaborator implementations.
//!
//! Each provider implements one of the collaborator traits over HTTP.
//! They are thin boundary adapters: request shaping and response parsing,
//! no pipeline logic.

mod openai;
mod tavily;
mod wikipedia;

pub use openai::OpenAiCompatibleGenerator;
pub use tavily::TavilySearch;
pub use wikipedia::WikipediaKnowledgeBase;
