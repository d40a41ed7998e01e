// Library interface for upnews modules
// This allows tests and the binary to import modules

pub mod audit;
pub mod categorization;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod news;
pub mod pipeline;
pub mod selection;
pub mod storage;
