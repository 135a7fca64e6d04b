//! sqlscribe - human-in-the-loop SQL authoring over ClickHouse.
//!
//! The pipeline: introspect the database catalog once at startup, compile a
//! user-selected subset of tables into sentence-form schema text, splice it
//! into a prompt template, and send the prompt to an OpenAI-compatible
//! completion service. Generated SQL is only executed when the user
//! explicitly runs it.

pub mod catalog;
pub mod config;
pub mod llm;
pub mod prompt;
pub mod server;
