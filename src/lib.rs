//! Ticket Agent - natural language commands for an issue tracker

pub mod command;
pub mod core;
pub mod llm;
pub mod security;
pub mod tracker;
