pub mod core;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod sources;
pub mod state;

#[cfg(test)]
mod test_support;
