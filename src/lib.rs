// Public API for integration tests and potential library usage

pub mod audio;
pub mod cancel;
pub mod facts;
pub mod llm;
pub mod protocol;
pub mod state;
pub mod types;
pub mod ws;
