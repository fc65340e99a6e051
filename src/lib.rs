pub mod codec;
pub mod compositor;
pub mod config;
pub mod errors;
pub mod provider;
pub mod remover;
pub mod session;
pub mod traits;

pub mod mocks;

pub use config::{Config, Settings};
pub use errors::{BackgroundRemovalError, Result};
pub use provider::ExecutionProvider;
pub use remover::BackgroundRemover;
pub use session::OnnxSession;
pub use traits::*;
