pub mod config;
pub mod event;

pub use config::{Config, ConfigError, MixedContentPolicy, RsmNumberPolicy};
pub use event::{EventChannels, ListenerId};
