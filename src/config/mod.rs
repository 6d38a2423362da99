mod settings;

pub use settings::{LogConfig, LogFormat, RenderConfig, ServerConfig, Settings};
