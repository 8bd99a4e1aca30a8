use crate::log::log_level::LogLevel;

/// Anything that can accept log lines. Shared across tasks as `Arc<dyn LogSink>`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
