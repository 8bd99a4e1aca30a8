use std::sync::mpsc;

use crate::log::{log_level::LogLevel, log_msg::LogMsg, log_sink::LogSink};

/// Cloneable producer side of the file [`Logger`](crate::log::Logger).
///
/// Never blocks: when the bounded queue is full the line is dropped.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Enqueues a line without waiting.
    ///
    /// # Errors
    /// `TrySendError::Full` when the queue is at capacity, `Disconnected` once
    /// the writer thread is gone. The line is lost in both cases.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        self.tx.try_send(LogMsg::new(level, text, target))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc::{TrySendError, sync_channel};

    #[test]
    fn queued_line_keeps_level_and_target() {
        let (tx, rx) = sync_channel::<LogMsg>(2);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "offer created", "peercall::endpoint")
            .expect("queue has room");

        let msg = rx.recv().expect("a message should arrive");
        assert_eq!(msg.level, LogLevel::Info);
        assert_eq!(msg.text, "offer created");
        assert_eq!(msg.target, "peercall::endpoint");
    }

    #[test]
    fn full_queue_drops_line() {
        let (tx, _rx) = sync_channel::<LogMsg>(1);
        let h = LoggerHandle { tx };

        h.try_log(LogLevel::Info, "first", "t").expect("first fits");
        match h.try_log(LogLevel::Info, "second", "t") {
            Err(TrySendError::Full(_)) => {}
            other => panic!("expected Full, got: {other:?}"),
        }
    }

    #[test]
    fn closed_writer_reports_disconnected() {
        let (tx, rx) = sync_channel::<LogMsg>(1);
        drop(rx);
        let h = LoggerHandle { tx };

        // Through the sink interface the failure is swallowed.
        h.log(LogLevel::Error, "lost", "t");
        assert!(matches!(
            h.try_log(LogLevel::Error, "lost", "t"),
            Err(TrySendError::Disconnected(_))
        ));
    }
}
