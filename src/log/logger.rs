use crate::{
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, SyncSender, TrySendError},
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

const LOGGING_SECTION: &str = "Logging";
const PATH_KEY: &str = "call_log_path";
const FILENAME_KEY: &str = "call_log_filename";
const FALLBACK_FILE: &str = "peercall-fallback.log";

#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 100;

#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 1_000;

/// Bounded, non-blocking logger writing one file per process.
///
/// A background thread drains the queue into the file. Besides the file it
/// forwards a sample of the traffic to a small "tail" channel: warnings and
/// errors always, everything else one line out of `sample_every`. The demo
/// binary echoes that tail to stderr.
pub struct Logger {
    handle: LoggerHandle,
    tail_rx: Receiver<String>,
    _thread: Option<JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Starts the logger where `[Logging] call_log_path` points, or in
    /// `logs/` next to the executable when the key is missing.
    #[must_use]
    pub fn start(config: &Config, cap: usize, tail_cap: usize, sample_every: u32) -> Self {
        let app_name = config.get_non_empty(LOGGING_SECTION, FILENAME_KEY);
        let dir = config
            .get_non_empty(LOGGING_SECTION, PATH_KEY)
            .map_or_else(|| exe_dir_fallback_cwd().join("logs"), expand_path);
        Self::start_in_dir(dir, app_name, cap, tail_cap, sample_every)
    }

    /// Starts the logger in `dir`, creating it if needed. The file is named
    /// `<app_name>-<unix secs>-pid<pid>.log`.
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: Option<&str>,
        cap: usize,
        tail_cap: usize,
        sample_every: u32,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let fname = format!(
            "{}-{}-pid{}.log",
            app_name.unwrap_or("peercall"),
            secs,
            std::process::id()
        );
        let file_path = dir.join(fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap);
        let (tail_tx, tail_rx) = mpsc::sync_channel::<String>(tail_cap);

        let writer_path = file_path.clone();
        let sample_every = sample_every.max(1);
        let _thread = thread::Builder::new()
            .name("peercall-logger".into())
            .spawn(move || write_loop(&writer_path, &rx, &tail_tx, sample_every))
            .ok();

        Self {
            handle: LoggerHandle { tx },
            tail_rx,
            _thread,
            file_path,
        }
    }

    /// Cloneable sink for components.
    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    /// Next sampled line, if any.
    #[must_use]
    pub fn try_recv_tail(&self) -> Option<String> {
        self.tail_rx.try_recv().ok()
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn open_writer(path: &Path) -> Box<dyn Write + Send> {
    let open = |p: &Path| OpenOptions::new().create(true).append(true).open(p);
    match open(path) {
        Ok(f) => Box::new(f),
        Err(_) => match open(&std::env::temp_dir().join(FALLBACK_FILE)) {
            Ok(f) => Box::new(f),
            Err(_) => Box::new(io::sink()),
        },
    }
}

fn write_loop(
    path: &Path,
    rx: &Receiver<LogMsg>,
    tail_tx: &SyncSender<String>,
    sample_every: u32,
) {
    let mut out = BufWriter::new(open_writer(path));
    let mut sampled: u32 = 0;
    let mut written: u32 = 0;
    let mut dropped_tail: usize = 0;

    while let Ok(m) = rx.recv() {
        let _ = writeln!(&mut out, "{}", m.render());
        written = written.wrapping_add(1);
        if written % FLUSH_BATCH_SIZE == 0 {
            let _ = out.flush();
        }

        let forward = matches!(m.level, LogLevel::Warn | LogLevel::Error) || {
            sampled = sampled.wrapping_add(1);
            sampled % sample_every == 0
        };
        if forward
            && let Err(TrySendError::Full(_)) =
                tail_tx.try_send(format!("[{}] {}", m.level, m.text))
        {
            dropped_tail += 1;
        }
        if dropped_tail >= 10 {
            let _ = tail_tx.try_send(format!("(logger) tail dropped {dropped_tail} lines"));
            dropped_tail = 0;
        }
    }

    let _ = out.flush();
}

fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Expands a leading `~` to the home directory.
fn expand_path(path_str: &str) -> PathBuf {
    let home = || {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from)
    };
    if path_str == "~"
        && let Some(h) = home()
    {
        return h;
    }
    if let Some(rest) = path_str
        .strip_prefix("~/")
        .or_else(|| path_str.strip_prefix("~\\"))
        && let Some(h) = home()
    {
        return h.join(rest);
    }
    PathBuf::from(path_str)
}
