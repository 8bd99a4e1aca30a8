use std::sync::Arc;
use std::{env, process};

use peercall::config::Config;
use peercall::endpoint::Role;
use peercall::log::{LogSink, Logger};
use peercall::media::SyntheticCapture;
use peercall::orchestrator::{CallConfig, NegotiationOrchestrator};
use peercall::render::LogRenderer;
use peercall::turn::HttpCredentialProvider;

const DEFAULT_CONFIG: &str = "call_default.conf";

/// Echoes whatever the logger sampled since the last call.
fn echo_tail(logger: &Logger) {
    while let Some(line) = logger.try_recv_tail() {
        eprintln!("{line}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // --- Parse CLI args ----------------------------------------------------
    //
    //   cargo run --bin call_demo                 -> ./call_default.conf
    //   cargo run --bin call_demo -- other.conf   -> other.conf
    let args: Vec<String> = env::args().collect();
    let path = match args.len() {
        1 => DEFAULT_CONFIG.to_owned(),
        2 => args[1].clone(),
        _ => {
            eprintln!("Usage: {} [CONFIG]", args[0]);
            process::exit(1);
        }
    };
    let config = Config::load(&path).unwrap_or_else(|e| {
        eprintln!("[call_demo] {e}; using defaults");
        Config::empty()
    });

    // --- Start process logger ----------------------------------------------
    let logger = Logger::start(&config, 1024, 128, 10);
    let log_sink: Arc<dyn LogSink> = Arc::new(logger.handle());
    eprintln!("[call_demo] logging to {}", logger.file_path().display());

    let call_config = CallConfig::from_config(&config);
    let turn_timeout = call_config.turn_timeout;
    let renderer = Arc::new(LogRenderer::new(log_sink.clone()));
    let mut orchestrator = NegotiationOrchestrator::local(call_config, renderer, log_sink);

    // --- TURN relay (optional) ---------------------------------------------
    // A slow or broken credential service only costs us the relay path.
    if orchestrator.config().turn_url.is_some() {
        let provisioned = match HttpCredentialProvider::new(turn_timeout) {
            Ok(provider) => orchestrator.provision_turn(&provider).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = provisioned {
            eprintln!("[call_demo] {e}; continuing without TURN");
        }
    }

    let capture = SyntheticCapture::new(1, 1);
    if let Err(e) = orchestrator.acquire_media(&capture).await {
        eprintln!("[call_demo] {e}");
        process::exit(1);
    }

    let outcome = match orchestrator.start_call(Role::A).await {
        Ok(_) => orchestrator.wait_until_connected().await,
        Err(e) => Err(e),
    };
    echo_tail(&logger);
    match outcome {
        Ok(status) => eprintln!("[call_demo] call {status}"),
        Err(e) => eprintln!("[call_demo] {e}"),
    }

    for toggled in [
        orchestrator.toggle_video_mute(),
        orchestrator.toggle_audio_mute(),
    ] {
        match toggled {
            Ok(muted) => eprintln!("[call_demo] muted: {muted}"),
            Err(e) => eprintln!("[call_demo] {e}"),
        }
    }

    orchestrator.end_call().await;
    orchestrator.release_media();
    echo_tail(&logger);
    eprintln!("[call_demo] done");
}
