//! Command-line front end: run a live session against local services and
//! print sentence pairs as they arrive.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use translive::audio::CpalAudioSource;
use translive::config::Config;
use translive::events::PipelineEvent;
use translive::pipeline::LivePipeline;
use translive::session::SentenceStatus;
use translive::transcribe::WhisperServerClient;
use translive::translate::OllamaClient;

#[derive(Parser, Debug)]
#[command(name = "translive", version, about = "Live transcription with ongoing translation")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source language code, or "auto".
    #[arg(long)]
    source_language: Option<String>,

    /// Target language code.
    #[arg(long)]
    target_language: Option<String>,

    /// Input device name; default input device when omitted.
    #[arg(long)]
    device: Option<String>,

    /// List available input devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Write the finalized session as JSON to this path.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "translive=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_devices {
        for name in CpalAudioSource::list_devices().context("enumerating input devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load(path).context("loading configuration")?,
        None => Config::default(),
    };
    if let Some(lang) = args.source_language {
        config.session.source_language = lang;
    }
    if let Some(lang) = args.target_language {
        config.session.target_language = lang;
    }

    let source = CpalAudioSource::new(args.device.as_deref()).context("opening audio device")?;
    let engine = Arc::new(WhisperServerClient::new(&config.speech));
    let model = Arc::new(OllamaClient::new(&config.llm));

    let (handle, mut events) = LivePipeline::start(&config, source, engine, model);
    eprintln!("recording; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(PipelineEvent::SentenceReady(sentence)) => {
                    println!("  {}", sentence.display_text());
                }
                Some(PipelineEvent::SentenceUpdate(sentence)) => {
                    if sentence.status == SentenceStatus::Translated {
                        if let Some(translated) = &sentence.translated_text {
                            println!("  -> {}", translated);
                        }
                    }
                }
                Some(PipelineEvent::FallbackModeChanged { active }) => {
                    if active {
                        eprintln!("translation unavailable, continuing transcription-only");
                    } else {
                        eprintln!("translation restored");
                    }
                }
                Some(PipelineEvent::CaptureFailed { message }) => {
                    eprintln!("audio capture failed: {}", message);
                    break;
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    let session = handle.stop().await.context("stopping session")?;
    eprintln!(
        "session {}: {} sentences, {} translated, {} failed",
        session.id,
        session.stats.sentences_total,
        session.stats.sentences_translated,
        session.stats.sentences_failed
    );

    if let Some(path) = args.output {
        std::fs::write(&path, session.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("session exported to {}", path.display());
    }
    Ok(())
}
