//! An interactive terminal client for a switchyard session.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use switchyard::SessionBuilder;
use switchyard::core::tool::Approval as ToolApproval;
use switchyard::core::{AgentId, GenerationError};
use switchyard_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

enum SessionEvent {
    Idle,
    Transcript(String, AgentId),
    CodeRequest(ToolApproval),
    Failed(String),
}

enum Command<'a> {
    Image(&'a str),
    Audio(&'a str),
    State,
    Quit,
    Unknown(&'a str),
    Message(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let Some(command) = line.strip_prefix('/') else {
            return Command::Message(line);
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(name, arg)| (name, arg.trim()))
            .unwrap_or((command, ""));
        match name {
            "image" if !arg.is_empty() => Command::Image(arg),
            "audio" if !arg.is_empty() => Command::Audio(arg),
            "state" => Command::State,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(name),
        }
    }
}

const BAR_CHAR: &str = "▎";
const DEFAULT_MODEL: &str = "gpt-4o";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        eprintln!("OPENAI_API_KEY environment variable is not set");
        return;
    };
    let base_url = env::var("OPENAI_BASE_URL").ok();
    let model_provider = |model_var: &str| {
        let model =
            env::var(model_var).unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        let mut config =
            OpenAIConfigBuilder::with_api_key(&api_key).with_model(model);
        if let Some(base_url) = &base_url {
            config = config.with_base_url(base_url);
        }
        OpenAIProvider::new(config.build())
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let session = SessionBuilder::with_model_providers(
        model_provider("SWITCHYARD_MULTIMODAL_MODEL"),
        model_provider("SWITCHYARD_CODING_MODEL"),
    )
    .on_idle({
        let event_tx = event_tx.clone();
        move || {
            event_tx.send(SessionEvent::Idle).ok();
        }
    })
    .on_transcript({
        let event_tx = event_tx.clone();
        move |transcript, agent| {
            event_tx
                .send(SessionEvent::Transcript(transcript.to_owned(), agent))
                .ok();
        }
    })
    .on_code_request({
        let event_tx = event_tx.clone();
        move |approval| {
            event_tx.send(SessionEvent::CodeRequest(approval)).ok();
        }
    })
    .on_error(move |err: &GenerationError| {
        event_tx.send(SessionEvent::Failed(err.to_string())).ok();
    })
    .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut stdin = io::BufReader::new(io::stdin());

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let sent = match Command::parse(line.trim()) {
            Command::Image(path) => {
                if let Some(data) = read_attachment(path).await {
                    session.attach_image(data).ok();
                    println!("{} image staged", BAR_CHAR.bright_green());
                }
                continue;
            }
            Command::Audio(path) => {
                if let Some(data) = read_attachment(path).await {
                    session.attach_audio(data).ok();
                    println!("{} audio staged", BAR_CHAR.bright_green());
                }
                continue;
            }
            Command::State => {
                if let Ok(state) = session.snapshot().await {
                    println!(
                        "{} {} messages, {} images and {} audios staged",
                        BAR_CHAR.bright_blue(),
                        state.messages.len(),
                        state.images.len(),
                        state.audios.len(),
                    );
                }
                continue;
            }
            Command::Quit => break,
            Command::Unknown(name) => {
                eprintln!("unknown command: /{name}");
                continue;
            }
            // An empty line sends staged attachments, or goes idle at once.
            Command::Message(text) => session.send_message(text),
        };
        if sent.is_err() {
            error!("session is no longer running");
            break;
        }

        let mut progress_bar = None;
        // Set while a reply is being printed.
        let mut streaming = false;

        loop {
            // Create a new progress bar if it has been finished.
            if !streaming {
                progress_bar
                    .get_or_insert_with(|| {
                        let progress_bar = ProgressBar::new_spinner();
                        progress_bar.set_style(progress_style.clone());
                        progress_bar.set_message("🤔 Thinking...");
                        progress_bar
                    })
                    .inc(1);
            }

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break 'outer;
                    };
                    event
                },
                _ = sleep => {
                    continue;
                }
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = &progress_bar {
                progress_bar.finish_and_clear();
            }
            progress_bar = None;

            if streaming && !matches!(event, SessionEvent::Transcript(..)) {
                println!();
                streaming = false;
            }

            match event {
                SessionEvent::CodeRequest(approval) => {
                    let bar = BAR_CHAR.bright_yellow();
                    println!("\n{bar}⚠️  {}:", approval.justification());
                    for line in approval.what().lines() {
                        println!("{bar}{}", line.bright_white().bold());
                    }
                    print!("Proceed? [Y/n]: ");
                    std::io::stdout().flush().ok();

                    let Some(line) = read_line(&mut stdin).await else {
                        break 'outer;
                    };
                    let line = line.trim();
                    if line.is_empty() || line.eq_ignore_ascii_case("y") {
                        approval.approve();
                    } else {
                        approval.reject(None);
                    }

                    println!();
                }
                SessionEvent::Transcript(transcript, agent) => {
                    if !streaming {
                        let icon = match agent {
                            AgentId::Multimodal => "👁️ ",
                            AgentId::Coding => "🤖",
                        };
                        print!("{}{icon} ", BAR_CHAR.bright_cyan());
                        streaming = true;
                    }
                    print!("{}", transcript.bright_white());
                    std::io::stdout().flush().ok();
                }
                SessionEvent::Failed(reason) => {
                    println!("{}❌ {}", BAR_CHAR.bright_red(), reason.red());
                }
                SessionEvent::Idle => {
                    break;
                }
            }
        }
    }
}

async fn read_attachment(path: &str) -> Option<String> {
    match tokio::fs::read(Path::new(path)).await {
        Ok(bytes) => Some(BASE64.encode(bytes)),
        Err(err) => {
            eprintln!("cannot read {path}: {err}");
            None
        }
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(stdin: &mut R) -> Option<String> {
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
