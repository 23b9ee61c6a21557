//! A terminal front end for BinnAI.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use binnai::core::Role;
use binnai::image;
use binnai::input::{self, Command, LineAssembler};
use binnai::{ChatSessionBuilder, SendOutcome};
use binnai_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Chat with BinnAI from the terminal.
///
/// End a line with `\` to continue typing on the next line. Type `/clear`
/// to start over and `/quit` to leave.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Gemini API key, `GEMINI_API_KEY` is also accepted.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used for conversations.
    #[arg(long, env = "BINNAI_TEXT_MODEL")]
    text_model: Option<String>,

    /// Model used for image generation.
    #[arg(long, env = "BINNAI_IMAGE_MODEL")]
    image_model: Option<String>,

    /// Base URL of the Gemini API.
    #[arg(long, env = "BINNAI_BASE_URL")]
    base_url: Option<String>,

    /// Directory where generated images are saved.
    #[arg(long, env = "BINNAI_IMAGE_DIR")]
    image_dir: Option<PathBuf>,
}

/// The model message being written, as of the last update.
struct ReplySnapshot {
    text: String,
    image_url: Option<String>,
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let api_key = args
        .api_key
        .or_else(|| env::var("GEMINI_API_KEY").ok())
        .unwrap_or_else(|| {
            warn!("no API key is set, requests will be rejected");
            String::new()
        });

    let mut config = GeminiConfigBuilder::with_api_key(api_key);
    if let Some(model) = args.text_model {
        config = config.with_text_model(model);
    }
    if let Some(model) = args.image_model {
        config = config.with_image_model(model);
    }
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    let model_provider = GeminiProvider::new(config.build());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut session = ChatSessionBuilder::with_model_provider(model_provider)
        .on_update(move |state| {
            let Some(message) = state.conversation().last() else {
                return;
            };
            if message.role() != Role::Model {
                return;
            }
            event_tx
                .send(ReplySnapshot {
                    text: message.text().to_owned(),
                    image_url: message.image_url().map(ToOwned::to_owned),
                })
                .ok();
        })
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut stdin = BufReader::new(io::stdin());
    let mut assembler = LineAssembler::new();

    loop {
        print!("{}", if assembler.is_continuing() { "… " } else { "> " });
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let Some(message) = assembler.push_line(&line) else {
            continue;
        };

        let text = match Command::parse(&message) {
            Command::Send(text) => text,
            Command::Empty => continue,
            Command::Quit => break,
            Command::Clear => {
                print!("{} ", input::CLEAR_CONFIRMATION);
                std::io::stdout().flush().ok();
                let Some(answer) = read_line(&mut stdin).await else {
                    break;
                };
                if input::is_confirmed(&answer) {
                    session.reset();
                    println!("{}", "Percakapan dihapus.".dimmed());
                }
                continue;
            }
        };

        let mut printer = ReplyPrinter::new(args.image_dir.clone());
        let mut progress_bar = None;

        let outcome = {
            let send = session.send(&text);
            tokio::pin!(send);

            loop {
                // Spin until the first piece of the reply shows up.
                if !printer.has_output() {
                    progress_bar
                        .get_or_insert_with(|| {
                            let progress_bar = ProgressBar::new_spinner();
                            progress_bar.set_style(progress_style.clone());
                            progress_bar
                                .set_message("🤔 BinnAI sedang berpikir...");
                            progress_bar
                        })
                        .inc(1);
                }

                let sleep = sleep(Duration::from_millis(100));
                select! {
                    biased;
                    Some(snapshot) = event_rx.recv() => {
                        if let Some(progress_bar) = progress_bar.take() {
                            progress_bar.finish_and_clear();
                        }
                        printer.show(&snapshot);
                    }
                    outcome = &mut send => break outcome,
                    _ = sleep => {}
                }
            }
        };

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        while let Ok(snapshot) = event_rx.try_recv() {
            printer.show(&snapshot);
        }
        printer.finish();

        match outcome {
            SendOutcome::Failed(err) => {
                println!(
                    "{}⚠️  {}",
                    BAR_CHAR.bright_red(),
                    err.message().bright_red()
                );
            }
            SendOutcome::Rejected => {
                debug!("submission was rejected");
            }
            SendOutcome::Completed(_) => {}
        }
        println!();
    }
}

/// Prints a reply incrementally from successive snapshots.
struct ReplyPrinter {
    printed: usize,
    image_shown: bool,
    image_dir: Option<PathBuf>,
}

impl ReplyPrinter {
    fn new(image_dir: Option<PathBuf>) -> Self {
        Self {
            printed: 0,
            image_shown: false,
            image_dir,
        }
    }

    fn has_output(&self) -> bool {
        self.printed > 0 || self.image_shown
    }

    fn show(&mut self, snapshot: &ReplySnapshot) {
        // Text only ever grows, print what is new.
        if let Some(delta) = snapshot.text.get(self.printed..) {
            if !delta.is_empty() {
                if self.printed == 0 {
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                }
                print!("{}", delta.bright_white());
                std::io::stdout().flush().ok();
                self.printed = snapshot.text.len();
            }
        }

        if let Some(url) = &snapshot.image_url {
            if !self.image_shown {
                self.image_shown = true;
                self.show_image(url);
            }
        }
    }

    fn show_image(&self, url: &str) {
        if self.printed > 0 {
            println!();
        }
        println!(
            "{}🖼️  Gambar siap ({} karakter data URI)",
            BAR_CHAR.bright_magenta(),
            url.len()
        );

        let Some(dir) = &self.image_dir else {
            return;
        };
        let saved = image::decode_data_url(url)
            .map_err(|err| err.to_string())
            .and_then(|decoded| {
                image::save_to_dir(dir, &decoded).map_err(|err| err.to_string())
            });
        match saved {
            Ok(path) => println!(
                "{}💾 Disimpan ke {}",
                BAR_CHAR.bright_magenta(),
                path.display().bright_white()
            ),
            Err(err) => {
                error!("failed to save image: {err}");
                println!(
                    "{}⚠️  Gagal menyimpan gambar: {err}",
                    BAR_CHAR.bright_red()
                );
            }
        }
    }

    fn finish(&self) {
        if self.printed > 0 {
            println!();
        }
    }
}

async fn read_line(stdin: &mut BufReader<Stdin>) -> Option<String> {
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
