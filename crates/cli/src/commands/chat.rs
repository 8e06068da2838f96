//! Chat command handler.
//!
//! Interactive loop over stdin. The conversation so far is passed to every
//! run so follow-up questions can be resolved.

use super::open_workflow;
use crate::transcript::{Transcript, TranscriptEntry};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use verirag_core::{config::AppConfig, AppError, AppResult};
use verirag_workflow::{CancellationToken, ChatTurn, RunRequest, Workflow, WorkflowState};

/// Interactive chat session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Maximum regeneration attempts after a rejected answer
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Directory for saved transcripts (default: .verirag/transcripts)
    #[arg(long)]
    pub transcript: Option<PathBuf>,
}

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Save,
    Question(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Empty,
        "quit" | "exit" => Input::Quit,
        "save" => Input::Save,
        _ => Input::Question(line),
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let (workflow, store) = open_workflow(config)?;
        let transcript_dir = self
            .transcript
            .clone()
            .unwrap_or_else(|| config.transcripts_dir());

        println!("Verirag interactive chat");
        match store.count().await {
            Ok(count) => println!("The index holds {} passages.", count),
            Err(e) => tracing::warn!("Could not count indexed passages: {}", e),
        }
        println!("Type a question, 'save' to write a transcript, 'quit' or 'exit' to leave.\n");

        let mut history: Vec<ChatTurn> = Vec::new();
        let mut transcript = Transcript::default();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("You: ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                println!();
                break;
            };

            match parse_input(&line) {
                Input::Empty => continue,
                Input::Quit => break,
                Input::Save => {
                    save(&transcript, &transcript_dir);
                    continue;
                }
                Input::Question(question) => {
                    let request = RunRequest::new(question).with_history(history.clone());
                    match ask_interruptible(&workflow, request).await {
                        Ok(state) => {
                            println!("\nAssistant:\n{}\n", state.final_answer);
                            if !state.sources.is_empty() {
                                println!("Sources: {}\n", state.sources.join(", "));
                            }
                            history.push(ChatTurn::user(question));
                            history.push(ChatTurn::assistant(reply_for_history(&state)));
                            transcript.push(TranscriptEntry::from_state(&state));
                        }
                        Err(AppError::Cancelled) => println!("\n(cancelled)\n"),
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        if !transcript.is_empty() {
            println!("Auto-saving transcript...");
            save(&transcript, &transcript_dir);
        }
        println!("Goodbye!");
        Ok(())
    }
}

/// Run a question; Ctrl-C cancels it at the next step boundary.
async fn ask_interruptible(workflow: &Workflow, request: RunRequest) -> AppResult<WorkflowState> {
    let token = CancellationToken::new();
    let run = workflow.run_cancellable(request.with_cancel(token.clone()));
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            token.cancel();
            run.await
        }
    }
}

/// The answer text without the confidence footer.
fn reply_for_history(state: &WorkflowState) -> String {
    if state.generated_answer.is_empty() {
        state.final_answer.clone()
    } else {
        state.generated_answer.clone()
    }
}

fn save(transcript: &Transcript, dir: &std::path::Path) {
    if transcript.is_empty() {
        println!("No chat history to save.");
        return;
    }
    match transcript.save(dir) {
        Ok(path) => println!(
            "Saved {} questions to {}",
            transcript.len(),
            path.display()
        ),
        Err(e) => {
            tracing::error!("Failed to save transcript: {}", e);
            println!("Could not save transcript: {}", e);
        }
    }
}
