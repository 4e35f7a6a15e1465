//! Terminal front ends: the interactive chat REPL and one-shot `ask`.
//!
//! Plain input lines are questions. Lines starting with `/` are commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/load <pdf>...` | Load (replace) the document set |
//! | `/reset` | Drop the documents and the conversation |
//! | `/clear` | Clear the conversation, keep the documents |
//! | `/history` | Print the conversation |
//! | `/status` | Print pipeline state and corpus counts |
//! | `/quit` | Exit (also on end of input) |

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::Config;
use crate::pipeline::{LoadReport, Pipeline, PipelineState};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Load(Vec<PathBuf>),
    Reset,
    Clear,
    History,
    Status,
    Quit,
    Help,
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Ask(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    match parts.next().unwrap_or("") {
        "load" => ReplCommand::Load(parts.map(PathBuf::from).collect()),
        "reset" => ReplCommand::Reset,
        "clear" => ReplCommand::Clear,
        "history" => ReplCommand::History,
        "status" => ReplCommand::Status,
        "quit" | "exit" => ReplCommand::Quit,
        "help" => ReplCommand::Help,
        other => ReplCommand::Unknown(other.to_string()),
    }
}

fn print_report(out: &mut impl Write, report: &LoadReport) -> std::io::Result<()> {
    writeln!(
        out,
        "Loaded {} document(s), {} page(s), {} chunk(s).",
        report.documents, report.pages, report.chunks
    )
}

/// Drive `session` from `input` until `/quit` or end of input.
pub async fn run_repl<R, W>(session: &Session, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    writeln!(out, "Ask a question about your PDFs. /help lists commands.")?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Ask(query) => {
                let reply = session.chat(&query).await;
                writeln!(out, "{}", reply)?;
            }
            ReplCommand::Load(paths) => match session.load(&paths).await {
                Ok(report) => print_report(out, &report)?,
                Err(e) => writeln!(out, "{}", e.user_message())?,
            },
            ReplCommand::Reset => {
                session.reset(true).await;
                writeln!(out, "Documents and conversation cleared.")?;
            }
            ReplCommand::Clear => {
                session.clear_transcript().await;
                writeln!(out, "Conversation cleared; documents kept.")?;
            }
            ReplCommand::History => {
                let turns = session.transcript().await;
                if turns.is_empty() {
                    writeln!(out, "(no conversation yet)")?;
                }
                for turn in turns {
                    writeln!(out, "{}: {}", turn.role, turn.text)?;
                }
            }
            ReplCommand::Status => {
                let status = session.status().await;
                match status.state {
                    PipelineState::Empty => writeln!(out, "No documents loaded.")?,
                    PipelineState::Ready => {
                        writeln!(
                            out,
                            "Ready: {} document(s), {} chunk(s).",
                            status.documents, status.chunks
                        )?;
                        for source in &status.sources {
                            writeln!(out, "  {}", source)?;
                        }
                    }
                }
            }
            ReplCommand::Help => {
                writeln!(
                    out,
                    "/load <pdf>...  /reset  /clear  /history  /status  /quit"
                )?;
            }
            ReplCommand::Unknown(name) => {
                writeln!(out, "Unknown command: /{} (try /help)", name)?;
            }
            ReplCommand::Quit => break,
        }
    }

    Ok(())
}

/// `pdfqa chat`: optionally preload `pdfs`, then read questions from stdin.
pub async fn run_chat(config: &Config, pdfs: &[PathBuf]) -> Result<()> {
    let session = Session::new(Pipeline::from_config(config)?);
    let mut stdout = std::io::stdout();

    if !pdfs.is_empty() {
        match session.load(pdfs).await {
            Ok(report) => print_report(&mut stdout, &report)?,
            Err(e) => writeln!(stdout, "{}", e.user_message())?,
        }
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_repl(&session, stdin, &mut stdout).await
}

/// `pdfqa ask`: load `pdfs`, answer one question, print it.
pub async fn run_ask(config: &Config, question: &str, pdfs: &[PathBuf], sources: bool) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    pipeline.load(pdfs).await?;
    let answer = pipeline.try_ask(question).await?;

    println!("{}", answer.text);
    if sources {
        println!();
        println!("Sources:");
        for (i, source) in answer.sources.iter().enumerate() {
            println!(
                "  [{}] {} (page {}, score {:.3})",
                i + 1,
                source.path,
                source.page,
                source.score
            );
        }
    }

    Ok(())
}
