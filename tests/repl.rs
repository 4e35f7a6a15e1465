//! Chat REPL commands driven through `run_repl`.

mod common;

use tempfile::TempDir;

use common::*;
use pdfqa::chat::run_repl;
use pdfqa::pipeline::{PipelineSettings, PipelineState};
use pdfqa::session::Session;

async fn drive(session: &Session, script: &str) -> String {
    let mut out = Vec::new();
    run_repl(session, script.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn clear_forgets_conversation_and_keeps_documents() {
    let tmp = TempDir::new().unwrap();
    let pdf = write_pdf(tmp.path(), "facts.pdf", &[FRANCE]);
    let session = Session::new(harness(PipelineSettings::default()).pipeline);
    session.load(&[pdf]).await.unwrap();

    let output = drive(&session, "capital of France?\n/clear\n/status\n/history\n").await;

    assert!(output.contains("Conversation cleared; documents kept."), "output: {}", output);
    assert!(output.contains("Ready: 1 document(s)"), "output: {}", output);
    assert!(output.contains("(no conversation yet)"), "output: {}", output);
    assert_eq!(session.status().await.state, PipelineState::Ready);
    assert!(session.transcript().await.is_empty());
}

#[tokio::test]
async fn reset_drops_documents_and_conversation() {
    let tmp = TempDir::new().unwrap();
    let pdf = write_pdf(tmp.path(), "facts.pdf", &[FRANCE]);
    let session = Session::new(harness(PipelineSettings::default()).pipeline);
    session.load(&[pdf]).await.unwrap();

    let output = drive(&session, "capital of France?\n/reset\n/status\n").await;

    assert!(output.contains("Paris"), "output: {}", output);
    assert!(output.contains("No documents loaded."), "output: {}", output);
    assert_eq!(session.status().await.state, PipelineState::Empty);
    assert!(session.transcript().await.is_empty());
}
