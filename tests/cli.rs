//! End-to-end tests driving the `pdfqa` binary.

mod common;

use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::*;
use pdfqa_core::NOT_READY_MESSAGE;

fn pdfqa(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pdfqa"));
    cmd.current_dir(dir)
        .env_remove("GOOGLE_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> (String, String, bool) {
    let output = cmd.output().expect("failed to run pdfqa");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn inspect_reports_pages_and_chunks() {
    let tmp = TempDir::new().unwrap();
    write_pdf(tmp.path(), "facts.pdf", &[FRANCE, BANANAS, EVEREST]);

    let (stdout, stderr, ok) = run(pdfqa(tmp.path()).args(["inspect", "facts.pdf"]));

    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("facts.pdf: 3 pages"), "stdout: {}", stdout);
    assert!(stdout.contains("documents: 1, pages: 3, chunks: 1"), "stdout: {}", stdout);
}

#[test]
fn inspect_honours_chunk_size_override() {
    let tmp = TempDir::new().unwrap();
    write_pdf(tmp.path(), "facts.pdf", &[FRANCE, BANANAS, EVEREST]);

    let (stdout, stderr, ok) = run(pdfqa(tmp.path())
        .env("PDFQA_CHUNK_SIZE", "40")
        .env("PDFQA_CHUNK_OVERLAP", "0")
        .args(["inspect", "facts.pdf"]));

    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("chunks: 3 (chunk_size 40, overlap 0)"), "stdout: {}", stdout);
}

#[test]
fn inspect_missing_file_fails() {
    let tmp = TempDir::new().unwrap();

    let (_, stderr, ok) = run(pdfqa(tmp.path()).args(["inspect", "nope.pdf"]));

    assert!(!ok);
    assert!(stderr.contains("file not found"), "stderr: {}", stderr);
}

#[test]
fn explicit_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    write_pdf(tmp.path(), "facts.pdf", &[FRANCE]);

    let (_, stderr, ok) = run(pdfqa(tmp.path()).args([
        "--config",
        "missing.toml",
        "inspect",
        "facts.pdf",
    ]));

    assert!(!ok);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}

#[test]
fn invalid_chunking_config_fails() {
    let tmp = TempDir::new().unwrap();
    write_pdf(tmp.path(), "facts.pdf", &[FRANCE]);
    std::fs::write(
        tmp.path().join("bad.toml"),
        "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n",
    )
    .unwrap();

    let (_, stderr, ok) = run(pdfqa(tmp.path()).args([
        "--config",
        "bad.toml",
        "inspect",
        "facts.pdf",
    ]));

    assert!(!ok);
    assert!(stderr.contains("chunk_overlap"), "stderr: {}", stderr);
}

#[test]
fn ask_without_api_key_fails() {
    let tmp = TempDir::new().unwrap();
    write_pdf(tmp.path(), "facts.pdf", &[FRANCE]);

    let (_, stderr, ok) = run(pdfqa(tmp.path()).args([
        "ask",
        "What is the capital of France?",
        "--pdf",
        "facts.pdf",
    ]));

    assert!(!ok);
    assert!(stderr.contains("GOOGLE_API_KEY"), "stderr: {}", stderr);
}

#[test]
fn chat_before_load_prints_not_ready() {
    let tmp = TempDir::new().unwrap();

    let mut child = pdfqa(tmp.path())
        .env("PDFQA_EMBEDDING_PROVIDER", "ollama")
        .env("PDFQA_GENERATION_PROVIDER", "ollama")
        .arg("chat")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"What is this about?\n/status\n/quit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains(NOT_READY_MESSAGE), "stdout: {}", stdout);
    assert!(stdout.contains("No documents loaded."), "stdout: {}", stdout);
}

fn ollama_embed_echo(req: &Request) -> ResponseTemplate {
    let body: Value = serde_json::from_slice(&req.body).unwrap();
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let embeddings: Vec<Value> = inputs
        .iter()
        .map(|text| {
            let text = text.as_str().unwrap_or("").to_lowercase();
            json!([
                if text.contains("france") { 1.0 } else { 0.0 },
                if text.contains("banana") { 1.0 } else { 0.0 },
                0.1
            ])
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
}

#[tokio::test(flavor = "multi_thread")]
async fn ask_end_to_end_with_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ollama_embed_echo)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "The capital of France is Paris." },
            "done": true
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    write_pdf(tmp.path(), "facts.pdf", &[FRANCE, BANANAS]);
    std::fs::write(
        tmp.path().join("pdfqa.toml"),
        format!(
            "[chunking]\nchunk_size = 40\nchunk_overlap = 0\n\n\
             [embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\nurl = \"{uri}\"\n\n\
             [generation]\nprovider = \"ollama\"\nmodel = \"llama3.2\"\nurl = \"{uri}\"\n",
            uri = server.uri()
        ),
    )
    .unwrap();

    let dir = tmp.path().to_path_buf();
    let (stdout, stderr, ok) = tokio::task::spawn_blocking(move || {
        run(pdfqa(&dir).args([
            "--config",
            "pdfqa.toml",
            "ask",
            "What is the capital of France?",
            "--pdf",
            "facts.pdf",
            "--sources",
        ]))
    })
    .await
    .unwrap();

    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("Paris"), "stdout: {}", stdout);
    assert!(stdout.contains("Sources:"), "stdout: {}", stdout);
    assert!(stdout.contains("facts.pdf (page 1"), "stdout: {}", stdout);
}
