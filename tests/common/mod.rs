//! Shared fixtures for integration tests: PDF builders and fake providers.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pdfqa::pipeline::{Pipeline, PipelineSettings};
use pdfqa_core::chunk::ChunkParams;
use pdfqa_core::embedding::Embedder;
use pdfqa_core::generation::{GenerationParams, Generator};
use pdfqa_core::prompt::Prompt;
use pdfqa_core::PipelineError;

/// Build a PDF with one page per entry; each page shows its text on one line.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_with_pages(pages)).unwrap();
    path
}

pub const FRANCE: &str = "The capital of France is Paris.";
pub const BANANAS: &str = "Bananas contain potassium.";
pub const EVEREST: &str = "Mount Everest stands in Nepal.";

const DIMS: usize = 256;

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn bucket(token: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in token.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % DIMS as u64) as usize
}

/// Bag-of-words embedder: texts sharing words get similar vectors.
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-bow"
    }
    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::embedding("quota exceeded"));
        }
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIMS];
                for token in tokens(text) {
                    v[bucket(&token)] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Answers with the first (highest-ranked) context block.
#[derive(Default)]
pub struct ExtractiveGenerator {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub last_prompt: Mutex<Option<Prompt>>,
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn model_name(&self) -> &str {
        "extractive"
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _params: &GenerationParams,
    ) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::generation("model overloaded"));
        }
        let context = prompt.system.split("Context:\n").nth(1).unwrap_or("");
        let first = context
            .split("\n\n")
            .map(str::trim)
            .find(|block| !block.is_empty())
            .unwrap_or("I don't know.");
        Ok(first.to_string())
    }
}

/// Settings where every short page becomes exactly one chunk.
pub fn page_sized_settings() -> PipelineSettings {
    PipelineSettings {
        chunk: ChunkParams::new(40, 0).unwrap(),
        ..PipelineSettings::default()
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub embedder: Arc<HashEmbedder>,
    pub generator: Arc<ExtractiveGenerator>,
}

pub fn harness(settings: PipelineSettings) -> Harness {
    let embedder = Arc::new(HashEmbedder::default());
    let generator = Arc::new(ExtractiveGenerator::default());
    let pipeline = Pipeline::new(embedder.clone(), generator.clone(), settings);
    Harness {
        pipeline,
        embedder,
        generator,
    }
}
