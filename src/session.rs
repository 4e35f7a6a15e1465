//! Sessions: one pipeline and one transcript per conversation.
//!
//! The HTTP server keeps a [`SessionRegistry`]; the chat REPL and the
//! one-shot `ask` command each use a single [`Session`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use pdfqa_core::embedding::Embedder;
use pdfqa_core::generation::Generator;
use pdfqa_core::transcript::{Transcript, Turn};
use pdfqa_core::PipelineError;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::pipeline::{Answer, LoadReport, Pipeline, PipelineSettings, PipelineStatus};

/// Builds pipelines that share provider instances.
#[derive(Clone)]
pub struct PipelineFactory {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    settings: PipelineSettings,
}

impl PipelineFactory {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            generator,
            settings,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            create_embedder(&config.embedding)?,
            create_generator(&config.generation)?,
            PipelineSettings::from_config(config)?,
        ))
    }

    pub fn build(&self) -> Pipeline {
        Pipeline::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.generator),
            self.settings.clone(),
        )
    }
}

pub struct Session {
    pipeline: Pipeline,
    transcript: Mutex<Transcript>,
    staging: Mutex<()>,
}

impl Session {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            transcript: Mutex::new(Transcript::new()),
            staging: Mutex::new(()),
        }
    }

    /// Exclusive access to this session's on-disk upload area. Hold the
    /// guard from clearing the area until the staged files are loaded.
    pub async fn lock_staging(&self) -> MutexGuard<'_, ()> {
        self.staging.lock().await
    }

    pub async fn load(&self, paths: &[PathBuf]) -> Result<LoadReport, PipelineError> {
        self.pipeline.load(paths).await
    }

    /// Ask `query` and record both turns. Never fails: errors become the
    /// assistant's reply.
    pub async fn chat(&self, query: &str) -> String {
        self.chat_with_sources(query).await.text
    }

    pub async fn chat_with_sources(&self, query: &str) -> Answer {
        let answer = self.pipeline.answer(query).await;
        let mut transcript = self.transcript.lock().await;
        transcript.push_user(query);
        transcript.push_assistant(answer.text.clone());
        answer
    }

    pub async fn reset(&self, clear_transcript: bool) {
        self.pipeline.reset().await;
        if clear_transcript {
            self.transcript.lock().await.clear();
        }
    }

    /// Forget the conversation; the loaded documents stay.
    pub async fn clear_transcript(&self) {
        self.transcript.lock().await.clear();
    }

    pub async fn transcript(&self) -> Vec<Turn> {
        self.transcript.lock().await.turns().to_vec()
    }

    pub async fn status(&self) -> PipelineStatus {
        self.pipeline.status().await
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Sessions keyed by id, created on first use.
pub struct SessionRegistry {
    factory: PipelineFactory,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(factory: PipelineFactory) -> Self {
        Self {
            factory,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_create(&self, id: &str) -> Arc<Session> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(id) {
            return Arc::clone(session);
        }
        info!(session = id, "creating session");
        let session = Arc::new(Session::new(self.factory.build()));
        sessions.insert(id.to_string(), Arc::clone(&session));
        session
    }

    /// Drop the session from the registry. In-flight requests holding the
    /// session finish against it; later requests start a fresh one.
    pub async fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.lock().await.remove(id);
        if removed.is_some() {
            info!(session = id, "removed session");
        }
        removed
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
