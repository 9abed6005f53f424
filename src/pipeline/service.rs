//! Transform Pipeline
//!
//! Runs one transformation: fetch the recording, compile the effect, invoke
//! the engine (with a single pass-through fallback), and report the result.

use super::artifact::{ArtifactKind, ArtifactStore, RequestId, TransientArtifact};
use super::download::Downloader;
use super::engine::{AudioEngine, EngineInvocation, TargetEncoding};
use crate::effects::{EffectCatalog, FilterChainBuilder};
use crate::error::{DownloadError, EngineError, ErrorKind, VoiceMorphError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// What to do when the engine rejects a filtered run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Retry once with no filter graph, returning the re-encoded original
    #[default]
    PassThrough,
    /// Report the engine failure immediately
    Disabled,
}

/// Pipeline tuning, normally derived from `[engine]` config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub encoding: TargetEncoding,
    pub engine_timeout: Duration,
    pub fallback: FallbackPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            encoding: TargetEncoding::default(),
            engine_timeout: Duration::from_secs(120),
            fallback: FallbackPolicy::PassThrough,
        }
    }
}

/// One transformation request and the two artifacts it owns.
#[derive(Debug)]
pub struct TransformRequest {
    pub id: RequestId,
    /// Effect token as received; resolved by the pipeline
    pub effect: String,
    /// Source reference understood by the pipeline's downloader
    pub source: String,
    pub encoding: TargetEncoding,
    pub input: TransientArtifact,
    pub output: TransientArtifact,
}

impl TransformRequest {
    /// Dispose both artifacts. Consumes the request so it happens once.
    pub async fn dispose(mut self) {
        self.input.dispose().await;
        self.output.dispose().await;
    }
}

/// Terminal result of [`TransformPipeline::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransformResult {
    Success {
        output: PathBuf,
        /// The output is a pass-through re-encode, not the requested effect
        degraded: bool,
    },
    Failure {
        kind: ErrorKind,
        detail: String,
    },
}

pub struct TransformPipeline {
    catalog: &'static EffectCatalog,
    builder: FilterChainBuilder,
    store: Arc<ArtifactStore>,
    downloader: Arc<dyn Downloader>,
    engine: Arc<dyn AudioEngine>,
    settings: PipelineSettings,
}

impl TransformPipeline {
    pub fn new(
        store: Arc<ArtifactStore>,
        downloader: Arc<dyn Downloader>,
        engine: Arc<dyn AudioEngine>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            catalog: EffectCatalog::global(),
            builder: FilterChainBuilder::default(),
            store,
            downloader,
            engine,
            settings,
        }
    }

    pub fn catalog(&self) -> &'static EffectCatalog {
        self.catalog
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Allocate the input and output artifacts for a new request.
    pub fn prepare(&self, effect: &str, source: &str, input_extension: &str) -> TransformRequest {
        let id = self.store.next_request_id();
        let encoding = self.settings.encoding.clone();
        let input = self.store.allocate(ArtifactKind::Input, id, input_extension);
        let output = self
            .store
            .allocate(ArtifactKind::Output, id, encoding.extension());

        TransformRequest {
            id,
            effect: effect.to_string(),
            source: source.to_string(),
            encoding,
            input,
            output,
        }
    }

    /// Run `request` to a terminal result. Never touches artifact disposal;
    /// the caller disposes after delivery.
    pub async fn execute(&self, request: &TransformRequest) -> TransformResult {
        match self.run(request).await {
            Ok(degraded) => {
                tracing::info!(
                    "{}: {} complete{}",
                    request.id,
                    request.effect,
                    if degraded { " (pass-through fallback)" } else { "" }
                );
                TransformResult::Success {
                    output: request.output.path().to_path_buf(),
                    degraded,
                }
            }
            Err(e) => {
                let kind = e.kind();
                tracing::warn!("{}: {} failed [{}]: {}", request.id, request.effect, kind, e);
                TransformResult::Failure {
                    kind,
                    detail: e.to_string(),
                }
            }
        }
    }

    /// Returns whether the fallback produced the output.
    async fn run(&self, request: &TransformRequest) -> Result<bool, VoiceMorphError> {
        let effect = self.catalog.resolve(&request.effect)?;
        let filter = self.builder.build(effect.chain)?;

        let bytes = self.downloader.fetch(&request.source).await?;
        if bytes.is_empty() {
            return Err(DownloadError::Empty.into());
        }
        request
            .input
            .write(&bytes)
            .await
            .map_err(DownloadError::Io)?;

        tracing::debug!(
            "{}: fetched {} bytes, applying {}",
            request.id,
            bytes.len(),
            effect.id
        );

        let invocation = EngineInvocation {
            input: request.input.path().to_path_buf(),
            output: request.output.path().to_path_buf(),
            filter: Some(filter),
            encoding: request.encoding.clone(),
        };

        let primary = match self.invoke(&invocation).await {
            Ok(()) => return Ok(false),
            Err(e) => e,
        };

        match self.settings.fallback {
            FallbackPolicy::Disabled => Err(primary.into()),
            FallbackPolicy::PassThrough => {
                tracing::warn!(
                    "{}: engine failed ({}), retrying as pass-through",
                    request.id,
                    primary
                );
                match self.invoke(&invocation.pass_through()).await {
                    Ok(()) => Ok(true),
                    Err(fallback) => Err(EngineError::FallbackFailed {
                        primary: Box::new(primary),
                        fallback: Box::new(fallback),
                    }
                    .into()),
                }
            }
        }
    }

    async fn invoke(&self, invocation: &EngineInvocation) -> Result<(), EngineError> {
        let limit = self.settings.engine_timeout;
        match tokio::time::timeout(limit, self.engine.run(invocation)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::TimedOut(limit)),
        }
    }
}
