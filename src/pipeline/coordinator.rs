//! Request Coordinator
//!
//! Acknowledges one effect selection exactly once, turns it into one pipeline
//! run, delivers the result (or a notice) to the originating conversation, and
//! disposes the artifacts.

use super::service::{TransformPipeline, TransformResult};
use crate::effects::{EffectCatalog, EffectDefinition};
use crate::error::{DeliveryError, ErrorKind, VoiceMorphError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// A previously sent recording the selection refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRef {
    /// Source reference handed to the downloader (a Telegram file id, a URL, a path)
    pub source: String,
    /// Extension hint for the input artifact
    pub extension: String,
    pub duration_secs: Option<u32>,
}

/// A user's effect choice, as received from the chat platform.
#[derive(Debug, Clone)]
pub struct SelectionEvent {
    pub conversation_id: i64,
    /// Message carrying the effect menu
    pub menu_message_id: Option<i32>,
    /// Message to reply to when delivering (usually the recording itself)
    pub reply_to: Option<i32>,
    pub recording: Option<RecordingRef>,
    /// Raw effect token; validated against the catalog
    pub effect_token: String,
    /// Platform handle used to dismiss the "processing" indicator
    pub callback_id: String,
}

/// Outbound side of the chat platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Send a finished audio artifact.
    async fn deliver(
        &self,
        conversation_id: i64,
        artifact: &Path,
        caption: &str,
        reply_to: Option<i32>,
    ) -> Result<(), DeliveryError>;

    /// Send a plain text notice.
    async fn notify(
        &self,
        conversation_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), DeliveryError>;

    /// Dismiss the selection's pending indicator.
    async fn acknowledge(&self, event: &SelectionEvent) -> Result<(), DeliveryError>;
}

/// How a selection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered { degraded: bool },
    /// Precondition failure; nothing was allocated
    Rejected(ErrorKind),
    /// The pipeline or the delivery failed and the user was notified
    Failed(ErrorKind),
}

impl Outcome {
    fn from_failure(kind: ErrorKind) -> Self {
        if kind.is_precondition() {
            Self::Rejected(kind)
        } else {
            Self::Failed(kind)
        }
    }
}

pub struct RequestCoordinator {
    pipeline: Arc<TransformPipeline>,
    delivery: Arc<dyn Delivery>,
}

impl RequestCoordinator {
    pub fn new(pipeline: Arc<TransformPipeline>, delivery: Arc<dyn Delivery>) -> Self {
        Self { pipeline, delivery }
    }

    pub fn catalog(&self) -> &'static EffectCatalog {
        self.pipeline.catalog()
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Handle one selection end to end.
    pub async fn handle(&self, event: SelectionEvent) -> Outcome {
        // Dismiss the pending indicator up front; the run can outlast the query
        if let Err(e) = self.delivery.acknowledge(&event).await {
            tracing::warn!(
                "Failed to acknowledge selection in chat {}: {}",
                event.conversation_id,
                e
            );
        }

        let outcome = self.process(&event).await;
        tracing::info!(
            "Selection {} in chat {}: {:?}",
            event.effect_token,
            event.conversation_id,
            outcome
        );
        outcome
    }

    async fn process(&self, event: &SelectionEvent) -> Outcome {
        let Some(recording) = event.recording.as_ref() else {
            return self.fail(event, VoiceMorphError::NoRecording).await;
        };

        let effect = match self.catalog().resolve(&event.effect_token) {
            Ok(effect) => effect,
            Err(e) => return self.fail(event, e.into()).await,
        };

        let request = self.pipeline.prepare(
            effect.id.as_str(),
            &recording.source,
            &recording.extension,
        );
        tracing::debug!(
            "{}: {} for chat {} (menu {:?}, {}s recording)",
            request.id,
            effect.id,
            event.conversation_id,
            event.menu_message_id,
            recording.duration_secs.unwrap_or_default()
        );

        let outcome = match self.pipeline.execute(&request).await {
            TransformResult::Success { output, degraded } => {
                let caption = caption(effect, degraded);
                match self
                    .delivery
                    .deliver(event.conversation_id, &output, &caption, event.reply_to)
                    .await
                {
                    Ok(()) => Outcome::Delivered { degraded },
                    Err(e) => self.fail(event, e.into()).await,
                }
            }
            TransformResult::Failure { kind, .. } => {
                self.notify_error(event, kind).await;
                Outcome::from_failure(kind)
            }
        };

        request.dispose().await;
        outcome
    }

    async fn fail(&self, event: &SelectionEvent, error: VoiceMorphError) -> Outcome {
        let kind = error.kind();
        if kind.is_precondition() {
            tracing::debug!("Rejecting selection in chat {}: {}", event.conversation_id, error);
        } else {
            tracing::error!("Selection in chat {} failed: {}", event.conversation_id, error);
        }
        self.notify_error(event, kind).await;
        Outcome::from_failure(kind)
    }

    async fn notify_error(&self, event: &SelectionEvent, kind: ErrorKind) {
        if let Err(e) = self
            .delivery
            .notify(event.conversation_id, kind.user_message(), event.reply_to)
            .await
        {
            tracing::error!(
                "Failed to send {} notice to chat {}: {}",
                kind,
                event.conversation_id,
                e
            );
        }
    }
}

fn caption(effect: &EffectDefinition, degraded: bool) -> String {
    if degraded {
        format!(
            "⚠️ {} could not be applied, here is your original recording re-encoded.",
            effect.label
        )
    } else {
        format!("🎧 {}", effect.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DownloadError, EngineError};
    use crate::pipeline::artifact::ArtifactStore;
    use crate::pipeline::download::MockDownloader;
    use crate::pipeline::engine::{EngineInvocation, MockAudioEngine};
    use crate::pipeline::service::{FallbackPolicy, PipelineSettings};
    use mockall::Sequence;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingDelivery {
        delivered: Mutex<Vec<(i64, PathBuf, String, bool)>>,
        notices: Mutex<Vec<String>>,
        acks: Mutex<usize>,
        fail_delivery: bool,
    }

    #[async_trait]
    impl Delivery for RecordingDelivery {
        async fn deliver(
            &self,
            conversation_id: i64,
            artifact: &Path,
            caption: &str,
            _reply_to: Option<i32>,
        ) -> Result<(), DeliveryError> {
            self.delivered.lock().unwrap().push((
                conversation_id,
                artifact.to_path_buf(),
                caption.to_string(),
                artifact.exists(),
            ));
            if self.fail_delivery {
                Err(DeliveryError::Transport("chat unreachable".to_string()))
            } else {
                Ok(())
            }
        }

        async fn notify(
            &self,
            _conversation_id: i64,
            text: &str,
            _reply_to: Option<i32>,
        ) -> Result<(), DeliveryError> {
            self.notices.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn acknowledge(&self, _event: &SelectionEvent) -> Result<(), DeliveryError> {
            *self.acks.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn event(effect: &str, recording: bool) -> SelectionEvent {
        SelectionEvent {
            conversation_id: 42,
            menu_message_id: Some(8),
            reply_to: Some(7),
            recording: recording.then(|| RecordingRef {
                source: "voice-file-id".to_string(),
                extension: "ogg".to_string(),
                duration_secs: Some(4),
            }),
            effect_token: effect.to_string(),
            callback_id: "cb-1".to_string(),
        }
    }

    fn write_output(inv: &EngineInvocation) -> Result<(), EngineError> {
        std::fs::write(&inv.output, b"ID3encoded").map_err(EngineError::Spawn)
    }

    fn coordinator(
        dir: &TempDir,
        downloader: MockDownloader,
        engine: MockAudioEngine,
        delivery: Arc<RecordingDelivery>,
    ) -> RequestCoordinator {
        let store = Arc::new(ArtifactStore::new(dir.path()).unwrap());
        let pipeline = TransformPipeline::new(
            store,
            Arc::new(downloader),
            Arc::new(engine),
            PipelineSettings {
                fallback: FallbackPolicy::PassThrough,
                ..PipelineSettings::default()
            },
        );
        RequestCoordinator::new(Arc::new(pipeline), delivery)
    }

    fn downloader_ok() -> MockDownloader {
        let mut d = MockDownloader::new();
        d.expect_fetch()
            .withf(|source| source.contains("voice-file-id"))
            .returning(|_| Ok(b"OggS fake voice".to_vec()));
        d
    }

    fn artifacts_left(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_male_to_female_delivers_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockAudioEngine::new();
        engine
            .expect_run()
            .withf(|inv| {
                inv.encoding.codec == "libmp3lame"
                    && inv.encoding.bitrate == "128k"
                    && !inv.is_pass_through()
            })
            .times(1)
            .returning(write_output);
        let delivery = Arc::new(RecordingDelivery::default());
        let c = coordinator(&dir, downloader_ok(), engine, delivery.clone());

        let outcome = c.handle(event("male_to_female", true)).await;

        assert_eq!(outcome, Outcome::Delivered { degraded: false });
        let delivered = delivery.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        let (chat, path, caption, existed) = &delivered[0];
        assert_eq!(*chat, 42);
        assert_eq!(path.extension().unwrap(), "mp3");
        assert!(caption.contains("Male → Female"));
        assert!(*existed, "artifact must exist while delivering");
        assert!(!path.exists());

        assert_eq!(c.pipeline().store().allocated(), 2);
        assert_eq!(c.pipeline().store().live(), 0);
        assert_eq!(artifacts_left(&dir), 0);
        assert_eq!(*delivery.acks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_effect_rejected_without_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut downloader = MockDownloader::new();
        downloader.expect_fetch().never();
        let mut engine = MockAudioEngine::new();
        engine.expect_run().never();
        let delivery = Arc::new(RecordingDelivery::default());
        let c = coordinator(&dir, downloader, engine, delivery.clone());

        let outcome = c.handle(event("nonexistent_effect", true)).await;

        assert_eq!(outcome, Outcome::Rejected(ErrorKind::UnknownEffect));
        assert_eq!(c.pipeline().store().allocated(), 0);
        assert_eq!(
            delivery.notices.lock().unwrap().as_slice(),
            [ErrorKind::UnknownEffect.user_message().to_string()]
        );
        assert_eq!(*delivery.acks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_recording_is_precondition_error() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockAudioEngine::new();
        engine.expect_run().never();
        let delivery = Arc::new(RecordingDelivery::default());
        let c = coordinator(&dir, MockDownloader::new(), engine, delivery.clone());

        let outcome = c.handle(event("female_soft", false)).await;

        assert_eq!(outcome, Outcome::Rejected(ErrorKind::NoRecording));
        assert_eq!(c.pipeline().store().allocated(), 0);
        assert_eq!(delivery.notices.lock().unwrap().len(), 1);
        assert_eq!(*delivery.acks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_download_404_notifies_and_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let mut downloader = MockDownloader::new();
        downloader
            .expect_fetch()
            .returning(|_| Err(DownloadError::Status(404)));
        let mut engine = MockAudioEngine::new();
        engine.expect_run().never();
        let delivery = Arc::new(RecordingDelivery::default());
        let c = coordinator(&dir, downloader, engine, delivery.clone());

        let outcome = c.handle(event("female_confident", true)).await;

        assert_eq!(outcome, Outcome::Failed(ErrorKind::Download));
        assert!(delivery.delivered.lock().unwrap().is_empty());
        assert_eq!(
            delivery.notices.lock().unwrap().as_slice(),
            [ErrorKind::Download.user_message().to_string()]
        );
        assert_eq!(c.pipeline().store().live(), 0);
        assert_eq!(artifacts_left(&dir), 0);
    }

    #[tokio::test]
    async fn test_fallback_success_delivers_degraded() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockAudioEngine::new();
        engine
            .expect_run()
            .withf(|inv| !inv.is_pass_through())
            .times(1)
            .returning(|_| Err(EngineError::EmptyOutput));
        engine
            .expect_run()
            .withf(|inv| inv.is_pass_through())
            .times(1)
            .returning(write_output);
        let delivery = Arc::new(RecordingDelivery::default());
        let c = coordinator(&dir, downloader_ok(), engine, delivery.clone());

        let outcome = c.handle(event("female_young", true)).await;

        assert_eq!(outcome, Outcome::Delivered { degraded: true });
        let delivered = delivery.delivered.lock().unwrap();
        assert!(delivered[0].2.contains("could not be applied"));
        assert_eq!(artifacts_left(&dir), 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_still_cleans_up() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockAudioEngine::new();
        engine.expect_run().times(1).returning(write_output);
        let delivery = Arc::new(RecordingDelivery {
            fail_delivery: true,
            ..RecordingDelivery::default()
        });
        let c = coordinator(&dir, downloader_ok(), engine, delivery.clone());

        let outcome = c.handle(event("female_warm", true)).await;

        assert_eq!(outcome, Outcome::Failed(ErrorKind::Delivery));
        assert_eq!(
            delivery.notices.lock().unwrap().as_slice(),
            [ErrorKind::Delivery.user_message().to_string()]
        );
        assert_eq!(c.pipeline().store().allocated(), 2);
        assert_eq!(c.pipeline().store().live(), 0);
        assert_eq!(artifacts_left(&dir), 0);
        assert_eq!(*delivery.acks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_engine_failure_notice_hides_stderr() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockAudioEngine::new();
        engine.expect_run().times(2).returning(|_| {
            Err(EngineError::Failed {
                status: Some(1),
                stderr: "moov atom not found".to_string(),
            })
        });
        let delivery = Arc::new(RecordingDelivery::default());
        let c = coordinator(&dir, downloader_ok(), engine, delivery.clone());

        let outcome = c.handle(event("female_mature", true)).await;

        assert_eq!(outcome, Outcome::Failed(ErrorKind::Engine));
        let notices = delivery.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].contains("moov"));
        assert_eq!(artifacts_left(&dir), 0);
    }

    #[tokio::test]
    async fn test_acknowledge_failure_does_not_change_outcome() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockAudioEngine::new();
        engine.expect_run().times(1).returning(write_output);

        let mut delivery = MockDelivery::new();
        delivery.expect_deliver().times(1).returning(|_, _, _, _| Ok(()));
        delivery.expect_notify().never();
        delivery
            .expect_acknowledge()
            .times(1)
            .returning(|_| Err(DeliveryError::Transport("query expired".to_string())));

        let store = Arc::new(ArtifactStore::new(dir.path()).unwrap());
        let pipeline = TransformPipeline::new(
            store,
            Arc::new(downloader_ok()),
            Arc::new(engine),
            PipelineSettings::default(),
        );
        let c = RequestCoordinator::new(Arc::new(pipeline), Arc::new(delivery));

        let outcome = c.handle(event("male_to_female", true)).await;
        assert_eq!(outcome, Outcome::Delivered { degraded: false });
    }

    #[tokio::test]
    async fn test_acknowledged_before_pipeline_runs() {
        let dir = TempDir::new().unwrap();
        let mut seq = Sequence::new();

        let mut delivery = MockDelivery::new();
        delivery
            .expect_acknowledge()
            .withf(|event| event.callback_id == "cb-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut downloader = MockDownloader::new();
        downloader
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(b"OggS fake voice".to_vec()));
        let mut engine = MockAudioEngine::new();
        engine
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(write_output);
        delivery
            .expect_deliver()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(()));
        delivery.expect_notify().never();

        let store = Arc::new(ArtifactStore::new(dir.path()).unwrap());
        let pipeline = TransformPipeline::new(
            store,
            Arc::new(downloader),
            Arc::new(engine),
            PipelineSettings::default(),
        );
        let c = RequestCoordinator::new(Arc::new(pipeline), Arc::new(delivery));

        let outcome = c.handle(event("female_soft", true)).await;
        assert_eq!(outcome, Outcome::Delivered { degraded: false });
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(
            Outcome::from_failure(ErrorKind::NoRecording),
            Outcome::Rejected(ErrorKind::NoRecording)
        );
        assert_eq!(
            Outcome::from_failure(ErrorKind::Download),
            Outcome::Failed(ErrorKind::Download)
        );
        assert_eq!(
            Outcome::from_failure(ErrorKind::Delivery),
            Outcome::Failed(ErrorKind::Delivery)
        );
    }

    #[tokio::test]
    async fn test_concurrent_selections_use_distinct_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut engine = MockAudioEngine::new();
        engine.expect_run().times(8).returning(write_output);
        let delivery = Arc::new(RecordingDelivery::default());
        let c = Arc::new(coordinator(&dir, downloader_ok(), engine, delivery.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let c = c.clone();
            tasks.spawn(async move { c.handle(event("female_soft", true)).await });
        }
        while let Some(outcome) = tasks.join_next().await {
            assert_eq!(outcome.unwrap(), Outcome::Delivered { degraded: false });
        }

        let delivered = delivery.delivered.lock().unwrap();
        let mut paths: Vec<_> = delivered.iter().map(|d| d.1.clone()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 8);
        assert_eq!(c.pipeline().store().live(), 0);
    }

    #[test]
    fn test_caption_variants() {
        let def = EffectCatalog::global().resolve("female_warm").unwrap();
        assert_eq!(caption(def, false), format!("🎧 {}", def.label));
        assert!(caption(def, true).starts_with("⚠️"));
    }
}
