//! Transformation Pipeline
//!
//! Download, filter, encode and deliver one recording per selection, with
//! every scratch file owned by the request that created it.

pub mod artifact;
pub mod coordinator;
pub mod download;
pub mod engine;
pub mod service;

pub use artifact::{ArtifactKind, ArtifactStore, RequestId, TransientArtifact};
pub use coordinator::{Delivery, Outcome, RecordingRef, RequestCoordinator, SelectionEvent};
pub use download::{Downloader, FileSource, HttpDownloader};
pub use engine::{AudioEngine, EngineInvocation, FfmpegEngine, TargetEncoding};
pub use service::{
    FallbackPolicy, PipelineSettings, TransformPipeline, TransformRequest, TransformResult,
};
