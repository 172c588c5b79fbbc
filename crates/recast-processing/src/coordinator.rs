//! Conversion coordinator: routes each request to its family's transcoder.
//!
//! Requests run one at a time. The queue lock is held by the task doing the work, so a
//! caller that stops waiting on a request does not let the next one start early.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use recast_core::{
    Artifact, ConversionError, ConversionRequest, ConversionResult, EngineConfig, ErrorMetadata,
    LogLevel, MediaFamily,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::classifier::{classify, extension_of};
use crate::progress::ProgressSink;
use crate::traits::Transcoder;

const ACCEPTED: u8 = 0;
const ROUTED: u8 = 10;

pub struct ConversionCoordinator {
    transcoders: HashMap<MediaFamily, Arc<dyn Transcoder>>,
    queue: Arc<Mutex<()>>,
}

impl Default for ConversionCoordinator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ConversionCoordinator {
    /// Coordinator with a transcoder for every enabled media family. Video and audio share
    /// one lazily loaded codec engine.
    #[allow(unused_mut, unused_variables)]
    pub fn new(config: &EngineConfig) -> Self {
        let mut coordinator = Self::empty();

        #[cfg(feature = "image")]
        {
            coordinator = coordinator
                .with_transcoder(Arc::new(crate::image::ImageTranscoder::new(config)));
        }

        #[cfg(feature = "codec")]
        {
            let engine = Arc::new(crate::codec::SharedCodecEngine::new(config.clone()));

            #[cfg(feature = "video")]
            {
                coordinator = coordinator.with_transcoder(Arc::new(
                    crate::video::VideoTranscoder::new(engine.clone(), config.video_preset.clone()),
                ));
            }

            #[cfg(feature = "audio")]
            {
                coordinator = coordinator
                    .with_transcoder(Arc::new(crate::audio::AudioTranscoder::new(engine.clone())));
            }
        }

        #[cfg(feature = "document")]
        {
            coordinator =
                coordinator.with_transcoder(Arc::new(crate::document::DocumentTranscoder::new()));
        }

        tracing::debug!(families = ?coordinator.families(), "Conversion coordinator ready");
        coordinator
    }

    /// Coordinator configured from the environment (see `EngineConfig::from_env`).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = EngineConfig::from_env()?;
        Ok(Self::new(&config))
    }

    /// Coordinator with no transcoders registered.
    pub fn empty() -> Self {
        Self {
            transcoders: HashMap::new(),
            queue: Arc::new(Mutex::new(())),
        }
    }

    /// Register `transcoder` for its family, replacing any previous one.
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoders.insert(transcoder.family(), transcoder);
        self
    }

    /// Whether a transcoder is registered for `family`. Requests for other families fail
    /// with `UnsupportedConversion`.
    pub fn supports(&self, family: MediaFamily) -> bool {
        self.transcoders.contains_key(&family)
    }

    fn families(&self) -> Vec<MediaFamily> {
        let mut families: Vec<_> = self.transcoders.keys().copied().collect();
        families.sort_by_key(|f| f.as_str());
        families
    }

    /// Convert one file, calling `on_progress` with non-decreasing percentages. 100 is
    /// reported only for a successful result.
    pub async fn convert<F>(&self, request: ConversionRequest, on_progress: F) -> ConversionResult
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.convert_with_sink(request, ProgressSink::new(on_progress))
            .await
    }

    /// Convert one file, reporting progress into `progress`.
    ///
    /// Never fails as a whole: every error, including a panic inside a transcoder, becomes
    /// a `ConversionResult::Failure`.
    #[tracing::instrument(skip_all, fields(
        file = %request.file.name,
        target = %request.target_format,
        family = tracing::field::Empty,
    ))]
    pub async fn convert_with_sink(
        &self,
        request: ConversionRequest,
        progress: ProgressSink,
    ) -> ConversionResult {
        let guard = self.queue.clone().lock_owned().await;
        let start = Instant::now();
        progress.report(ACCEPTED);

        let file_name = request.file.name.clone();
        let target = request.normalized_target();
        let input_size = request.file.len();

        let result = self.dispatch(request, &target, &progress, guard).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(artifact) => {
                progress.complete();
                tracing::info!(
                    file = %file_name,
                    target = %target,
                    input_size = input_size,
                    output_size = artifact.len(),
                    duration_ms = duration_ms,
                    "Conversion succeeded"
                );
            }
            Err(error) => log_failure(&file_name, &target, duration_ms, error),
        }

        result.into()
    }

    /// Convert `requests` one after another. `on_progress` receives the request's index
    /// with each percentage. Results are returned in request order.
    pub async fn convert_batch<F>(
        &self,
        requests: Vec<ConversionRequest>,
        on_progress: F,
    ) -> Vec<ConversionResult>
    where
        F: Fn(usize, u8) + Send + Sync + 'static,
    {
        let on_progress = Arc::new(on_progress);
        let total = requests.len();
        let mut results = Vec::with_capacity(total);

        for (index, request) in requests.into_iter().enumerate() {
            let callback = on_progress.clone();
            let sink = ProgressSink::new(move |percent| callback(index, percent));
            results.push(self.convert_with_sink(request, sink).await);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        tracing::info!(
            total = total,
            succeeded = succeeded,
            failed = total - succeeded,
            "Batch finished"
        );

        results
    }

    async fn dispatch(
        &self,
        request: ConversionRequest,
        target: &str,
        progress: &ProgressSink,
        guard: OwnedMutexGuard<()>,
    ) -> Result<Artifact, ConversionError> {
        let family = classify(&request.file.name);
        let extension = extension_of(&request.file.name);
        tracing::Span::current().record("family", family.as_str());

        if family == MediaFamily::Unknown {
            return Err(ConversionError::UnsupportedFileType { extension });
        }

        let transcoder = self.transcoders.get(&family).cloned().ok_or_else(|| {
            ConversionError::unsupported_conversion_with(
                &extension,
                target,
                format!("{} conversion is not available in this build", family),
            )
        })?;
        progress.report(ROUTED);

        if !family.accepts_output(target) {
            return Err(ConversionError::unsupported_conversion(&extension, target));
        }

        let file = request.file;
        let settings = request.settings.normalized();
        let target_owned = target.to_string();
        let sink = progress.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            transcoder.convert(&file, &target_owned, &settings, &sink).await
        });

        let artifact = match handle.await {
            Ok(result) => result?,
            Err(e) if e.is_panic() => {
                return Err(ConversionError::Internal(format!(
                    "Transcoder panicked: {}",
                    panic_message(e.into_panic())
                )))
            }
            Err(e) => {
                return Err(ConversionError::Internal(format!(
                    "Conversion task did not complete: {}",
                    e
                )))
            }
        };

        if artifact.is_empty() {
            return Err(ConversionError::Encode(
                "Transcoder produced an empty file".to_string(),
            ));
        }

        Ok(artifact)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn log_failure(file: &str, target: &str, duration_ms: u64, error: &ConversionError) {
    let error_code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(
                file = %file,
                target = %target,
                error = %error,
                error_code = error_code,
                duration_ms = duration_ms,
                "Conversion failed"
            );
        }
        LogLevel::Warn => {
            tracing::warn!(
                file = %file,
                target = %target,
                error = %error,
                error_code = error_code,
                duration_ms = duration_ms,
                "Conversion failed"
            );
        }
        LogLevel::Error => {
            tracing::error!(
                file = %file,
                target = %target,
                error = %error,
                error_code = error_code,
                duration_ms = duration_ms,
                "Conversion failed"
            );
        }
    }
}
