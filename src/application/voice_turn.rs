//! Voice turn use case
//!
//! Records one utterance, enforces the recording cap, and uploads the
//! result to the chat service with a bounded wait.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::ports::{
    ChatError, ChatService, MediaBackend, ObserverId, ProgressCallback, RecorderError,
    RecorderEvent,
};
use super::recorder::Recorder;
use crate::domain::chat::{ChatId, TranscribeReply};
use crate::domain::recording::{AudioBlob, Duration, MIN_UPLOAD_BYTES};

/// Errors from the voice turn use case
#[derive(Debug, Error)]
pub enum VoiceTurnError {
    #[error("Recording could not be started")]
    StartRejected,

    #[error("Recording failed: {0}")]
    Recording(#[from] RecorderError),

    #[error("Recording too short or empty ({size} bytes). Please try again.")]
    EmptyRecording { size: usize },

    #[error("Transcription failed: {0}")]
    Chat(#[from] ChatError),

    #[error("Recorder event stream closed unexpectedly")]
    EventsClosed,

    #[error("Upload cancelled")]
    Cancelled,
}

impl VoiceTurnError {
    /// Whether the upload was abandoned because the server was too slow
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Chat(ChatError::Timeout))
    }
}

/// Limits applied around the recorder and the upload
#[derive(Debug, Clone)]
pub struct VoiceTurnConfig {
    /// Recording is stopped automatically after this long
    pub max_duration: Duration,
    /// Upload is abandoned after this long
    pub upload_timeout: Duration,
    /// Recordings below this size are not uploaded
    pub min_audio_bytes: usize,
}

impl Default for VoiceTurnConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::default_max_duration(),
            upload_timeout: Duration::default_upload_timeout(),
            min_audio_bytes: MIN_UPLOAD_BYTES,
        }
    }
}

/// Output of a completed voice turn
#[derive(Debug, Clone)]
pub struct VoiceTurnOutput {
    /// Server reply (transcription, assistant response, chat id)
    pub reply: TranscribeReply,
    /// Uploaded audio size in human-readable format
    pub audio_size: String,
}

/// Callbacks for progress and status updates
#[derive(Default)]
#[allow(clippy::type_complexity)]
pub struct VoiceTurnCallbacks {
    /// Called every second while recording with (elapsed_ms, max_ms)
    pub on_progress: Option<ProgressCallback>,
    /// Called when capture has actually started
    pub on_recording_start: Option<Box<dyn Fn() + Send + Sync>>,
    /// Called with the human-readable blob size once recording ends
    pub on_recording_end: Option<Box<dyn Fn(&str) + Send + Sync>>,
    /// Called before the upload begins
    pub on_upload_start: Option<Box<dyn Fn() + Send + Sync>>,
}

/// Unsubscribes the use case's channel observer when dropped
struct Subscription<'a, B: MediaBackend> {
    recorder: &'a Recorder<B>,
    id: ObserverId,
}

impl<B: MediaBackend> Drop for Subscription<'_, B> {
    fn drop(&mut self) {
        self.recorder.unsubscribe(self.id);
    }
}

/// Voice turn use case
pub struct VoiceTurnUseCase<B, C>
where
    B: MediaBackend,
    C: ChatService,
{
    recorder: Arc<Recorder<B>>,
    chat: C,
    config: VoiceTurnConfig,
}

impl<B, C> VoiceTurnUseCase<B, C>
where
    B: MediaBackend,
    C: ChatService,
{
    /// Create a new use case over an initialized recorder
    pub fn new(recorder: Arc<Recorder<B>>, chat: C, config: VoiceTurnConfig) -> Self {
        Self {
            recorder,
            chat,
            config,
        }
    }

    /// Get the recorder
    pub fn recorder(&self) -> &Recorder<B> {
        &self.recorder
    }

    /// Get the limits in use
    pub fn config(&self) -> &VoiceTurnConfig {
        &self.config
    }

    /// Record until `stop_trigger` resolves or the cap is reached.
    ///
    /// Both paths go through `Recorder::stop`, so audio captured so far is
    /// always delivered. A trigger that fires before capture has actually
    /// started stops the recording as soon as it does.
    pub async fn record<S>(
        &self,
        stop_trigger: S,
        callbacks: &VoiceTurnCallbacks,
    ) -> Result<AudioBlob, VoiceTurnError>
    where
        S: Future<Output = ()>,
    {
        let (id, mut events) = self.recorder.subscribe_channel();
        let _subscription = Subscription {
            recorder: &self.recorder,
            id,
        };

        if !self.recorder.start() {
            return Err(match events.try_recv() {
                Ok(RecorderEvent::Error(e)) => e.into(),
                _ => VoiceTurnError::StartRejected,
            });
        }

        let max = self.config.max_duration;
        let max_ms = max.as_millis();
        let deadline = sleep(max.as_std());
        tokio::pin!(deadline);
        tokio::pin!(stop_trigger);

        let mut started = false;
        let mut stop_wanted = false;
        let mut trigger_fired = false;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(RecorderEvent::Started) => {
                        started = true;
                        deadline.as_mut().reset(Instant::now() + max.as_std());
                        if let Some(cb) = &callbacks.on_recording_start {
                            cb();
                        }
                        if stop_wanted {
                            debug!("Stop was requested before capture started");
                            self.recorder.stop();
                        }
                    }
                    Some(RecorderEvent::Tick(elapsed)) => {
                        if let Some(cb) = &callbacks.on_progress {
                            cb(elapsed.as_millis().min(max_ms), max_ms);
                        }
                    }
                    Some(RecorderEvent::Data(_)) => {}
                    Some(RecorderEvent::Stopped(blob)) => {
                        if let Some(cb) = &callbacks.on_recording_end {
                            cb(&blob.human_readable_size());
                        }
                        return Ok(blob);
                    }
                    Some(RecorderEvent::Error(e)) => return Err(e.into()),
                    None => return Err(VoiceTurnError::EventsClosed),
                },
                _ = &mut deadline, if started && !stop_wanted => {
                    info!(max = %max, "Maximum recording time reached, stopping");
                    stop_wanted = true;
                    self.recorder.stop();
                }
                _ = &mut stop_trigger, if !trigger_fired => {
                    trigger_fired = true;
                    if !stop_wanted {
                        stop_wanted = true;
                        if started {
                            self.recorder.stop();
                        }
                    }
                }
            }
        }
    }

    /// Upload a recording, short-circuiting empty ones.
    pub async fn submit(
        &self,
        audio: &AudioBlob,
        chat_id: Option<ChatId>,
    ) -> Result<TranscribeReply, VoiceTurnError> {
        if audio.is_effectively_empty(self.config.min_audio_bytes) {
            warn!(size = audio.size_bytes(), "Recording too short or empty");
            return Err(VoiceTurnError::EmptyRecording {
                size: audio.size_bytes(),
            });
        }

        info!(
            size = %audio.human_readable_size(),
            format = %audio.format(),
            "Sending audio for transcription"
        );
        let wait = self.config.upload_timeout;
        match timeout(wait.as_std(), self.chat.transcribe(audio, chat_id)).await {
            Ok(reply) => Ok(reply?),
            Err(_) => {
                warn!(timeout = %wait, "Transcription request timed out");
                Err(ChatError::Timeout.into())
            }
        }
    }

    /// Upload like `submit`, abandoning the request once `cancel` resolves.
    pub async fn submit_until<X>(
        &self,
        audio: &AudioBlob,
        chat_id: Option<ChatId>,
        cancel: X,
    ) -> Result<TranscribeReply, VoiceTurnError>
    where
        X: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                warn!("Upload cancelled");
                Err(VoiceTurnError::Cancelled)
            }
            reply = self.submit(audio, chat_id) => reply,
        }
    }

    /// Record one utterance and send it.
    ///
    /// `stop_trigger` ends the recording; `cancel` is only polled during the
    /// upload, so the same signal can serve both phases.
    pub async fn execute<S, X>(
        &self,
        chat_id: Option<ChatId>,
        stop_trigger: S,
        cancel: X,
        callbacks: VoiceTurnCallbacks,
    ) -> Result<VoiceTurnOutput, VoiceTurnError>
    where
        S: Future<Output = ()>,
        X: Future<Output = ()>,
    {
        let audio = self.record(stop_trigger, &callbacks).await?;
        let audio_size = audio.human_readable_size();

        if let Some(cb) = &callbacks.on_upload_start {
            cb();
        }
        let reply = self.submit_until(&audio, chat_id, cancel).await?;

        Ok(VoiceTurnOutput { reply, audio_size })
    }
}
