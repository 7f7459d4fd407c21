//! Voice replies: an utterance goes to an OpenAI-compatible chat endpoint,
//! the reply text is optionally synthesized to speech, and the result comes
//! back to the controller as an `ExternalEvent` tagged with its session.
//!
//! Only one request is in flight at a time. Submitting a new utterance
//! aborts the previous one; anything that still slips through is dropped by
//! the controller's session check.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events::{ExternalEvent, SessionId};
use crate::prompts::voice_system_prompt;
use crate::types::{AudioHandle, MoodState, Personality};

/// Upper bound on one full round (chat + speech).
pub const VOICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply text longer than this is cut at a char boundary.
const MAX_REPLY_CHARS: usize = 400;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API call failed: HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyReply,
    #[error("could not save speech: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpokenReply {
    pub text: String,
    pub audio: Option<AudioHandle>,
}

/// Produces the pet's answer to one utterance.
pub trait ReplyGenerator: Send + Sync + 'static {
    fn reply(
        &self,
        session_id: SessionId,
        utterance: String,
        mood: MoodState,
    ) -> impl Future<Output = Result<SpokenReply, VoiceError>> + Send;
}

// ── OpenAI-compatible client ──

pub struct OpenAiVoice {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    pet_name: String,
    personality: Personality,
    tts_model: Option<String>,
    tts_voice: String,
    voice_dir: PathBuf,
}

impl OpenAiVoice {
    pub fn from_config(config: &Config) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            // Local servers (ollama) take any key
            api_key: config.api_key.clone().unwrap_or_else(|| "ollama".to_string()),
            model: config.model.clone(),
            max_tokens: config.max_output_tokens,
            pet_name: config.pet_name.clone(),
            personality: config.personality,
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            voice_dir: config.data_path().join("voice"),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<reqwest::Response, VoiceError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    async fn complete(&self, system: &str, utterance: &str) -> Result<String, VoiceError> {
        let url = self.endpoint("chat/completions");
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": utterance},
            ],
            "max_tokens": self.max_tokens,
        });

        info!("chat_completions request: model={}", self.model);
        let mut response = self.post(&url, &body).await?;

        // Retry once on 500 errors
        if response.status().as_u16() == 500 {
            warn!("API HTTP 500, retrying once | url={}", url);
            tokio::time::sleep(Duration::from_secs(2)).await;
            response = self.post(&url, &body).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("API HTTP {}: {} | url={}", status, truncate(&body, 500), url);
            return Err(VoiceError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200).to_string(),
            });
        }

        let data: serde_json::Value = response.json().await?;
        extract_reply(&data).ok_or(VoiceError::EmptyReply)
    }

    /// Speech for `text`, or None when no TTS model is configured.
    async fn synthesize(
        &self,
        session_id: SessionId,
        text: &str,
    ) -> Result<Option<AudioHandle>, VoiceError> {
        let Some(tts_model) = &self.tts_model else {
            return Ok(None);
        };

        let url = self.endpoint("audio/speech");
        let body = json!({
            "model": tts_model,
            "voice": self.tts_voice,
            "input": text,
        });
        let response = self.post(&url, &body).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200).to_string(),
            });
        }

        let bytes = response.bytes().await?;
        tokio::fs::create_dir_all(&self.voice_dir).await?;
        let path = self.voice_dir.join(format!("{}.mp3", session_id));
        tokio::fs::write(&path, &bytes).await?;
        debug!("speech saved: {} ({} bytes)", path.display(), bytes.len());
        Ok(Some(AudioHandle(path)))
    }
}

impl ReplyGenerator for OpenAiVoice {
    fn reply(
        &self,
        session_id: SessionId,
        utterance: String,
        mood: MoodState,
    ) -> impl Future<Output = Result<SpokenReply, VoiceError>> + Send {
        async move {
            let system = voice_system_prompt(&self.pet_name, self.personality, mood);
            let text = self.complete(&system, &utterance).await?;

            // A failed synthesis still delivers the text
            let audio = match self.synthesize(session_id, &text).await {
                Ok(audio) => audio,
                Err(e) => {
                    warn!("Speech synthesis failed, replying with text only: {}", e);
                    None
                }
            };
            Ok(SpokenReply { text, audio })
        }
    }
}

/// Pull the assistant text out of a Chat Completions response.
fn extract_reply(response: &serde_json::Value) -> Option<String> {
    let text = response["choices"][0]["message"]["content"].as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(truncate(text, MAX_REPLY_CHARS).to_string())
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Dispatch ──

/// Runs voice rounds in the background and posts their outcome to the
/// controller's event channel.
pub struct VoiceDispatcher<G: ReplyGenerator> {
    generator: Arc<G>,
    tx: mpsc::Sender<ExternalEvent>,
    in_flight: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl<G: ReplyGenerator> VoiceDispatcher<G> {
    pub fn new(generator: G, tx: mpsc::Sender<ExternalEvent>) -> Self {
        Self {
            generator: Arc::new(generator),
            tx,
            in_flight: None,
            timeout: VOICE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort the in-flight round, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!("Aborting in-flight voice request");
            }
            handle.abort();
        }
    }

    /// Start a round for `utterance`. Must be called from within a tokio
    /// runtime.
    pub fn submit(&mut self, session_id: SessionId, utterance: String, mood: MoodState) {
        self.cancel();

        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        let timeout = self.timeout;
        info!("Voice session {} started", session_id);

        self.in_flight = Some(tokio::spawn(async move {
            let outcome =
                tokio::time::timeout(timeout, generator.reply(session_id, utterance, mood)).await;
            let event = match outcome {
                Ok(Ok(reply)) => ExternalEvent::VoiceReply {
                    session_id,
                    text: reply.text,
                    audio: reply.audio,
                },
                Ok(Err(e)) => {
                    warn!("Voice session {} failed: {}", session_id, e);
                    ExternalEvent::VoiceFailed {
                        session_id,
                        reason: e.to_string(),
                    }
                }
                Err(_) => {
                    warn!("Voice session {} timed out", session_id);
                    ExternalEvent::VoiceFailed {
                        session_id,
                        reason: "timed out".to_string(),
                    }
                }
            };
            if tx.send(event).await.is_err() {
                debug!("Controller gone, voice result discarded");
            }
        }));
    }
}

impl<G: ReplyGenerator> Drop for VoiceDispatcher<G> {
    fn drop(&mut self) {
        self.cancel();
    }
}
