//! Tonal cues and speech output.
//!
//! The game only talks to an [`AudioSink`]. [`ClientAudio`] forwards cues and
//! utterances to connected clients over the broadcast channel and waits for
//! them to report that an utterance finished; [`SilentAudio`] discards
//! everything.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

use crate::protocol::ServerMessage;
use crate::types::{Cue, UtteranceId};

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play a short cue. Fire-and-forget.
    fn play_cue(&self, cue: Cue);

    /// Speak the text and resolve once playback ends, fails or is stopped
    async fn speak(&self, text: &str);

    /// Cut off the current utterance, if any
    fn stop_speaking(&self);

    /// A client reports that an utterance finished playing
    fn speech_finished(&self, _utterance_id: UtteranceId) {}
}

/// Sink that plays nothing; utterances complete immediately
pub struct SilentAudio;

#[async_trait]
impl AudioSink for SilentAudio {
    fn play_cue(&self, _cue: Cue) {}

    async fn speak(&self, _text: &str) {}

    fn stop_speaking(&self) {}
}

struct PendingUtterance {
    id: UtteranceId,
    done: oneshot::Sender<()>,
}

/// Sink that delegates playback to connected clients
pub struct ClientAudio {
    broadcast: broadcast::Sender<ServerMessage>,
    pending: Mutex<Option<PendingUtterance>>,
    next_id: AtomicU64,
    speech_timeout: Duration,
    lang: String,
}

impl ClientAudio {
    pub fn new(
        broadcast: broadcast::Sender<ServerMessage>,
        speech_timeout: Duration,
        lang: String,
    ) -> Self {
        Self {
            broadcast,
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
            speech_timeout,
            lang,
        }
    }

    /// Replace the pending utterance. Dropping the old sender completes it.
    fn replace_pending(&self, next: Option<PendingUtterance>) -> Option<PendingUtterance> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *pending, next)
    }

    /// Take the pending utterance only if it is the given one
    fn take_if_current(&self, id: UtteranceId) -> Option<PendingUtterance> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.as_ref().is_some_and(|p| p.id == id) {
            pending.take()
        } else {
            None
        }
    }
}

#[async_trait]
impl AudioSink for ClientAudio {
    fn play_cue(&self, cue: Cue) {
        // No receivers connected is fine
        let _ = self.broadcast.send(ServerMessage::Cue { cue });
    }

    async fn speak(&self, text: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        if let Some(previous) = self.replace_pending(Some(PendingUtterance { id, done: tx })) {
            tracing::debug!("Utterance {} superseded by {}", previous.id, id);
        }

        let message = ServerMessage::Speak {
            utterance_id: id,
            text: text.to_string(),
            lang: self.lang.clone(),
        };
        if self.broadcast.send(message).is_err() {
            // Nobody is listening, so there is nothing to wait for
            self.replace_pending(None);
            return;
        }

        match tokio::time::timeout(self.speech_timeout, rx).await {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(
                    "Utterance {} not acknowledged within {:?}",
                    id,
                    self.speech_timeout
                );
                self.take_if_current(id);
            }
        }
    }

    fn stop_speaking(&self) {
        if let Some(cancelled) = self.replace_pending(None) {
            tracing::debug!("Stopping utterance {}", cancelled.id);
        }
        let _ = self.broadcast.send(ServerMessage::StopSpeaking);
    }

    fn speech_finished(&self, utterance_id: UtteranceId) {
        // Late acknowledgements for stopped or superseded utterances are ignored
        match self.take_if_current(utterance_id) {
            Some(finished) => {
                let _ = finished.done.send(());
            }
            None => {
                tracing::debug!("Ignoring stale speech acknowledgement {}", utterance_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn speak_id(msg: ServerMessage) -> UtteranceId {
        match msg {
            ServerMessage::Speak { utterance_id, .. } => utterance_id,
            other => panic!("Expected Speak, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cue_is_broadcast() {
        let (tx, mut rx) = broadcast::channel(16);
        let audio = ClientAudio::new(tx, Duration::from_secs(30), "English".to_string());

        audio.play_cue(Cue::Success);
        match rx.recv().await.unwrap() {
            ServerMessage::Cue { cue } => assert_eq!(cue, Cue::Success),
            other => panic!("Expected Cue, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_speak_without_listeners_completes_immediately() {
        let (tx, rx) = broadcast::channel(16);
        drop(rx);
        let audio = ClientAudio::new(tx, Duration::from_secs(30), "English".to_string());

        tokio::time::timeout(Duration::from_millis(100), audio.speak("hello"))
            .await
            .expect("speak should not wait without listeners");
        audio.play_cue(Cue::Click);
    }

    #[tokio::test]
    async fn test_speak_carries_language() {
        let (tx, mut rx) = broadcast::channel(16);
        let audio = Arc::new(ClientAudio::new(tx, Duration::from_secs(30), "Russian".to_string()));

        let speaking = {
            let audio = audio.clone();
            tokio::spawn(async move { audio.speak("Факт 1: привет").await })
        };

        match rx.recv().await.unwrap() {
            ServerMessage::Speak {
                utterance_id,
                text,
                lang,
            } => {
                assert_eq!(text, "Факт 1: привет");
                assert_eq!(lang, "Russian");
                audio.speech_finished(utterance_id);
            }
            other => panic!("Expected Speak, got {:?}", other),
        }
        speaking.await.unwrap();
    }

    #[tokio::test]
    async fn test_speak_waits_for_acknowledgement() {
        let (tx, mut rx) = broadcast::channel(16);
        let audio = Arc::new(ClientAudio::new(tx, Duration::from_secs(30), "English".to_string()));

        let speaking = {
            let audio = audio.clone();
            tokio::spawn(async move { audio.speak("Fact 1: hello").await })
        };

        let id = speak_id(rx.recv().await.unwrap());

        // A stale id must not complete the current utterance
        audio.speech_finished(id + 100);
        tokio::task::yield_now().await;
        assert!(!speaking.is_finished());

        audio.speech_finished(id);
        tokio::time::timeout(Duration::from_secs(1), speaking)
            .await
            .expect("speak should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_speaking_resolves_pending_utterance() {
        let (tx, mut rx) = broadcast::channel(16);
        let audio = Arc::new(ClientAudio::new(tx, Duration::from_secs(30), "English".to_string()));

        let speaking = {
            let audio = audio.clone();
            tokio::spawn(async move { audio.speak("long text").await })
        };
        let id = speak_id(rx.recv().await.unwrap());

        audio.stop_speaking();
        assert!(matches!(rx.recv().await.unwrap(), ServerMessage::StopSpeaking));
        tokio::time::timeout(Duration::from_secs(1), speaking)
            .await
            .expect("speak should resolve on stop")
            .unwrap();

        // A late acknowledgement is harmless
        audio.speech_finished(id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_utterance_times_out() {
        let (tx, _rx) = broadcast::channel(16);
        let audio = ClientAudio::new(tx, Duration::from_secs(5), "English".to_string());

        audio.speak("nobody answers").await;
        assert!(audio.replace_pending(None).is_none());
    }
}
