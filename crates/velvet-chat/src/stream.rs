//! Streaming transport primitives.
//!
//! A session moves Idle -> Connected -> Streaming -> Terminal. Every write
//! goes through a liveness-checked sender so writes after disconnect are
//! silent no-ops, and the heartbeat task is owned by an abort-on-drop
//! guard so it is cancelled exactly once on any terminal path.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::types::StreamEvent;

/// Heartbeat interval on the wire.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A channel sender that checks liveness before every write.
///
/// A `false` return means the client is gone; callers keep going (the
/// pipeline finishes, writes just stop landing).
#[derive(Clone)]
pub struct GuardedSender {
    tx: mpsc::Sender<StreamEvent>,
}

impl GuardedSender {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Send if the connection is still live. Never errors.
    pub async fn send(&self, event: StreamEvent) -> bool {
        if self.tx.is_closed() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owned handle for a session's heartbeat task.
///
/// Dropping the guard aborts the task, so every terminal branch (normal,
/// error, panic unwind) cancels the timer exactly once.
pub struct HeartbeatGuard {
    handle: tokio::task::JoinHandle<()>,
}

impl HeartbeatGuard {
    /// Start a heartbeat task writing through `sender` every
    /// [`HEARTBEAT_INTERVAL`], independent of generation progress.
    pub fn spawn(sender: GuardedSender) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            // The first tick fires immediately; the connection event
            // already told the client we are here.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !sender.send(StreamEvent::heartbeat_now()).await {
                    return;
                }
            }
        });
        Self { handle }
    }

    /// Cancel the heartbeat. Equivalent to dropping the guard; named for
    /// the call sites that cancel at terminal emission.
    pub fn cancel(self) {}
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Split text into whitespace-delimited tokens that keep their trailing
/// whitespace, so concatenating the emitted tokens reproduces the text
/// byte for byte.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_whitespace_tail = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            current.push(ch);
            in_whitespace_tail = true;
        } else {
            if in_whitespace_tail {
                tokens.push(std::mem::take(&mut current));
                in_whitespace_tail = false;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Emit `text` as an ordered token sequence with a fixed inter-token
/// delay. `isComplete` is set only on the final token.
pub async fn stream_tokens(sender: &GuardedSender, text: &str, delay: Duration) {
    let tokens = tokenize(text);
    let last = tokens.len().saturating_sub(1);
    for (i, token) in tokens.into_iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        sender
            .send(StreamEvent::Token {
                text: token,
                is_complete: i == last,
            })
            .await;
    }
}
