//! Scripted sessions replayed from recorded JSON lines.
//!
//! Each non-empty line is one [`ProtocolEvent`] in its serialized form. An
//! optional `delayMs` field pauses before the event is delivered. An `error`
//! record ends the session with that message, as a real transport failure
//! would. `connected` / `disconnected` records are rejected: those are
//! produced by the supervisor, not by a session.
//!
//! ```text
//! {"event":"deviceInfo","name":"kitchen-node","model":"esp32dev"}
//! {"event":"newEntity","key":"1","type":"Switch","name":"Relay","config":{}}
//! {"event":"initialized"}
//! {"event":"entityState","key":"1","state":{"state":true},"delayMs":250}
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::Error;
use crate::event::ProtocolEvent;
use crate::options::ClientOptions;
use crate::supervisor::{Dialer, Session};

const DELAY_FIELD: &str = "delayMs";

#[derive(Debug, Clone, PartialEq)]
struct Step {
    delay: Duration,
    event: ProtocolEvent,
}

// ── ScriptDialer ─────────────────────────────────────────────────────

/// [`Dialer`] whose every session replays the same recorded script.
#[derive(Debug, Clone)]
pub struct ScriptDialer {
    steps: Arc<Vec<Step>>,
}

impl ScriptDialer {
    /// Parse a script from JSON lines.
    pub fn from_json_lines(text: &str) -> Result<Self, Error> {
        let mut steps = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            steps.push(parse_step(trimmed, line_no)?);
        }

        debug!(steps = steps.len(), "loaded replay script");
        Ok(Self {
            steps: Arc::new(steps),
        })
    }

    /// Read and parse a script file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_lines(&text)
    }

    /// Number of events in one replayed session.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn parse_step(line: &str, line_no: usize) -> Result<Step, Error> {
    let script_err = |message: String| Error::Script {
        line: line_no,
        message,
    };

    let mut value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| script_err(e.to_string()))?;

    let delay_ms = match value.as_object_mut().and_then(|o| o.remove(DELAY_FIELD)) {
        None => 0,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| script_err(format!("{DELAY_FIELD} must be a non-negative integer")))?,
    };

    let event: ProtocolEvent =
        serde_json::from_value(value).map_err(|e| script_err(e.to_string()))?;

    if matches!(event, ProtocolEvent::Connected | ProtocolEvent::Disconnected) {
        return Err(script_err(format!(
            "'{}' is produced by the supervisor and cannot be scripted",
            event.kind()
        )));
    }

    Ok(Step {
        delay: Duration::from_millis(delay_ms),
        event,
    })
}

impl Dialer for ScriptDialer {
    type Session = ScriptSession;

    async fn dial(&self, options: &ClientOptions) -> Result<ScriptSession, Error> {
        debug!(address = %options.address(), "opening scripted session");
        Ok(ScriptSession {
            steps: Arc::clone(&self.steps),
            cursor: 0,
            due: None,
        })
    }
}

// ── ScriptSession ────────────────────────────────────────────────────

/// One pass over a replay script.
///
/// A step's delay is armed on the first poll and the cursor only moves once
/// the event is handed out, so dropping `next_event` mid-delay loses nothing.
#[derive(Debug)]
pub struct ScriptSession {
    steps: Arc<Vec<Step>>,
    cursor: usize,
    due: Option<Instant>,
}

impl Session for ScriptSession {
    async fn next_event(&mut self) -> Option<Result<ProtocolEvent, Error>> {
        let step = self.steps.get(self.cursor)?;

        if !step.delay.is_zero() {
            let delay = step.delay;
            let due = *self.due.get_or_insert_with(|| Instant::now() + delay);
            tokio::time::sleep_until(due).await;
        }

        let event = step.event.clone();
        self.cursor += 1;
        self.due = None;

        match event {
            ProtocolEvent::Error { message } => Some(Err(Error::Transport(message))),
            event => Some(Ok(event)),
        }
    }

    async fn ping(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    const SCRIPT: &str = r#"
# recorded from kitchen-node
{"event":"deviceInfo","name":"kitchen-node"}
{"event":"newEntity","key":"1","type":"Switch","name":"Relay"}
{"event":"initialized"}
{"event":"entityState","key":"1","state":{"state":true},"delayMs":20}
"#;

    fn options() -> ClientOptions {
        ClientOptions::new("127.0.0.1", 6053, SecretString::from(String::new()))
    }

    #[test]
    fn parses_records_and_skips_comments() {
        let dialer = ScriptDialer::from_json_lines(SCRIPT).unwrap();
        assert_eq!(dialer.len(), 4);
        assert_eq!(dialer.steps[3].delay, Duration::from_millis(20));
        assert_eq!(dialer.steps[2].event, ProtocolEvent::Initialized);
    }

    #[test]
    fn rejects_lifecycle_records() {
        let err = ScriptDialer::from_json_lines("{\"event\":\"initialized\"}\n{\"event\":\"connected\"}")
            .unwrap_err();
        assert!(matches!(err, Error::Script { line: 2, .. }), "got {err:?}");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = ScriptDialer::from_json_lines("not json").unwrap_err();
        assert!(matches!(err, Error::Script { line: 1, .. }), "got {err:?}");
    }

    #[test]
    fn rejects_negative_delay() {
        let err = ScriptDialer::from_json_lines(r#"{"event":"initialized","delayMs":-3}"#).unwrap_err();
        assert!(err.to_string().contains("delayMs"));
    }

    #[tokio::test(start_paused = true)]
    async fn session_replays_in_order_then_ends() {
        let dialer = ScriptDialer::from_json_lines(SCRIPT).unwrap();
        let mut session = dialer.dial(&options()).await.unwrap();

        let mut kinds = Vec::new();
        while let Some(event) = session.next_event().await {
            kinds.push(event.unwrap().kind());
        }
        assert_eq!(kinds, ["deviceInfo", "newEntity", "initialized", "entityState"]);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_delay_keeps_the_pending_event() {
        let dialer = ScriptDialer::from_json_lines(
            r#"{"event":"initialized","delayMs":10000}"#,
        )
        .unwrap();
        let mut session = dialer.dial(&options()).await.unwrap();
        let start = Instant::now();

        let interrupted = tokio::time::timeout(Duration::from_secs(4), session.next_event()).await;
        assert!(interrupted.is_err());

        let event = session.next_event().await.unwrap().unwrap();
        assert_eq!(event, ProtocolEvent::Initialized);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert!(session.next_event().await.is_none());
    }

    #[tokio::test]
    async fn error_record_becomes_transport_failure() {
        let dialer = ScriptDialer::from_json_lines(
            r#"{"event":"error","message":"read ECONNRESET"}"#,
        )
        .unwrap();
        let mut session = dialer.dial(&options()).await.unwrap();

        let err = session.next_event().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "read ECONNRESET");
        assert!(session.next_event().await.is_none());
    }

    #[test]
    fn reads_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        std::fs::write(&path, SCRIPT).unwrap();

        let dialer = ScriptDialer::from_file(&path).unwrap();
        assert!(!dialer.is_empty());
    }
}
