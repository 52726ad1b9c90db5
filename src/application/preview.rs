//! Live preview of partially edited settings.
//!
//! Every request belongs to a session and carries a sequence number. Only the
//! highest sequence seen for a session may deliver; older requests that finish
//! later report `Superseded` instead of overwriting the newer result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, gauge};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::application::settings::SettingsService;
use crate::domain::css::CssDocument;
use crate::domain::error::ValidationError;
use crate::domain::snapshot::Fingerprint;

const SOURCE: &str = "application::preview";

pub const METRIC_PREVIEW_DELIVERED: &str = "styler_preview_delivered_total";
pub const METRIC_PREVIEW_SUPERSEDED: &str = "styler_preview_superseded_total";
pub const METRIC_PREVIEW_FALLBACK: &str = "styler_preview_fallback_total";
pub const METRIC_PREVIEW_SESSIONS: &str = "styler_preview_sessions";

const DEFAULT_SESSION_IDLE_SECONDS: u64 = 900;
const DEFAULT_MAX_OVERRIDES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub session_idle: Duration,
    pub max_overrides: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECONDS),
            max_overrides: DEFAULT_MAX_OVERRIDES,
        }
    }
}

impl From<&crate::config::PreviewSettings> for PreviewConfig {
    fn from(settings: &crate::config::PreviewSettings) -> Self {
        Self {
            session_idle: Duration::from_secs(settings.session_idle_seconds.get()),
            max_overrides: settings.max_overrides,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub session: String,
    /// Client-assigned sequence. When absent the next number for the session
    /// is assigned.
    pub sequence: Option<u64>,
    pub overrides: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub enum PreviewOutcome {
    Delivered {
        sequence: u64,
        css: CssDocument,
        fingerprint: Fingerprint,
        issues: Vec<ValidationError>,
    },
    Superseded {
        sequence: u64,
        latest: u64,
    },
    Fallback {
        sequence: u64,
        css: CssDocument,
        reason: String,
    },
}

impl PreviewOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            PreviewOutcome::Delivered { sequence, .. }
            | PreviewOutcome::Superseded { sequence, .. }
            | PreviewOutcome::Fallback { sequence, .. } => *sequence,
        }
    }
}

/// Where a session stands. `Pending` while its latest request renders;
/// otherwise the outcome of the request that settled last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Pending,
    Delivered,
    Superseded,
    Failed,
}

#[derive(Debug)]
struct SessionState {
    latest: Option<u64>,
    phase: SessionPhase,
    last_delivered: Option<CssDocument>,
    touched_at: Instant,
}

impl SessionState {
    fn new() -> Self {
        Self {
            latest: None,
            phase: SessionPhase::Idle,
            last_delivered: None,
            touched_at: Instant::now(),
        }
    }

    /// A newer request still rendering keeps the session `Pending`.
    fn settle_superseded(&mut self) {
        if self.phase != SessionPhase::Pending {
            self.phase = SessionPhase::Superseded;
        }
    }
}

/// Proof that a request was registered as the latest for its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTicket {
    session: String,
    sequence: u64,
}

impl PreviewTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

enum Completion {
    Rendered {
        css: CssDocument,
        fingerprint: Fingerprint,
        issues: Vec<ValidationError>,
    },
    Failed {
        reason: String,
    },
}

pub struct PreviewService {
    settings: Arc<SettingsService>,
    sessions: DashMap<String, SessionState>,
    config: PreviewConfig,
}

impl PreviewService {
    pub fn new(settings: Arc<SettingsService>, config: PreviewConfig) -> Self {
        Self {
            settings,
            sessions: DashMap::new(),
            config,
        }
    }

    pub async fn preview(&self, request: PreviewRequest) -> PreviewOutcome {
        let ticket = match self.begin(&request.session, request.sequence) {
            Ok(ticket) => ticket,
            Err(superseded) => return superseded,
        };

        let completion = self.render(&request.overrides).await;
        self.finish(ticket, completion)
    }

    /// Register a request. Fails with `Superseded` when the session has
    /// already seen an equal or higher sequence.
    pub fn begin(
        &self,
        session: &str,
        sequence: Option<u64>,
    ) -> Result<PreviewTicket, PreviewOutcome> {
        let mut state = self
            .sessions
            .entry(session.to_string())
            .or_insert_with(SessionState::new);
        state.touched_at = Instant::now();

        let sequence = match (sequence, state.latest) {
            (Some(requested), _) => requested,
            (None, Some(latest)) => latest.saturating_add(1),
            (None, None) => 1,
        };

        if let Some(latest) = state.latest
            && sequence <= latest
        {
            state.settle_superseded();
            drop(state);
            counter!(METRIC_PREVIEW_SUPERSEDED).increment(1);
            debug!(
                source = SOURCE,
                session, sequence, latest, "Preview request arrived stale"
            );
            return Err(PreviewOutcome::Superseded { sequence, latest });
        }

        state.latest = Some(sequence);
        state.phase = SessionPhase::Pending;
        drop(state);
        gauge!(METRIC_PREVIEW_SESSIONS).set(self.sessions.len() as f64);

        Ok(PreviewTicket {
            session: session.to_string(),
            sequence,
        })
    }

    pub fn phase(&self, session: &str) -> Option<SessionPhase> {
        self.sessions.get(session).map(|state| state.phase)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions untouched for longer than the configured window.
    ///
    /// A `Pending` session whose request was abandoned mid-render is dropped
    /// the same way; a late completion for it is answered without a session.
    pub fn prune_idle(&self) -> usize {
        let before = self.sessions.len();
        let idle = self.config.session_idle;
        self.sessions.retain(|_, state| state.touched_at.elapsed() < idle);
        let removed = before.saturating_sub(self.sessions.len());
        gauge!(METRIC_PREVIEW_SESSIONS).set(self.sessions.len() as f64);
        if removed > 0 {
            debug!(source = SOURCE, removed, "Pruned idle preview sessions");
        }
        removed
    }

    async fn render(&self, overrides: &Map<String, Value>) -> Completion {
        if overrides.len() > self.config.max_overrides {
            return Completion::Failed {
                reason: format!(
                    "preview carries {} overrides; at most {} are accepted",
                    overrides.len(),
                    self.config.max_overrides
                ),
            };
        }

        let base = match self.settings.snapshot().await {
            Ok(base) => base,
            Err(err) => {
                return Completion::Failed {
                    reason: format!("stored settings unavailable: {err}"),
                };
            }
        };

        let merged = base.merge(overrides);
        for issue in &merged.issues {
            debug!(source = SOURCE, key = issue.key(), error = %issue, "Preview override ignored");
        }

        match self.settings.cache().get_or_generate(&merged.snapshot).await {
            Ok(rendered) => Completion::Rendered {
                css: rendered.css,
                fingerprint: rendered.fingerprint,
                issues: merged.issues,
            },
            Err(err) => Completion::Failed {
                reason: err.to_string(),
            },
        }
    }

    fn finish(&self, ticket: PreviewTicket, completion: Completion) -> PreviewOutcome {
        let sequence = ticket.sequence;
        let Some(mut state) = self.sessions.get_mut(&ticket.session) else {
            // Pruned while in flight; nothing newer can exist for it.
            return self.outcome_without_session(sequence, completion);
        };

        let latest = state.latest.unwrap_or(sequence);
        if latest != sequence {
            state.settle_superseded();
            drop(state);
            counter!(METRIC_PREVIEW_SUPERSEDED).increment(1);
            debug!(
                source = SOURCE,
                session = %ticket.session,
                sequence,
                latest,
                "Preview result superseded"
            );
            return PreviewOutcome::Superseded { sequence, latest };
        }

        state.touched_at = Instant::now();
        match completion {
            Completion::Rendered {
                css,
                fingerprint,
                issues,
            } => {
                state.phase = SessionPhase::Delivered;
                state.last_delivered = Some(css.clone());
                drop(state);
                counter!(METRIC_PREVIEW_DELIVERED).increment(1);
                PreviewOutcome::Delivered {
                    sequence,
                    css,
                    fingerprint,
                    issues,
                }
            }
            Completion::Failed { reason } => {
                state.phase = SessionPhase::Failed;
                let previous = state.last_delivered.clone();
                drop(state);
                self.fallback(sequence, previous, reason)
            }
        }
    }

    fn outcome_without_session(&self, sequence: u64, completion: Completion) -> PreviewOutcome {
        match completion {
            Completion::Rendered {
                css,
                fingerprint,
                issues,
            } => {
                counter!(METRIC_PREVIEW_DELIVERED).increment(1);
                PreviewOutcome::Delivered {
                    sequence,
                    css,
                    fingerprint,
                    issues,
                }
            }
            Completion::Failed { reason } => self.fallback(sequence, None, reason),
        }
    }

    fn fallback(
        &self,
        sequence: u64,
        previous: Option<CssDocument>,
        reason: String,
    ) -> PreviewOutcome {
        let css = previous
            .or_else(|| self.settings.cache().last_good())
            .unwrap_or_else(CssDocument::empty);
        counter!(METRIC_PREVIEW_FALLBACK).increment(1);
        warn!(
            source = SOURCE,
            sequence,
            reason = %reason,
            fallback_bytes = css.len(),
            "Preview fell back to an earlier stylesheet"
        );
        PreviewOutcome::Fallback {
            sequence,
            css,
            reason,
        }
    }
}
