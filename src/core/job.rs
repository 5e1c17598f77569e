//! Pin job entity, its dedup fingerprint and lifecycle state.
//!
//! A [`PinJob`] pairs the immutable, producer-supplied [`PinRequest`] with a
//! small piece of mutable state ([`JobState`]) guarded by a lock local to the
//! job. Workers mutate that state while producers read it through
//! [`PinJob::snapshot`], so the two never race.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::PinError;

/// Status of a pin job in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStatus {
    /// Accepted and waiting for a worker.
    #[default]
    Queued,
    /// A worker is executing the pin function.
    Pinning,
    /// Content was pinned successfully.
    Pinned,
    /// Execution failed or timed out.
    Failed,
}

impl PinStatus {
    /// Wire/display name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Pinning => "pinning",
            Self::Pinned => "pinned",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Pinned | Self::Failed)
    }

    const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Pinning) | (Self::Pinning, Self::Pinned | Self::Failed)
        )
    }
}

impl fmt::Display for PinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peer the content can be fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddr {
    /// Peer identity.
    pub id: String,
    /// Multiaddresses the peer is reachable on.
    #[serde(default)]
    pub addrs: Vec<String>,
}

/// Producer-supplied attributes of a pin job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRequest {
    /// Content identifier to pin.
    pub cid: String,
    /// Display name.
    pub name: String,
    /// Candidate peers to fetch from.
    #[serde(default)]
    pub peers: Vec<PeerAddr>,
    /// Opaque metadata.
    #[serde(default)]
    pub meta: String,
    /// Owning user. [`PinRequest::SYSTEM_USER`] marks system work.
    pub user_id: u64,
    /// Container the content belongs to.
    pub container_id: u64,
    /// Identifier of a prior job this one supersedes.
    #[serde(default)]
    pub replace: u64,
    /// Target storage location.
    #[serde(default)]
    pub location: String,
    /// Bypass per-user limiting.
    #[serde(default)]
    pub skip_limiter: bool,
    /// Make a storage deal once pinned.
    #[serde(default)]
    pub make_deal: bool,
}

impl PinRequest {
    /// User id reserved for system-owned work.
    pub const SYSTEM_USER: u64 = 0;

    /// System-owned or limiter-bypassing requests go to the priority queue.
    #[must_use]
    pub const fn is_priority(&self) -> bool {
        self.user_id == Self::SYSTEM_USER || self.skip_limiter
    }
}

/// Dedup key: every job attribute except the peer list and progress fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fingerprint {
    cid: String,
    name: String,
    meta: String,
    status: PinStatus,
    user_id: u64,
    container_id: u64,
    replace: u64,
    location: String,
    skip_limiter: bool,
    make_deal: bool,
}

impl Fingerprint {
    /// Project a request and its status onto a fingerprint.
    #[must_use]
    pub fn of(request: &PinRequest, status: PinStatus) -> Self {
        Self {
            cid: request.cid.clone(),
            name: request.name.clone(),
            meta: request.meta.clone(),
            status,
            user_id: request.user_id,
            container_id: request.container_id,
            replace: request.replace,
            location: request.location.clone(),
            skip_limiter: request.skip_limiter,
            make_deal: request.make_deal,
        }
    }
}

/// Mutable status, timestamps and progress of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobState {
    /// Current lifecycle status.
    pub status: PinStatus,
    /// Last time any field changed.
    pub last_update: Option<SystemTime>,
    /// When execution started.
    pub started: Option<SystemTime>,
    /// When the job reached a terminal status.
    pub ended: Option<SystemTime>,
    /// Number of progress reports received.
    pub items_fetched: u64,
    /// Total bytes reported through progress.
    pub bytes_fetched: u64,
    /// Last execution error, if any.
    pub error: Option<String>,
}

/// Persisted form of a backlog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier.
    pub id: Uuid,
    /// Request attributes.
    pub request: PinRequest,
}

/// One request to fetch and pin a piece of content.
#[derive(Debug)]
pub struct PinJob {
    id: Uuid,
    request: PinRequest,
    fingerprint: Fingerprint,
    state: Mutex<JobState>,
}

impl PinJob {
    /// Create a queued job from a request.
    #[must_use]
    pub fn new(request: PinRequest) -> Self {
        Self::restore(Uuid::new_v4(), request)
    }

    /// Create a queued job already wrapped for sharing with the scheduler.
    #[must_use]
    pub fn shared(request: PinRequest) -> Arc<Self> {
        Arc::new(Self::new(request))
    }

    /// Rebuild a queued job from its persisted record.
    #[must_use]
    pub fn from_record(record: JobRecord) -> Self {
        Self::restore(record.id, record.request)
    }

    fn restore(id: Uuid, request: PinRequest) -> Self {
        let state = JobState::default();
        let fingerprint = Fingerprint::of(&request, state.status);
        Self {
            id,
            request,
            fingerprint,
            state: Mutex::new(state),
        }
    }

    /// Job identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Producer-supplied attributes.
    #[must_use]
    pub const fn request(&self) -> &PinRequest {
        &self.request
    }

    /// Dedup key captured at creation.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> PinStatus {
        self.state.lock().status
    }

    /// Consistent copy of the mutable state.
    #[must_use]
    pub fn snapshot(&self) -> JobState {
        self.state.lock().clone()
    }

    /// Persisted form of this job.
    #[must_use]
    pub fn record(&self) -> JobRecord {
        JobRecord {
            id: self.id,
            request: self.request.clone(),
        }
    }

    /// Move to `pinning` and stamp the start time.
    pub(crate) fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if !Self::transition(&mut state, PinStatus::Pinning) {
            return false;
        }
        state.started = state.last_update;
        true
    }

    /// Count one progress report of `bytes`.
    pub(crate) fn record_progress(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.items_fetched += 1;
        state.bytes_fetched = state.bytes_fetched.saturating_add(bytes);
    }

    /// Record the execution error and move to `failed`.
    pub(crate) fn fail(&self, err: &PinError) -> bool {
        let mut state = self.state.lock();
        if !Self::transition(&mut state, PinStatus::Failed) {
            return false;
        }
        state.error = Some(err.to_string());
        state.ended = state.last_update;
        true
    }

    /// Move to `pinned`.
    pub(crate) fn mark_pinned(&self) -> bool {
        let mut state = self.state.lock();
        if !Self::transition(&mut state, PinStatus::Pinned) {
            return false;
        }
        state.ended = state.last_update;
        true
    }

    fn transition(state: &mut JobState, next: PinStatus) -> bool {
        if !state.status.can_transition_to(next) {
            tracing::warn!(from = %state.status, to = %next, "rejected pin job transition");
            return false;
        }
        state.status = next;
        state.last_update = Some(SystemTime::now());
        true
    }
}
