//! WebRTC mesh coordinator.
//!
//! Keeps one peer connection per remote username and turns local actions and
//! inbound signaling into outbound [`Signal`]s. The concrete WebRTC stack sits
//! behind [`PeerConnectionFactory`], so this module only sequences the
//! offer / answer / ICE exchange.
//!
//! Peer connections are created lazily (first offer sent or received) and are
//! closed either when the remote leaves the roster ([`MeshCoordinator::prune`])
//! or when the local user leaves the room ([`MeshCoordinator::close_all`]).
//! Every failure is logged and the affected peer is skipped.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::PeerError;

/// One connection to one remote participant.
///
/// SDP and ICE payloads are opaque JSON values, forwarded as-is by the server.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Create an offer and set it as the local description
    async fn create_offer(&self) -> Result<Value, PeerError>;

    /// Set a remote offer, then create and set the answer
    async fn accept_offer(&self, offer: Value) -> Result<Value, PeerError>;

    async fn accept_answer(&self, answer: Value) -> Result<(), PeerError>;

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), PeerError>;

    async fn close(&self) -> Result<(), PeerError>;
}

#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    /// Create a connection to `remote` with the local media attached.
    ///
    /// Asynchronous happenings of the connection (local ICE candidates, remote
    /// tracks, state changes) are reported on `events`.
    async fn create(
        &self,
        remote: &str,
        events: UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>, PeerError>;
}

/// Callback-side events of a peer connection
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    LocalCandidate { peer: String, candidate: Value },
    RemoteTrack {
        peer: String,
        kind: String,
        track_id: String,
    },
    StateChanged { peer: String, state: String },
}

/// Signaling message to send to one remote participant
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Offer { to: String, sdp: Value },
    Answer { to: String, sdp: Value },
    Ice { to: String, candidate: Value },
}

impl Signal {
    pub fn to(&self) -> &str {
        match self {
            Signal::Offer { to, .. } | Signal::Answer { to, .. } | Signal::Ice { to, .. } => to,
        }
    }
}

/// One inbound media track bound to a remote participant's tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub kind: String,
    pub track_id: String,
}

pub struct MeshCoordinator {
    local: String,
    factory: Arc<dyn PeerConnectionFactory>,
    events: UnboundedSender<PeerEvent>,
    peers: HashMap<String, Arc<dyn PeerConnection>>,
    /// Key: remote username
    streams: BTreeMap<String, Vec<RemoteTrack>>,
}

impl MeshCoordinator {
    pub fn new(
        local: impl Into<String>,
        factory: Arc<dyn PeerConnectionFactory>,
        events: UnboundedSender<PeerEvent>,
    ) -> Self {
        Self {
            local: local.into(),
            factory,
            events,
            peers: HashMap::new(),
            streams: BTreeMap::new(),
        }
    }

    async fn ensure_peer(&mut self, remote: &str) -> Result<Arc<dyn PeerConnection>, PeerError> {
        if let Some(peer) = self.peers.get(remote) {
            return Ok(peer.clone());
        }
        let peer = self.factory.create(remote, self.events.clone()).await?;
        self.peers.insert(remote.to_string(), peer.clone());
        tracing::debug!("Peer connection to '{}' created", remote);
        Ok(peer)
    }

    /// Offer a connection to every listed participant except ourselves.
    ///
    /// Existing connections are reused, so this also renegotiates.
    pub async fn connect_all(&mut self, users: &[String]) -> Vec<Signal> {
        let mut offers = Vec::new();
        let local = self.local.clone();
        for remote in users.iter().filter(|u| **u != local) {
            let offer = match self.ensure_peer(remote).await {
                Ok(peer) => peer.create_offer().await,
                Err(e) => Err(e),
            };
            match offer {
                Ok(sdp) => offers.push(Signal::Offer {
                    to: remote.clone(),
                    sdp,
                }),
                Err(e) => tracing::warn!("Failed to create offer for '{}': {}", remote, e),
            }
        }
        offers
    }

    /// Answer an inbound offer, creating the connection on demand
    pub async fn handle_offer(&mut self, from: &str, sdp: Value) -> Option<Signal> {
        if from == self.local {
            return None;
        }
        let answer = match self.ensure_peer(from).await {
            Ok(peer) => peer.accept_offer(sdp).await,
            Err(e) => Err(e),
        };
        match answer {
            Ok(sdp) => Some(Signal::Answer {
                to: from.to_string(),
                sdp,
            }),
            Err(e) => {
                tracing::warn!("Failed to answer offer from '{}': {}", from, e);
                None
            }
        }
    }

    pub async fn handle_answer(&mut self, from: &str, sdp: Value) {
        let Some(peer) = self.peers.get(from).cloned() else {
            tracing::debug!("Answer from '{}' without a pending offer, ignored", from);
            return;
        };
        if let Err(e) = peer.accept_answer(sdp).await {
            tracing::warn!("Failed to apply answer from '{}': {}", from, e);
        }
    }

    /// Add a remote ICE candidate. Candidates for unknown peers are dropped.
    pub async fn handle_ice(&mut self, from: &str, candidate: Value) {
        let Some(peer) = self.peers.get(from).cloned() else {
            tracing::debug!("ICE candidate from unknown peer '{}' dropped", from);
            return;
        };
        if let Err(e) = peer.add_ice_candidate(candidate).await {
            tracing::debug!("Failed to add ICE candidate from '{}': {}", from, e);
        }
    }

    /// Apply a callback-side event.
    ///
    /// # Returns
    ///
    /// The ICE signal to forward for a local candidate of a live connection
    pub fn handle_event(&mut self, event: PeerEvent) -> Option<Signal> {
        match event {
            PeerEvent::LocalCandidate { peer, candidate } => {
                if self.peers.contains_key(&peer) {
                    Some(Signal::Ice {
                        to: peer,
                        candidate,
                    })
                } else {
                    None
                }
            }
            PeerEvent::RemoteTrack {
                peer,
                kind,
                track_id,
            } => {
                if self.peers.contains_key(&peer) {
                    tracing::info!("Remote {} track from '{}'", kind, peer);
                    self.streams
                        .entry(peer)
                        .or_default()
                        .push(RemoteTrack { kind, track_id });
                }
                None
            }
            PeerEvent::StateChanged { peer, state } => {
                tracing::debug!("Peer connection to '{}' is {}", peer, state);
                None
            }
        }
    }

    /// Close connections to participants that left the roster
    pub async fn prune(&mut self, departed: &[String]) {
        for remote in departed {
            self.streams.remove(remote);
            if let Some(peer) = self.peers.remove(remote) {
                if let Err(e) = peer.close().await {
                    tracing::debug!("Failed to close peer '{}': {}", remote, e);
                }
                tracing::debug!("Peer connection to '{}' closed", remote);
            }
        }
    }

    pub async fn close_all(&mut self) {
        let remotes: Vec<String> = self.peers.keys().cloned().collect();
        self.prune(&remotes).await;
        self.streams.clear();
    }

    /// Remote media per username
    pub fn streams(&self) -> &BTreeMap<String, Vec<RemoteTrack>> {
        &self.streams
    }

    pub fn peer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.peers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Hand-written peer connection fakes shared by the unit tests
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every call made on any connection it created
    #[derive(Default)]
    pub(crate) struct FakeFactory {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub fail_for: Option<String>,
    }

    pub(crate) struct FakePeer {
        remote: String,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakePeer {
        fn record(&self, call: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", call, self.remote));
        }
    }

    #[async_trait]
    impl PeerConnection for FakePeer {
        async fn create_offer(&self) -> Result<Value, PeerError> {
            self.record("offer");
            Ok(json!({"type": "offer", "sdp": format!("offer-for-{}", self.remote)}))
        }

        async fn accept_offer(&self, _offer: Value) -> Result<Value, PeerError> {
            self.record("accept_offer");
            Ok(json!({"type": "answer", "sdp": format!("answer-for-{}", self.remote)}))
        }

        async fn accept_answer(&self, _answer: Value) -> Result<(), PeerError> {
            self.record("accept_answer");
            Ok(())
        }

        async fn add_ice_candidate(&self, _candidate: Value) -> Result<(), PeerError> {
            self.record("ice");
            Ok(())
        }

        async fn close(&self) -> Result<(), PeerError> {
            self.record("close");
            Ok(())
        }
    }

    #[async_trait]
    impl PeerConnectionFactory for FakeFactory {
        async fn create(
            &self,
            remote: &str,
            _events: UnboundedSender<PeerEvent>,
        ) -> Result<Arc<dyn PeerConnection>, PeerError> {
            if self.fail_for.as_deref() == Some(remote) {
                return Err(PeerError::WebRtc("boom".to_string()));
            }
            self.calls.lock().unwrap().push(format!("create:{}", remote));
            Ok(Arc::new(FakePeer {
                remote: remote.to_string(),
                calls: self.calls.clone(),
            }))
        }
    }
}
