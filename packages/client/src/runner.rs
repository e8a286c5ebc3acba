//! Client execution logic.

use std::{path::PathBuf, sync::Arc};

use studyroom_shared::time::now_millis;

use crate::{
    domain::identity::{self, KeyValueStore, TOKEN_KEY},
    error::ClientError,
    infrastructure::{
        identity_store::FileIdentityStore,
        peer::{MediaDevices, NoMediaDevices, PeerConfig, SyntheticMediaDevices, WebRtcPeerFactory},
        transport::{self, room_url},
    },
    session::run_room_session,
};

/// Everything needed to join one room
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Server base URL, e.g. `ws://127.0.0.1:8000`
    pub url: String,
    pub room_id: String,
    /// Profile directory holding this "tab's" identity
    pub profile: PathBuf,
    /// Auth token to store before resolving the username
    pub token: Option<String>,
    /// Attach synthetic local media to outgoing calls
    pub media: bool,
    pub peer_config: PeerConfig,
}

/// Run the study-room client.
///
/// There is no reconnect: a dropped connection or a duplicate session ends
/// the run with an error.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let mut store = FileIdentityStore::open(&options.profile)?;
    if let Some(token) = &options.token {
        store.set(TOKEN_KEY, token)?;
    }
    let identity = identity::load_or_create(&mut store, now_millis(), &mut rand::thread_rng())?;
    tracing::info!(
        "Session '{}' as '{}' (profile {})",
        identity.session_id,
        identity.username,
        store.path().display()
    );

    let devices: Box<dyn MediaDevices> = if options.media {
        Box::new(SyntheticMediaDevices::new(identity.session_id.clone()))
    } else {
        Box::new(NoMediaDevices)
    };
    let local = match devices.acquire().await {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!("{}; continuing without local media", e);
            None
        }
    };
    let factory = Arc::new(WebRtcPeerFactory::new(options.peer_config, local)?);

    let url = room_url(
        &options.url,
        &options.room_id,
        &identity.username,
        &identity.session_id,
    );
    tracing::info!("Connecting to {}", url);
    let connection = transport::connect(&url, &options.room_id, &identity.session_id).await?;

    run_room_session(connection, identity, &options.room_id, factory).await
}
