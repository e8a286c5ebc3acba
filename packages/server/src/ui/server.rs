//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    domain::MessagePusher,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetRoomDetailUseCase,
        GetRoomsUseCase, RelaySignalUseCase, SendMessageUseCase, UpdateTimerUseCase,
    },
};

use super::{
    handler::{
        get_room_detail, get_rooms, health_check, legacy_websocket_handler, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Study-room server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     send_message_usecase,
///     update_timer_usecase,
///     relay_signal_usecase,
///     get_rooms_usecase,
///     get_room_detail_usecase,
///     message_pusher,
/// );
/// server.run("127.0.0.1".to_string(), 8000).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        update_timer_usecase: Arc<UpdateTimerUseCase>,
        relay_signal_usecase: Arc<RelaySignalUseCase>,
        get_rooms_usecase: Arc<GetRoomsUseCase>,
        get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                connect_participant_usecase,
                disconnect_participant_usecase,
                send_message_usecase,
                update_timer_usecase,
                relay_signal_usecase,
                get_rooms_usecase,
                get_room_detail_usecase,
                message_pusher,
            }),
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route(
                "/ws/studyroom/{room_id}/{username}/{session_id}",
                get(websocket_handler),
            )
            .route(
                "/ws/studyroom/{room_id}/{username}",
                get(legacy_websocket_handler),
            )
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C / SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8000)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.run_with_listener(listener, shutdown_signal()).await
    }

    /// Run the server on an already bound listener until `shutdown` resolves
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let local_addr = listener.local_addr()?;
        tracing::info!("Study-room server listening on {}", local_addr);
        tracing::info!(
            "Connect to: ws://{}/ws/studyroom/{{room_id}}/{{username}}/{{session_id}}",
            local_addr
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
