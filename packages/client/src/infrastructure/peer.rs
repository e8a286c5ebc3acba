//! webrtc-rs implementation of the peer connection seam.
//!
//! Signaling payloads use the browser JSON shapes:
//! `{"type": "offer", "sdp": "..."}` for descriptions and
//! `{"candidate", "sdpMid", "sdpMLineIndex", "usernameFragment"}` for ICE.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use webrtc::{
    api::{
        API, APIBuilder,
        interceptor_registry::register_default_interceptors,
        media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine},
        setting_engine::SettingEngine,
    },
    ice::network_type::NetworkType,
    ice_transport::{
        ice_candidate::{RTCIceCandidate, RTCIceCandidateInit},
        ice_server::RTCIceServer,
    },
    interceptor::registry::Registry,
    media::Sample,
    peer_connection::{
        RTCPeerConnection, configuration::RTCConfiguration,
        peer_connection_state::RTCPeerConnectionState, sdp::sdp_type::RTCSdpType,
        sdp::session_description::RTCSessionDescription,
    },
    rtp_transceiver::{
        RTCRtpTransceiverInit,
        rtp_codec::{RTCRtpCodecCapability, RTPCodecType},
        rtp_transceiver_direction::RTCRtpTransceiverDirection,
    },
    track::{
        track_local::{TrackLocal, track_local_static_sample::TrackLocalStaticSample},
        track_remote::TrackRemote,
    },
};

use crate::{
    domain::mesh::{PeerConnection, PeerConnectionFactory, PeerEvent},
    error::PeerError,
};

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

const AUDIO_FRAME: Duration = Duration::from_millis(20);
const VIDEO_FRAME: Duration = Duration::from_millis(33);
/// Opus TOC byte for a 20ms silence frame
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
/// VP8 key frame header without image data
const VP8_BLANK: [u8; 10] = [0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a, 0x10, 0x00, 0x10, 0x00];

/// ICE configuration shared by every peer connection
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub ice_servers: Vec<String>,
    /// Gather 127.0.0.1 host candidates (single-host rooms and tests)
    pub include_loopback: bool,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_string()],
            include_loopback: false,
        }
    }
}

impl PeerConfig {
    /// Loopback-only configuration with no STUN server
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
            include_loopback: true,
        }
    }
}

/// Camera and microphone tracks, acquired once and shared by every peer
#[derive(Clone)]
pub struct LocalStream {
    pub stream_id: String,
    pub tracks: Vec<Arc<TrackLocalStaticSample>>,
}

/// Source of the local media stream
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self) -> Result<LocalStream, PeerError>;
}

/// Silent audio and blank video generated in-process
pub struct SyntheticMediaDevices {
    stream_id: String,
}

impl SyntheticMediaDevices {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
        }
    }
}

#[async_trait]
impl MediaDevices for SyntheticMediaDevices {
    async fn acquire(&self) -> Result<LocalStream, PeerError> {
        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_string(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_string(),
            self.stream_id.clone(),
        ));
        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_string(),
                clock_rate: 90_000,
                ..Default::default()
            },
            "video".to_string(),
            self.stream_id.clone(),
        ));
        spawn_pump(&audio, &OPUS_SILENCE, AUDIO_FRAME);
        spawn_pump(&video, &VP8_BLANK, VIDEO_FRAME);

        Ok(LocalStream {
            stream_id: self.stream_id.clone(),
            tracks: vec![audio, video],
        })
    }
}

/// Devices that are never available (`--no-media`)
pub struct NoMediaDevices;

#[async_trait]
impl MediaDevices for NoMediaDevices {
    async fn acquire(&self) -> Result<LocalStream, PeerError> {
        Err(PeerError::MediaUnavailable(
            "no capture device configured".to_string(),
        ))
    }
}

/// Write `payload` to the track every `interval` until the track is dropped
fn spawn_pump(track: &Arc<TrackLocalStaticSample>, payload: &'static [u8], interval: Duration) {
    let track = Arc::downgrade(track);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let Some(track) = track.upgrade() else {
                break;
            };
            let sample = Sample {
                data: payload.to_vec().into(),
                duration: interval,
                ..Default::default()
            };
            if let Err(e) = track.write_sample(&sample).await {
                tracing::trace!("Failed to write sample: {}", e);
            }
        }
    });
}

pub struct WebRtcPeerFactory {
    api: API,
    config: RTCConfiguration,
    local: Option<LocalStream>,
}

impl WebRtcPeerFactory {
    /// Build the factory.
    ///
    /// # Arguments
    ///
    /// * `config` - ICE configuration
    /// * `local` - Local media to attach, `None` to only receive
    pub fn new(config: PeerConfig, local: Option<LocalStream>) -> Result<Self, PeerError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let mut setting_engine = SettingEngine::default();
        if config.include_loopback {
            setting_engine.set_include_loopback_candidate(true);
            setting_engine.set_network_types(vec![NetworkType::Udp4]);
        }

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers,
                ..Default::default()
            }]
        };

        Ok(Self {
            api,
            config: RTCConfiguration {
                ice_servers,
                ..Default::default()
            },
            local,
        })
    }
}

#[async_trait]
impl PeerConnectionFactory for WebRtcPeerFactory {
    async fn create(
        &self,
        remote: &str,
        events: UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>, PeerError> {
        let pc = Arc::new(self.api.new_peer_connection(self.config.clone()).await?);

        match &self.local {
            Some(stream) => {
                for track in &stream.tracks {
                    let track: Arc<dyn TrackLocal + Send + Sync> = track.clone();
                    let rtp_sender = pc.add_track(track).await?;
                    tokio::spawn(async move {
                        let mut rtcp_buf = vec![0u8; 1500];
                        while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
                    });
                }
            }
            None => {
                for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                    pc.add_transceiver_from_kind(
                        kind,
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Recvonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
                }
            }
        }

        register_callbacks(&pc, remote, events);
        Ok(Arc::new(WebRtcPeer { pc }))
    }
}

fn register_callbacks(pc: &Arc<RTCPeerConnection>, remote: &str, events: UnboundedSender<PeerEvent>) {
    {
        let tx = events.clone();
        let peer = remote.to_string();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = tx.clone();
            let peer = peer.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else {
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => {
                        let _ = tx.send(PeerEvent::LocalCandidate {
                            peer,
                            candidate: candidate_to_json(&init),
                        });
                    }
                    Err(e) => tracing::warn!("Failed to encode local candidate: {}", e),
                }
            })
        }));
    }
    {
        let tx = events.clone();
        let peer = remote.to_string();
        pc.on_track(Box::new(move |track: Arc<TrackRemote>, _receiver, _transceiver| {
            let tx = tx.clone();
            let peer = peer.clone();
            Box::pin(async move {
                let _ = tx.send(PeerEvent::RemoteTrack {
                    peer,
                    kind: track.kind().to_string(),
                    track_id: track.id(),
                });
                // Drain so the interceptors keep running; rendering is out of band
                tokio::spawn(async move { while track.read_rtp().await.is_ok() {} });
            })
        }));
    }
    {
        let peer = remote.to_string();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let _ = events.send(PeerEvent::StateChanged {
                peer: peer.clone(),
                state: state.to_string(),
            });
            Box::pin(async {})
        }));
    }
}

/// One webrtc-rs peer connection
pub struct WebRtcPeer {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerConnection for WebRtcPeer {
    async fn create_offer(&self) -> Result<Value, PeerError> {
        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer.clone()).await?;
        Ok(description_to_json(&offer))
    }

    async fn accept_offer(&self, offer: Value) -> Result<Value, PeerError> {
        let offer = description_from_json(&offer, RTCSdpType::Offer)?;
        self.pc.set_remote_description(offer).await?;
        let answer = self.pc.create_answer(None).await?;
        self.pc.set_local_description(answer.clone()).await?;
        Ok(description_to_json(&answer))
    }

    async fn accept_answer(&self, answer: Value) -> Result<(), PeerError> {
        let answer = description_from_json(&answer, RTCSdpType::Answer)?;
        self.pc.set_remote_description(answer).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), PeerError> {
        self.pc
            .add_ice_candidate(candidate_from_json(&candidate)?)
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.pc.close().await?;
        Ok(())
    }
}

fn description_to_json(description: &RTCSessionDescription) -> Value {
    json!({
        "type": description.sdp_type.to_string(),
        "sdp": description.sdp,
    })
}

fn description_from_json(
    value: &Value,
    expected: RTCSdpType,
) -> Result<RTCSessionDescription, PeerError> {
    let sdp = value
        .get("sdp")
        .and_then(Value::as_str)
        .ok_or_else(|| PeerError::InvalidPayload("missing sdp".to_string()))?
        .to_string();
    if let Some(kind) = value.get("type").and_then(Value::as_str)
        && kind != expected.to_string()
    {
        return Err(PeerError::InvalidPayload(format!(
            "expected {} but got {}",
            expected, kind
        )));
    }
    let description = match expected {
        RTCSdpType::Answer => RTCSessionDescription::answer(sdp)?,
        _ => RTCSessionDescription::offer(sdp)?,
    };
    Ok(description)
}

fn candidate_to_json(init: &RTCIceCandidateInit) -> Value {
    json!({
        "candidate": init.candidate,
        "sdpMid": init.sdp_mid,
        "sdpMLineIndex": init.sdp_mline_index,
        "usernameFragment": init.username_fragment,
    })
}

fn candidate_from_json(value: &Value) -> Result<RTCIceCandidateInit, PeerError> {
    let candidate = value
        .get("candidate")
        .and_then(Value::as_str)
        .ok_or_else(|| PeerError::InvalidPayload("missing candidate".to_string()))?;
    let sdp_mline_index = value
        .get("sdpMLineIndex")
        .or_else(|| value.get("sdpMlineIndex"))
        .and_then(Value::as_u64)
        .and_then(|i| u16::try_from(i).ok());
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(RTCIceCandidateInit {
        candidate: candidate.to_string(),
        sdp_mid: text("sdpMid"),
        sdp_mline_index,
        username_fragment: text("usernameFragment"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_browser_candidate_is_parsed() {
        // テスト項目: ブラウザ形式の ICE 候補 (sdpMLineIndex) を解釈できる
        // given (前提条件):
        let value = json!({
            "candidate": "candidate:1 1 udp 2122260223 127.0.0.1 50000 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0
        });

        // when (操作):
        let init = candidate_from_json(&value).unwrap();

        // then (期待する結果):
        assert_eq!(init.sdp_mid.as_deref(), Some("0"));
        assert_eq!(init.sdp_mline_index, Some(0));
        assert_eq!(candidate_to_json(&init)["sdpMLineIndex"], json!(0));
    }

    #[test]
    fn test_candidate_without_text_is_rejected() {
        // テスト項目: candidate フィールドの無い ICE 候補は InvalidPayload になる
        // given (前提条件):
        let value = json!({"sdpMid": "0"});

        // when (操作):
        let result = candidate_from_json(&value);

        // then (期待する結果):
        assert!(matches!(result, Err(PeerError::InvalidPayload(_))));
    }

    #[test]
    fn test_answer_in_place_of_offer_is_rejected() {
        // テスト項目: offer を期待している所に answer が来たら InvalidPayload になる
        // given (前提条件):
        let value = json!({"type": "answer", "sdp": "v=0\r\n"});

        // when (操作):
        let result = description_from_json(&value, RTCSdpType::Offer);

        // then (期待する結果):
        assert!(matches!(result, Err(PeerError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_no_media_devices_fail_acquisition() {
        // テスト項目: --no-media ではメディア取得が MediaUnavailable で失敗する
        // given (前提条件):
        let devices = NoMediaDevices;

        // when (操作):
        let result = devices.acquire().await;

        // then (期待する結果):
        assert!(matches!(result, Err(PeerError::MediaUnavailable(_))));
    }

    #[tokio::test]
    async fn test_offer_without_local_media_still_receives() {
        // テスト項目: ローカルメディアが無くても音声・映像を受信する offer が作られる
        // given (前提条件):
        let factory = WebRtcPeerFactory::new(PeerConfig::local(), None).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let peer = factory.create("bob", tx).await.unwrap();

        // when (操作):
        let offer = peer.create_offer().await.unwrap();

        // then (期待する結果):
        let sdp = offer["sdp"].as_str().unwrap();
        assert_eq!(offer["type"], "offer");
        assert!(sdp.contains("m=audio"));
        assert!(sdp.contains("m=video"));
        assert!(sdp.contains("a=recvonly"));
        peer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_offer_with_synthetic_media_sends() {
        // テスト項目: 合成メディアを付けた接続の offer は送受信 (sendrecv) になる
        // given (前提条件):
        let stream = SyntheticMediaDevices::new("alice").acquire().await.unwrap();
        let factory = WebRtcPeerFactory::new(PeerConfig::local(), Some(stream)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let peer = factory.create("bob", tx).await.unwrap();

        // when (操作):
        let offer = peer.create_offer().await.unwrap();

        // then (期待する結果):
        let sdp = offer["sdp"].as_str().unwrap();
        assert!(sdp.contains("a=sendrecv"));
        assert!(sdp.contains("opus"));
        assert!(sdp.contains("VP8"));
        peer.close().await.unwrap();
    }
}
