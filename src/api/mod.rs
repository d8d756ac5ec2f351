
pub mod media_engine;
pub mod setting_engine;

use std::sync::Arc;

use media_engine::*;
use setting_engine::*;

use crate::error::Result;
use crate::peer::Room;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::RTCPeerConnection;

/// API bundles what every connection of an SFU shares: the codecs and
/// header extensions it supports and its tunables.
pub struct API {
    pub(crate) setting_engine: Arc<SettingEngine>,
    pub(crate) media_engine: Arc<MediaEngine>,
}

impl API {
    /// new_peer_connection creates a connection for the peer `peer_name` of
    /// `room`. The peer itself is only created by the first offer, local or
    /// remote.
    pub async fn new_peer_connection(
        &self,
        configuration: RTCConfiguration,
        room: Arc<dyn Room>,
        peer_name: &str,
    ) -> Result<RTCPeerConnection> {
        RTCPeerConnection::new(self, configuration, room, peer_name).await
    }

    pub fn media_engine(&self) -> &MediaEngine {
        &self.media_engine
    }

    pub fn setting_engine(&self) -> &SettingEngine {
        &self.setting_engine
    }
}

#[derive(Default)]
pub struct APIBuilder {
    setting_engine: Option<Arc<SettingEngine>>,
    media_engine: Option<Arc<MediaEngine>>,
}

impl APIBuilder {
    pub fn new() -> Self {
        APIBuilder::default()
    }

    pub fn build(mut self) -> API {
        API {
            setting_engine: if let Some(setting_engine) = self.setting_engine.take() {
                setting_engine
            } else {
                Arc::new(SettingEngine::default())
            },
            media_engine: if let Some(media_engine) = self.media_engine.take() {
                media_engine
            } else {
                Arc::new(MediaEngine::default())
            },
        }
    }

    /// WithSettingEngine allows providing a SettingEngine to the API.
    /// Settings should not be changed after passing the engine to an API.
    pub fn with_setting_engine(mut self, setting_engine: SettingEngine) -> Self {
        self.setting_engine = Some(Arc::new(setting_engine));
        self
    }

    /// WithMediaEngine allows providing a MediaEngine to the API.
    /// Its capabilities are the reference every remote description is
    /// negotiated against.
    pub fn with_media_engine(mut self, media_engine: MediaEngine) -> Self {
        self.media_engine = Some(Arc::new(media_engine));
        self
    }
}
