use std::sync::Arc;

use async_trait::async_trait;
use sdp::description::media::MediaDescription;
use sdp::description::session::{Origin, SessionDescription};
use sdp::util::ConnectionRole;

use super::*;
use crate::api::media_engine::MediaEngine;
use crate::error::{Error, Result};
use crate::peer::{Peer, Transport};
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::policy::sdp_semantics::RTCSdpSemantics;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::rtp_transceiver::rtp_codec::{
    RTCRtpCapabilities, RTCRtpCodecParameters, RTCRtpHeaderExtensionParameters, RTCRtpParameters,
    RTPCodecType,
};
use crate::rtp_transceiver::rtp_receiver::RtpReceiver;
use crate::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::{RTCRtpTransceiver, TransceiverRegistry};

/// StrategyContext is what a strategy may reach while it reconciles state.
pub(crate) struct StrategyContext<'a> {
    pub(crate) peer: &'a Arc<dyn Peer>,
    pub(crate) transport: &'a Arc<dyn Transport>,
    pub(crate) media_engine: &'a MediaEngine,
    pub(crate) configuration: &'a RTCConfiguration,
}

impl StrategyContext<'_> {
    /// capabilities returns the peer's effective capabilities, falling back
    /// to the media engine's before they were set.
    pub(crate) fn capabilities(&self) -> RTCRtpCapabilities {
        self.peer
            .capabilities()
            .unwrap_or_else(|| self.media_engine.capabilities().clone())
    }

    /// start_receiver creates a receiver on the peer and hands it the
    /// parameters the remote side sends with.
    pub(crate) async fn start_receiver(
        &self,
        kind: RTPCodecType,
        transport: Option<&Arc<dyn Transport>>,
        parameters: RTCRtpParameters,
    ) -> Result<Arc<dyn RtpReceiver>> {
        let transport = Arc::clone(transport.unwrap_or(self.transport));
        let receiver = self.peer.new_rtp_receiver(kind, transport)?;
        log::debug!(
            "starting receiver {} mid={} ssrcs={:?}",
            receiver.id(),
            parameters.mid,
            parameters.encodings.iter().filter_map(|e| e.ssrc).collect::<Vec<_>>()
        );
        receiver.receive(parameters).await?;
        Ok(receiver)
    }
}

pub(crate) struct LocalDescriptionParams<'a> {
    pub(crate) sdp_type: RTCSdpType,
    pub(crate) origin: &'a Origin,
    pub(crate) transport: &'a Arc<dyn Transport>,
    pub(crate) configuration: &'a RTCConfiguration,
    pub(crate) ports: &'a mut FakePortGenerator,
}

impl LocalDescriptionParams<'_> {
    /// setup is `actpass` on offers; answers mirror the transport's role.
    pub(crate) fn setup(&self) -> ConnectionRole {
        match self.sdp_type {
            RTCSdpType::Offer => ConnectionRole::Actpass,
            _ => self.transport.dtls_local_parameters().role.answer_setup(),
        }
    }

    /// session starts a description bundling `bundle_mids`.
    pub(crate) fn session(&self, bundle_mids: &[String]) -> Result<SessionDescription> {
        let dtls = self.transport.dtls_local_parameters();
        let fingerprint = dtls
            .fingerprint("sha-256")
            .or_else(|| dtls.fingerprints.first())
            .ok_or(Error::ErrNoLocalFingerprint)?;

        Ok(new_session_description(self.origin, bundle_mids, fingerprint))
    }

    /// section renders one open `m=` line for `t`, taking the next fake port.
    pub(crate) fn section(
        &mut self,
        t: &RTCRtpTransceiver,
        direction: RTCRtpTransceiverDirection,
        codecs: &[RTCRtpCodecParameters],
        header_extensions: &[RTCRtpHeaderExtensionParameters],
    ) -> Result<MediaDescription> {
        let ice_parameters = self.transport.ice_local_parameters();
        let candidates = self.transport.ice_local_candidates();

        media_section(&MediaSectionParams {
            media: t.media(),
            mid: t.mid(),
            port: self.ports.next_port(),
            direction,
            setup: self.setup(),
            bandwidth: self.configuration.bandwidth.for_kind(t.kind()),
            codecs,
            header_extensions,
            ice_parameters: &ice_parameters,
            candidates: &candidates,
        })
    }
}

/// SdpStrategy is one SDP dialect. A connection picks its strategy once,
/// from the configured semantics, and delegates every text to structure
/// conversion to it.
#[async_trait]
pub(crate) trait SdpStrategy: Send + Sync {
    fn transceivers(&self) -> &TransceiverRegistry;

    /// to_capabilities extracts the codec and header extension universe a
    /// remote description advertises.
    fn to_capabilities(&self, parsed: &SessionDescription) -> Result<RTCRtpCapabilities> {
        desc_to_capabilities(parsed)
    }

    /// prepare_offer brings the sections up to date with the peer's senders
    /// before a local offer is rendered.
    async fn prepare_offer(&mut self, ctx: &StrategyContext<'_>) -> Result<()>;

    fn to_local_description(
        &self,
        params: &mut LocalDescriptionParams<'_>,
    ) -> Result<SessionDescription>;

    async fn apply_remote_offer(
        &mut self,
        parsed: &SessionDescription,
        ctx: &StrategyContext<'_>,
    ) -> Result<()>;

    async fn apply_remote_answer(
        &mut self,
        parsed: &SessionDescription,
        ctx: &StrategyContext<'_>,
    ) -> Result<()>;

    /// close stops every section, closing their senders and receivers.
    async fn close(&mut self) -> Result<()>;
}

/// new_sdp_strategy returns the strategy implementing the given semantics.
pub(crate) fn new_sdp_strategy(semantics: RTCSdpSemantics) -> Result<Box<dyn SdpStrategy>> {
    match semantics {
        RTCSdpSemantics::UnifiedPlan => Ok(Box::new(super::unified_plan::UnifiedPlan::new())),
        RTCSdpSemantics::PlanB => Ok(Box::new(super::plan_b::PlanB::new())),
        RTCSdpSemantics::Unspecified => Err(Error::ErrOthers(format!(
            "unsupported sdp semantics {semantics}"
        ))),
    }
}
