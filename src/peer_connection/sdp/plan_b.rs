use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sdp::description::media::MediaDescription;
use sdp::description::session::SessionDescription;

use super::sdp_strategy::{LocalDescriptionParams, SdpStrategy, StrategyContext};
use super::track_ssrc_index::TrackSsrcIndex;
use super::*;
use crate::api::media_engine::{negotiate, NegotiatedMedia};
use crate::error::{flatten_errs, Error, Result};
use crate::peer::Transport;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::rtp_sender::RtpSender;
use crate::rtp_transceiver::{RTCRtpTransceiver, TransceiverRegistry};

pub(crate) const PLAN_B_AUDIO_MID: &str = "audio-tracks";
pub(crate) const PLAN_B_VIDEO_MID: &str = "video-tracks";

/// PlanB renders one `m=` line per media kind. Every track of that kind is
/// multiplexed into it and told apart by SSRC.
#[derive(Default)]
pub(crate) struct PlanB {
    /// The sections; their own sender and receiver slots stay empty.
    transceivers: TransceiverRegistry,
    /// Remote tracks of each section, by mid.
    tracks: HashMap<String, TrackSsrcIndex>,
    /// Senders of the peer as of the last offer.
    senders: Vec<Arc<dyn RtpSender>>,
}

impl PlanB {
    pub(crate) fn new() -> Self {
        PlanB::default()
    }

    fn active_senders(&self, kind: RTPCodecType) -> impl Iterator<Item = &Arc<dyn RtpSender>> {
        self.senders
            .iter()
            .filter(move |s| s.kind() == kind && !s.closed() && s.active())
    }
}

/// sync_tracks brings `index` in line with the streams `media` announces:
/// vanished tracks have their receiver closed, new ones get a receiver.
async fn sync_tracks(
    index: &mut TrackSsrcIndex,
    media: &MediaDescription,
    t: &RTCRtpTransceiver,
    negotiated: &NegotiatedMedia,
    ctx: &StrategyContext<'_>,
) -> Result<()> {
    index.prune_closed();

    let streams = if get_peer_direction(media).has_send() {
        remote_streams_from_media(media)?
    } else {
        vec![]
    };
    let diff = index.diff(&streams);

    for track_id in diff.removed {
        if let Some(entry) = index.remove(&track_id) {
            log::debug!("remote track {track_id} gone, closing receiver");
            if !entry.receiver.closed() {
                entry.receiver.close().await?;
            }
        }
    }

    for stream in diff.added {
        let receiver = ctx
            .start_receiver(
                t.kind(),
                t.transport(),
                negotiated.stream_parameters(t.mid(), stream),
            )
            .await?;
        index.insert(stream.track_id.clone(), receiver, stream.ssrcs());
    }

    Ok(())
}

/// close_tracks closes the receiver of every track in `index`, going on
/// past failures.
async fn close_tracks(index: Option<&mut TrackSsrcIndex>) -> Result<()> {
    let mut errs = vec![];
    if let Some(index) = index {
        for entry in index.drain() {
            if !entry.receiver.closed() {
                if let Err(err) = entry.receiver.close().await {
                    errs.push(err);
                }
            }
        }
    }
    flatten_errs(errs)
}

/// negotiate_section is the Plan B take on per section negotiation: a
/// section without common codec or with an unpaired RTX is closed.
fn negotiate_section(
    media: &MediaDescription,
    ctx: &StrategyContext<'_>,
) -> Result<Option<NegotiatedMedia>> {
    match negotiate(media, ctx.media_engine.capabilities()) {
        Ok(negotiated) if negotiated.is_empty() => Ok(None),
        Ok(negotiated) => Ok(Some(negotiated)),
        Err(Error::ErrRtxCodecWithoutApt) => {
            log::warn!("rtx codec without apt in section mid={:?}", get_mid_value(media));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[async_trait]
impl SdpStrategy for PlanB {
    fn transceivers(&self) -> &TransceiverRegistry {
        &self.transceivers
    }

    async fn prepare_offer(&mut self, ctx: &StrategyContext<'_>) -> Result<()> {
        if self.transceivers.is_empty() {
            let capabilities = ctx.capabilities();
            for (mid, kind) in [
                (PLAN_B_AUDIO_MID, RTPCodecType::Audio),
                (PLAN_B_VIDEO_MID, RTPCodecType::Video),
            ] {
                self.transceivers.push(RTCRtpTransceiver::new_recv_slot(
                    mid,
                    kind,
                    Some(capabilities.clone()),
                    Some(Arc::clone(ctx.transport)),
                ))?;
            }
        }

        self.senders = ctx.peer.rtp_senders();
        for sender in &self.senders {
            if !sender.closed() && !sender.has_transport() {
                sender.set_transport(Arc::clone(ctx.transport)).await?;
            }
        }

        Ok(())
    }

    fn to_local_description(
        &self,
        params: &mut LocalDescriptionParams<'_>,
    ) -> Result<SessionDescription> {
        let mut medias = Vec::with_capacity(self.transceivers.len());

        for t in self.transceivers.iter() {
            if t.is_closed() {
                medias.push(closed_media_section(t.media(), t.mid()));
                continue;
            }

            let (codecs, header_extensions) = match (t.negotiated(), t.capabilities()) {
                (Some(n), _) => (n.codecs.clone(), n.header_extensions.clone()),
                (None, Some(c)) => (
                    capability_codecs(c, t.kind()),
                    capability_header_extensions(c, t.kind()),
                ),
                (None, None) => (vec![], vec![]),
            };
            if codecs.is_empty() {
                log::warn!("no codec for {} section mid={}, section closed", t.media(), t.mid());
                medias.push(closed_media_section(t.media(), t.mid()));
                continue;
            }

            // Answers never list senders: they are offered afterwards.
            let senders: Vec<&Arc<dyn RtpSender>> = match params.sdp_type {
                RTCSdpType::Answer => vec![],
                _ => self.active_senders(t.kind()).collect(),
            };
            let direction = RTCRtpTransceiverDirection::from_send_recv(
                !senders.is_empty(),
                t.direction().has_recv(),
            );

            let mut m = params.section(t, direction, &codecs, &header_extensions)?;
            for sender in senders {
                let p = sender.rtp_parameters();
                let msid = p
                    .user_parameters
                    .msid
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", sender.id(), sender.id()));
                m = add_sender_ssrcs(m, &p, &msid, true);
            }

            medias.push(m);
        }

        let mut d = params.session(&bundle_mids(&medias))?;
        d.media_descriptions = medias;
        Ok(d)
    }

    async fn apply_remote_offer(
        &mut self,
        parsed: &SessionDescription,
        ctx: &StrategyContext<'_>,
    ) -> Result<()> {
        if !self.transceivers.is_empty() {
            return Err(Error::ErrRenegotiationNotImplemented);
        }

        for media in &parsed.media_descriptions {
            let kind = get_media_kind(media);
            let mid = match get_mid_value(media) {
                Some(mid) => mid.to_owned(),
                None if kind != RTPCodecType::Unspecified => kind.to_string(),
                None => self.transceivers.next_mid(),
            };

            let negotiated = if kind == RTPCodecType::Unspecified || media.media_name.port.value == 0
            {
                None
            } else {
                negotiate_section(media, ctx)?
            };
            let Some(negotiated) = negotiated else {
                self.transceivers
                    .push(RTCRtpTransceiver::new_placeholder(&mid, &media.media_name.media))?;
                continue;
            };

            let transport: Arc<dyn Transport> = Arc::clone(ctx.transport);
            let mut t = if get_peer_direction(media).has_send() {
                RTCRtpTransceiver::new_recv_slot(&mid, kind, None, Some(transport))
            } else {
                let mut t = RTCRtpTransceiver::new_section(&mid, kind);
                t.set_transport(Some(transport));
                t
            };
            t.set_capabilities(Some(ctx.capabilities()));
            t.set_negotiated(negotiated.rtp_parameters(&mid));

            let index = self.tracks.entry(mid.clone()).or_default();
            sync_tracks(index, media, &t, &negotiated, ctx).await?;

            self.transceivers.push(t)?;
        }

        Ok(())
    }

    async fn apply_remote_answer(
        &mut self,
        parsed: &SessionDescription,
        ctx: &StrategyContext<'_>,
    ) -> Result<()> {
        let mut stop_errs = vec![];
        for media in &parsed.media_descriptions {
            let Some(mid) = get_mid_value(media) else {
                log::warn!("ignoring {} answer section without mid", media.media_name.media);
                continue;
            };
            let Some(t) = self.transceivers.find_by_mid_mut(mid) else {
                log::warn!("ignoring answer section with unknown mid={mid}");
                continue;
            };
            if t.is_closed() {
                continue;
            }

            let negotiated = if media.media_name.port.value == 0 {
                None
            } else {
                negotiate_section(media, ctx)?
            };
            let Some(negotiated) = negotiated else {
                log::debug!("closing section mid={mid}");
                if let Err(err) = close_tracks(self.tracks.get_mut(mid)).await {
                    stop_errs.push(err);
                }
                if let Err(err) = t.stop().await {
                    stop_errs.push(err);
                }
                continue;
            };
            t.set_negotiated(negotiated.rtp_parameters(mid));

            let index = self.tracks.entry(mid.to_owned()).or_default();
            sync_tracks(index, media, t, &negotiated, ctx).await?;
        }

        flatten_errs(stop_errs)
    }

    async fn close(&mut self) -> Result<()> {
        let mut errs = vec![];
        for index in self.tracks.values_mut() {
            if let Err(err) = close_tracks(Some(index)).await {
                errs.push(err);
            }
        }
        if let Err(err) = self.transceivers.stop_all().await {
            errs.push(err);
        }
        self.senders.clear();
        flatten_errs(errs)
    }
}
