use std::sync::Arc;

use async_trait::async_trait;
use sdp::description::media::MediaDescription;
use sdp::description::session::SessionDescription;

use super::sdp_strategy::{LocalDescriptionParams, SdpStrategy, StrategyContext};
use super::*;
use crate::api::media_engine::{negotiate, NegotiatedMedia};
use crate::error::{flatten_errs, Error, Result};
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::rtp_transceiver::rtp_codec::RTPCodecType;
use crate::rtp_transceiver::{RTCRtpTransceiver, TransceiverRegistry};

/// UnifiedPlan renders one `m=` line per transceiver. Sections are matched
/// with the remote side by mid and never move once created.
#[derive(Default)]
pub(crate) struct UnifiedPlan {
    transceivers: TransceiverRegistry,
}

impl UnifiedPlan {
    pub(crate) fn new() -> Self {
        UnifiedPlan::default()
    }

    /// add_receive_slots creates the recv-only sections of a first offer.
    fn add_receive_slots(&mut self, ctx: &StrategyContext<'_>) -> Result<()> {
        let capabilities = ctx.capabilities();
        let slots = [
            (RTPCodecType::Audio, ctx.configuration.audio_receive_slots),
            (RTPCodecType::Video, ctx.configuration.video_receive_slots),
        ];

        for (kind, count) in slots {
            for _ in 0..count {
                let mid = self.transceivers.next_mid();
                log::debug!("adding {kind} receive slot mid={mid}");
                self.transceivers.push(RTCRtpTransceiver::new_recv_slot(
                    &mid,
                    kind,
                    Some(capabilities.clone()),
                    Some(Arc::clone(ctx.transport)),
                ))?;
            }
        }

        Ok(())
    }
}

/// negotiate_section runs the negotiation of one remote section. A section
/// that cannot be negotiated is reported as None.
fn negotiate_section(
    media: &MediaDescription,
    ctx: &StrategyContext<'_>,
) -> Result<Option<NegotiatedMedia>> {
    match negotiate(media, ctx.media_engine.capabilities()) {
        Ok(negotiated) if negotiated.is_empty() => {
            log::warn!(
                "no compatible codec in {} section mid={:?}",
                media.media_name.media,
                get_mid_value(media)
            );
            Ok(None)
        }
        Ok(negotiated) => Ok(Some(negotiated)),
        Err(Error::ErrRtxCodecWithoutApt) => {
            log::warn!(
                "rtx codec without apt in section mid={:?}, section closed",
                get_mid_value(media)
            );
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// receive_parameters picks the parameters a receiver for `media` starts
/// with: those of its first remote stream when it announces any.
fn receive_parameters(
    media: &MediaDescription,
    mid: &str,
    negotiated: &NegotiatedMedia,
) -> Result<RTCRtpParameters> {
    let streams = remote_streams_from_media(media)?;
    Ok(match streams.first() {
        Some(stream) => negotiated.stream_parameters(mid, stream),
        None => negotiated.rtp_parameters(mid),
    })
}

#[async_trait]
impl SdpStrategy for UnifiedPlan {
    fn transceivers(&self) -> &TransceiverRegistry {
        &self.transceivers
    }

    async fn prepare_offer(&mut self, ctx: &StrategyContext<'_>) -> Result<()> {
        if self.transceivers.is_empty() {
            self.add_receive_slots(ctx)?;
        }

        let capabilities = ctx.capabilities();
        for sender in ctx.peer.rtp_senders() {
            if sender.closed() || self.transceivers.has_sender(&sender.id()) {
                continue;
            }
            if !sender.has_transport() {
                sender.set_transport(Arc::clone(ctx.transport)).await?;
            }

            let mid = self.transceivers.next_mid();
            log::debug!("adding {} sender {} mid={mid}", sender.kind(), sender.id());
            self.transceivers.push(RTCRtpTransceiver::new_with_sender(
                &mid,
                sender,
                Some(capabilities.clone()),
                Some(Arc::clone(ctx.transport)),
            ))?;
        }

        self.transceivers.stop_closed().await
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

            let sender_parameters = t.sender().map(|s| s.rtp_parameters());
            let (codecs, header_extensions) = match (t.negotiated(), &sender_parameters) {
                (Some(n), _) if params.sdp_type == RTCSdpType::Answer => {
                    (n.codecs.clone(), n.header_extensions.clone())
                }
                (_, Some(p)) => (p.codecs.clone(), p.header_extensions.clone()),
                (Some(n), None) => (n.codecs.clone(), n.header_extensions.clone()),
                (None, None) => match t.capabilities() {
                    Some(c) => (
                        capability_codecs(c, t.kind()),
                        capability_header_extensions(c, t.kind()),
                    ),
                    None => (vec![], vec![]),
                },
            };

            if codecs.is_empty() {
                log::warn!("no codec for {} section mid={}, section closed", t.media(), t.mid());
                medias.push(closed_media_section(t.media(), t.mid()));
                continue;
            }

            let direction = t.direction();
            let mut m = params.section(t, direction, &codecs, &header_extensions)?;

            if let (Some(sender), Some(p)) = (t.sender(), &sender_parameters) {
                if direction.has_send() {
                    let msid = p
                        .user_parameters
                        .msid
                        .clone()
                        .unwrap_or_else(|| format!("{} {}", sender.id(), sender.id()));
                    m = add_sender_ssrcs(m, p, &msid, false);
                }
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
            let mid = match get_mid_value(media) {
                Some(mid) => mid.to_owned(),
                None => {
                    return Err(Error::ErrInvalidSdp(format!(
                        "{} section without mid",
                        media.media_name.media
                    )))
                }
            };

            let kind = get_media_kind(media);
            let negotiated = if kind == RTPCodecType::Unspecified || media.media_name.port.value == 0
            {
                None
            } else {
                negotiate_section(media, ctx)?
            };
            let Some(negotiated) = negotiated else {
                log::debug!("answering {} section mid={mid} closed", media.media_name.media);
                self.transceivers
                    .push(RTCRtpTransceiver::new_placeholder(&mid, &media.media_name.media))?;
                continue;
            };

            let mut t = RTCRtpTransceiver::new_section(&mid, kind);
            t.set_capabilities(Some(ctx.capabilities()));
            t.set_transport(Some(Arc::clone(ctx.transport)));
            t.set_negotiated(negotiated.rtp_parameters(&mid));

            if get_peer_direction(media).has_send() {
                let receiver = ctx
                    .start_receiver(
                        kind,
                        t.transport(),
                        receive_parameters(media, &mid, &negotiated)?,
                    )
                    .await?;
                t.attach_receiver(receiver)?;
            }

            self.transceivers.push(t)?;
        }

        Ok(())
    }

    async fn apply_remote_answer(
        &mut self,
        parsed: &SessionDescription,
        ctx: &StrategyContext<'_>,
    ) -> Result<()> {
        // A section failing to stop does not keep the others from being
        // negotiated.
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

            if media.media_name.port.value == 0 {
                log::debug!("remote rejected section mid={mid}");
                if let Err(err) = t.stop().await {
                    stop_errs.push(err);
                }
                continue;
            }

            let Some(negotiated) = negotiate_section(media, ctx)? else {
                if let Err(err) = t.stop().await {
                    stop_errs.push(err);
                }
                continue;
            };
            t.set_negotiated(negotiated.rtp_parameters(mid));

            if t.sender().is_none() && t.receiver().is_none() && get_peer_direction(media).has_send()
            {
                let receiver = ctx
                    .start_receiver(
                        t.kind(),
                        t.transport(),
                        receive_parameters(media, mid, &negotiated)?,
                    )
                    .await?;
                t.attach_receiver(receiver)?;
            }
        }

        flatten_errs(stop_errs)
    }

    async fn close(&mut self) -> Result<()> {
        self.transceivers.stop_all().await
    }
}
