use std::collections::HashSet;
use std::sync::{Mutex as SyncMutex, PoisonError};

use rand::Rng;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::*;
use crate::error::flatten_errs;
use crate::peer::PeerEvent;
use crate::peer_connection::negotiation::{self, NegotiationGate, NegotiationScheduler};
use crate::peer_connection::sdp::sdp_strategy::{
    new_sdp_strategy, LocalDescriptionParams, SdpStrategy, StrategyContext,
};
use crate::peer_connection::sdp::{extract_remote_dtls_parameters, FakePortGenerator};
use crate::rtp_transceiver::rtp_sender::{RTCRtpSenderEvent, RtpSender};

/// SessionState is everything an offer/answer round reads and rewrites.
/// It is only touched by the operation holding the busy flag, or by close.
pub(super) struct SessionState {
    pub(super) strategy: Box<dyn SdpStrategy>,
    pub(super) peer: Option<Arc<dyn Peer>>,
    pub(super) transport: Option<Arc<dyn Transport>>,
    /// Remote DTLS parameters are handed to the transport once.
    pub(super) remote_dtls_applied: bool,
    pub(super) origin: Origin,
    pub(super) ports: FakePortGenerator,
}

/// BusyGuard releases the busy flag on every exit path of an operation.
pub(super) struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// new_session_id returns a random session id below 2^63.
fn new_session_id() -> u64 {
    let c = u64::MAX ^ (1u64 << 63);
    rand::rng().random::<u64>() & c
}

pub(crate) struct PeerConnectionInternal {
    pub(super) configuration: RTCConfiguration,
    pub(super) media_engine: Arc<MediaEngine>,
    pub(super) room: Arc<dyn Room>,
    pub(super) peer_name: String,

    pub(super) signaling_state: AtomicU8,
    pub(super) is_closed: AtomicBool,
    is_busy: AtomicBool,
    close_emitted: AtomicBool,
    scheduler: NegotiationScheduler,

    pub(super) session: Mutex<SessionState>,
    pub(super) local_description: Mutex<Option<RTCSessionDescription>>,
    pub(super) remote_description: Mutex<Option<RTCSessionDescription>>,

    pub(super) on_signaling_state_change_handler:
        ArcSwapOption<Mutex<OnSignalingStateChangeHdlrFn>>,
    pub(super) on_negotiation_needed_handler: ArcSwapOption<Mutex<OnNegotiationNeededHdlrFn>>,
    pub(super) on_close_handler: ArcSwapOption<Mutex<OnCloseHdlrFn>>,

    /// Tasks relaying peer and sender events.
    watchers: SyncMutex<Vec<JoinHandle<()>>>,
    watched_senders: SyncMutex<HashSet<String>>,
}

impl PeerConnectionInternal {
    pub(super) fn new(
        api: &API,
        configuration: RTCConfiguration,
        room: Arc<dyn Room>,
        peer_name: &str,
    ) -> Result<Arc<Self>> {
        let strategy = new_sdp_strategy(configuration.sdp_semantics)?;
        let (port_min, port_max) = api.setting_engine.get_fake_port_range();

        Ok(Arc::new(PeerConnectionInternal {
            media_engine: Arc::clone(&api.media_engine),
            room,
            peer_name: peer_name.to_owned(),

            signaling_state: AtomicU8::new(RTCSignalingState::Stable as u8),
            is_closed: AtomicBool::new(false),
            is_busy: AtomicBool::new(false),
            close_emitted: AtomicBool::new(false),
            scheduler: NegotiationScheduler::new(api.setting_engine.get_negotiation_needed_delay()),

            session: Mutex::new(SessionState {
                strategy,
                peer: None,
                transport: None,
                remote_dtls_applied: false,
                origin: Origin {
                    username: api.setting_engine.get_sdp_origin_username().to_owned(),
                    session_id: new_session_id(),
                    session_version: 0,
                    network_type: "IN".to_owned(),
                    address_type: "IP4".to_owned(),
                    unicast_address: "0.0.0.0".to_owned(),
                },
                ports: FakePortGenerator::new(port_min, port_max),
            }),
            local_description: Mutex::new(None),
            remote_description: Mutex::new(None),

            on_signaling_state_change_handler: ArcSwapOption::empty(),
            on_negotiation_needed_handler: ArcSwapOption::empty(),
            on_close_handler: ArcSwapOption::empty(),

            watchers: SyncMutex::new(vec![]),
            watched_senders: SyncMutex::new(HashSet::new()),
            configuration,
        }))
    }

    pub(super) fn signaling_state(&self) -> RTCSignalingState {
        self.signaling_state.load(Ordering::SeqCst).into()
    }

    /// start_operation takes the busy flag. Only one operation may be in
    /// flight at a time; a second one is rejected rather than queued.
    pub(super) fn start_operation(&self, op: SignalingOp) -> Result<BusyGuard<'_>> {
        if self.is_closed.load(Ordering::SeqCst) {
            return Err(Error::ErrConnectionClosed);
        }
        if self
            .is_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ErrInvalidState(format!(
                "cannot {op} while another operation is in flight"
            )));
        }
        log::debug!("{op} on connection of peer {}", self.peer_name);
        Ok(BusyGuard(&self.is_busy))
    }

    pub(super) async fn set_signaling_state(&self, new_state: RTCSignalingState) {
        let old_state: RTCSignalingState = self
            .signaling_state
            .swap(new_state as u8, Ordering::SeqCst)
            .into();
        if old_state == new_state {
            return;
        }

        log::info!("signaling state changed to {new_state}");
        if let Some(handler) = &*self.on_signaling_state_change_handler.load() {
            let mut f = handler.lock().await;
            f(new_state).await;
        }
    }

    fn strategy_context<'a>(
        &'a self,
        peer: &'a Arc<dyn Peer>,
        transport: &'a Arc<dyn Transport>,
    ) -> StrategyContext<'a> {
        StrategyContext {
            peer,
            transport,
            media_engine: &self.media_engine,
            configuration: &self.configuration,
        }
    }

    /// create_peer joins the room and opens the peer's transport. Events of
    /// the peer and of its senders are relayed from then on.
    async fn create_peer(
        self: &Arc<Self>,
        session: &mut SessionState,
    ) -> Result<(Arc<dyn Peer>, Arc<dyn Transport>)> {
        log::debug!("creating peer {}", self.peer_name);
        let peer = self.room.create_peer(&self.peer_name).await?;
        let transport = match peer
            .create_transport(&self.configuration.transport_options)
            .await
        {
            Ok(transport) => transport,
            Err(err) => {
                if let Err(close_err) = peer.close().await {
                    log::warn!("failed to close peer {}: {close_err}", self.peer_name);
                }
                return Err(err);
            }
        };

        self.watch_peer(&peer);
        for sender in peer.rtp_senders() {
            self.watch_sender(sender);
        }

        session.peer = Some(Arc::clone(&peer));
        session.transport = Some(Arc::clone(&transport));
        Ok((peer, transport))
    }

    /// discard_peer undoes create_peer after the first offer, local or
    /// remote, failed, so that the next one starts from scratch.
    async fn discard_peer(&self, session: &mut SessionState) {
        self.abort_watchers();

        if let Err(err) = session.strategy.close().await {
            log::warn!("failed to close sections: {err}");
        }
        match new_sdp_strategy(self.configuration.sdp_semantics) {
            Ok(strategy) => session.strategy = strategy,
            Err(err) => log::warn!("failed to reset sdp strategy: {err}"),
        }

        if let Some(peer) = session.peer.take() {
            if let Err(err) = peer.close().await {
                log::warn!("failed to close peer {}: {err}", self.peer_name);
            }
        }
        session.transport = None;
        session.remote_dtls_applied = false;
    }

    pub(super) async fn create_offer(self: &Arc<Self>) -> Result<RTCSessionDescription> {
        check_next_signaling_state(self.signaling_state(), SignalingOp::CreateOffer)?;

        // Whatever changed so far ends up in this offer, unless it fails.
        let was_needed = self.scheduler.is_needed();
        self.scheduler.clear_needed();

        let mut session = self.session.lock().await;
        let first = session.peer.is_none();
        let result = self.build_offer(&mut session).await;
        if let Err(err) = &result {
            if was_needed {
                self.scheduler.set_needed();
            }
            if first && session.peer.is_some() {
                log::debug!("discarding peer {} after failed offer: {err}", self.peer_name);
                self.discard_peer(&mut session).await;
            }
        }
        result
    }

    async fn build_offer(
        self: &Arc<Self>,
        session: &mut SessionState,
    ) -> Result<RTCSessionDescription> {
        let existing = session.peer.clone().zip(session.transport.clone());
        let (peer, transport) = match existing {
            Some(existing) => existing,
            None => {
                let (peer, transport) = self.create_peer(session).await?;
                let capabilities = self
                    .configuration
                    .capabilities
                    .clone()
                    .unwrap_or_else(|| self.media_engine.capabilities().clone());
                peer.set_capabilities(capabilities).await?;
                (peer, transport)
            }
        };

        let SessionState {
            strategy,
            origin,
            ports,
            ..
        } = session;
        strategy
            .prepare_offer(&self.strategy_context(&peer, &transport))
            .await?;

        let mut next_origin = origin.clone();
        next_origin.session_version += 1;
        let d = strategy.to_local_description(&mut LocalDescriptionParams {
            sdp_type: RTCSdpType::Offer,
            origin: &next_origin,
            transport: &transport,
            configuration: &self.configuration,
            ports,
        })?;
        let offer = RTCSessionDescription::from_parsed(RTCSdpType::Offer, d)?;

        *origin = next_origin;
        Ok(offer)
    }

    pub(super) async fn create_answer(&self) -> Result<RTCSessionDescription> {
        check_next_signaling_state(self.signaling_state(), SignalingOp::CreateAnswer)?;

        let mut session = self.session.lock().await;
        let SessionState {
            strategy,
            transport,
            origin,
            ports,
            ..
        } = &mut *session;
        let transport = transport.as_ref().ok_or(Error::ErrNoTransport)?;

        let d = strategy.to_local_description(&mut LocalDescriptionParams {
            sdp_type: RTCSdpType::Answer,
            origin,
            transport,
            configuration: &self.configuration,
            ports,
        })?;
        RTCSessionDescription::from_parsed(RTCSdpType::Answer, d)
    }

    pub(super) async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        let next = check_next_signaling_state(
            self.signaling_state(),
            SignalingOp::SetLocal(desc.sdp_type()),
        )?;

        if self.session.lock().await.peer.is_none() {
            return Err(Error::ErrNoPeer);
        }

        *self.local_description.lock().await = Some(desc);
        self.set_signaling_state(next).await;
        Ok(())
    }

    pub(super) async fn set_remote_description(
        self: &Arc<Self>,
        desc: RTCSessionDescription,
    ) -> Result<()> {
        let next = check_next_signaling_state(
            self.signaling_state(),
            SignalingOp::SetRemote(desc.sdp_type()),
        )?;

        {
            let mut session = self.session.lock().await;
            match desc.sdp_type() {
                RTCSdpType::Offer => {
                    if session.peer.is_some() {
                        return Err(Error::ErrRenegotiationNotImplemented);
                    }
                    if let Err(err) = self.apply_remote_offer(&mut session, desc.parsed()).await {
                        self.discard_peer(&mut session).await;
                        return Err(err);
                    }
                }
                _ => self.apply_remote_answer(&mut session, desc.parsed()).await?,
            }
        }

        *self.remote_description.lock().await = Some(desc);
        self.set_signaling_state(next).await;
        Ok(())
    }

    async fn apply_remote_offer(
        self: &Arc<Self>,
        session: &mut SessionState,
        parsed: &SessionDescription,
    ) -> Result<()> {
        let capabilities = session.strategy.to_capabilities(parsed)?;
        let mut dtls = extract_remote_dtls_parameters(parsed)?;
        // The offer is actpass and we answer active.
        dtls.role = DTLSRole::Server;

        let (peer, transport) = self.create_peer(session).await?;
        let capabilities = peer.set_capabilities(capabilities).await?;
        log::debug!(
            "peer {} capabilities: {} codecs, {} header extensions",
            self.peer_name,
            capabilities.codecs.len(),
            capabilities.header_extensions.len()
        );

        transport.set_remote_dtls_parameters(dtls).await?;
        session.remote_dtls_applied = true;

        session
            .strategy
            .apply_remote_offer(parsed, &self.strategy_context(&peer, &transport))
            .await?;
        session.origin.session_version = parsed.origin.session_version;

        // Answers never carry senders; the ones already there need an offer
        // of their own once this round is over.
        if peer.rtp_senders().iter().any(|s| !s.closed()) {
            self.scheduler.set_needed();
        }
        Ok(())
    }

    async fn apply_remote_answer(
        &self,
        session: &mut SessionState,
        parsed: &SessionDescription,
    ) -> Result<()> {
        let (peer, transport) = session
            .peer
            .clone()
            .zip(session.transport.clone())
            .ok_or(Error::ErrNoPeer)?;

        if !session.remote_dtls_applied {
            let dtls = extract_remote_dtls_parameters(parsed)?;
            transport.set_remote_dtls_parameters(dtls).await?;
            session.remote_dtls_applied = true;
        }

        session
            .strategy
            .apply_remote_answer(parsed, &self.strategy_context(&peer, &transport))
            .await
    }

    fn push_watcher(&self, handle: JoinHandle<()>) {
        let mut watchers = self.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.retain(|h| !h.is_finished());
        watchers.push(handle);
    }

    fn abort_watchers(&self) {
        let watchers: Vec<JoinHandle<()>> = self
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for h in watchers {
            h.abort();
        }
        self.watched_senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// watch_peer relays the peer's events: a new sender needs an offer, and
    /// a closed peer closes the connection.
    fn watch_peer(self: &Arc<Self>, peer: &Arc<dyn Peer>) {
        let mut events = peer.subscribe();
        let weak = Arc::downgrade(self);

        self.push_watcher(tokio::spawn(async move {
            loop {
                let event = events.recv().await;
                let Some(pc) = weak.upgrade() else {
                    break;
                };

                match event {
                    Ok(PeerEvent::NewRtpSender(sender)) => {
                        log::debug!("peer {} got new sender {}", pc.peer_name, sender.id());
                        pc.watch_sender(sender);
                        negotiation::mark_needed(&pc);
                    }
                    Ok(PeerEvent::Close) => {
                        log::debug!("peer {} closed", pc.peer_name);
                        // close aborts this task; run it on its own.
                        tokio::spawn(async move {
                            if let Err(err) = pc.close().await {
                                log::warn!("failed to close connection: {err}");
                            }
                        });
                        break;
                    }
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("peer {} watcher lagged by {n} events", pc.peer_name);
                        negotiation::mark_needed(&pc);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// watch_sender marks negotiation needed on every change of `sender`
    /// until it closes.
    fn watch_sender(self: &Arc<Self>, sender: Arc<dyn RtpSender>) {
        let id = sender.id();
        if !self
            .watched_senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone())
        {
            return;
        }

        let mut events = sender.subscribe();
        let weak = Arc::downgrade(self);

        self.push_watcher(tokio::spawn(async move {
            loop {
                let event = events.recv().await;
                let Some(pc) = weak.upgrade() else {
                    break;
                };

                match event {
                    Ok(event) => {
                        log::trace!("sender {id}: {event:?}");
                        negotiation::mark_needed(&pc);
                        if event == RTCRtpSenderEvent::Close {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => negotiation::mark_needed(&pc),
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    async fn do_close(&self) {
        if self.close_emitted.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handler) = &*self.on_close_handler.load() {
            let mut f = handler.lock().await;
            f().await;
        }
    }

    pub(super) async fn close(&self) -> Result<()> {
        if self.is_closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        log::debug!("closing connection of peer {}", self.peer_name);

        self.scheduler.cancel();
        self.abort_watchers();

        let mut close_errs = vec![];
        {
            let mut session = self.session.lock().await;
            if let Err(err) = session.strategy.close().await {
                close_errs.push(err);
            }
            if let Some(peer) = session.peer.take() {
                if !peer.closed() {
                    if let Err(err) = peer.close().await {
                        close_errs.push(err);
                    }
                }
            }
            session.transport = None;
        }

        self.do_close().await;
        flatten_errs(close_errs)
    }
}

#[async_trait]
impl NegotiationGate for PeerConnectionInternal {
    fn scheduler(&self) -> &NegotiationScheduler {
        &self.scheduler
    }

    fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    fn is_busy(&self) -> bool {
        self.is_busy.load(Ordering::SeqCst)
    }

    fn is_stable(&self) -> bool {
        self.signaling_state() == RTCSignalingState::Stable
    }

    async fn negotiation_needed(&self) {
        log::debug!("negotiation needed for peer {}", self.peer_name);
        if let Some(handler) = &*self.on_negotiation_needed_handler.load() {
            let mut f = handler.lock().await;
            f().await;
        }
    }
}
