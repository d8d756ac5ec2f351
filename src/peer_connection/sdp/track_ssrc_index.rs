use std::collections::HashMap;
use std::sync::Arc;

use super::RemoteStream;
use crate::rtp_transceiver::rtp_receiver::RtpReceiver;
use crate::rtp_transceiver::SSRC;

/// TrackEntry is one remote track of a Plan B section and the receiver
/// consuming it.
#[derive(Clone)]
pub(crate) struct TrackEntry {
    pub(crate) receiver: Arc<dyn RtpReceiver>,
    pub(crate) ssrcs: Vec<SSRC>,
}

/// TrackDiff is what changed between the indexed tracks and the tracks a
/// new remote description announces.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TrackDiff<'a> {
    pub(crate) added: Vec<&'a RemoteStream>,
    pub(crate) removed: Vec<String>,
}

/// TrackSsrcIndex maps the track ids of a Plan B section to their receiver
/// and SSRCs.
#[derive(Default)]
pub(crate) struct TrackSsrcIndex {
    tracks: HashMap<String, TrackEntry>,
}

impl TrackSsrcIndex {
    pub(crate) fn new() -> Self {
        TrackSsrcIndex::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.tracks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub(crate) fn get(&self, track_id: &str) -> Option<&TrackEntry> {
        self.tracks.get(track_id)
    }

    /// track_for_ssrc returns the track an SSRC belongs to, RTX included.
    pub(crate) fn track_for_ssrc(&self, ssrc: SSRC) -> Option<&str> {
        self.tracks
            .iter()
            .find(|(_, e)| e.ssrcs.contains(&ssrc))
            .map(|(id, _)| id.as_str())
    }

    pub(crate) fn insert(
        &mut self,
        track_id: String,
        receiver: Arc<dyn RtpReceiver>,
        ssrcs: Vec<SSRC>,
    ) -> Option<TrackEntry> {
        self.tracks.insert(track_id, TrackEntry { receiver, ssrcs })
    }

    pub(crate) fn remove(&mut self, track_id: &str) -> Option<TrackEntry> {
        self.tracks.remove(track_id)
    }

    /// drain empties the index, returning every entry.
    pub(crate) fn drain(&mut self) -> Vec<TrackEntry> {
        self.tracks.drain().map(|(_, e)| e).collect()
    }

    /// prune_closed forgets tracks whose receiver closed on its own and
    /// returns their ids.
    pub(crate) fn prune_closed(&mut self) -> Vec<String> {
        let mut closed: Vec<String> = self
            .tracks
            .iter()
            .filter(|(_, e)| e.receiver.closed())
            .map(|(id, _)| id.clone())
            .collect();
        closed.sort();

        for id in &closed {
            log::debug!("track {id} receiver closed, pruned");
            self.tracks.remove(id);
        }
        closed
    }

    /// diff compares the index with `streams`. A track that kept its id but
    /// changed SSRCs is both removed and added. Removed ids are sorted;
    /// added streams keep their order.
    pub(crate) fn diff<'a>(&self, streams: &'a [RemoteStream]) -> TrackDiff<'a> {
        let added = streams
            .iter()
            .filter(|s| match self.tracks.get(&s.track_id) {
                Some(e) => e.ssrcs != s.ssrcs(),
                None => true,
            })
            .collect();

        let mut removed: Vec<String> = self
            .tracks
            .iter()
            .filter(|(id, e)| {
                !streams
                    .iter()
                    .any(|s| &s.track_id == *id && s.ssrcs() == e.ssrcs)
            })
            .map(|(id, _)| id.clone())
            .collect();
        removed.sort();

        TrackDiff { added, removed }
    }
}
