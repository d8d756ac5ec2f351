
use tokio::time::Duration;

use crate::error::{Error, Result};

pub(crate) const DEFAULT_NEGOTIATION_NEEDED_DELAY: Duration = Duration::from_millis(1000);
pub(crate) const DEFAULT_FAKE_PORT_MIN: u16 = 10000;
pub(crate) const DEFAULT_FAKE_PORT_MAX: u16 = 60000;
pub(crate) const DEFAULT_SDP_ORIGIN_USERNAME: &str = "-";

/// FakePorts is the range the port of open `m=` lines is taken from.
#[derive(Default, Debug, Clone)]
pub struct FakePorts {
    pub port_min: u16,
    pub port_max: u16,
}

#[derive(Default, Debug, Clone)]
pub struct Timeout {
    pub negotiation_needed_delay: Option<Duration>,
}

/// SettingEngine allows influencing behavior in ways that are not
/// supported by the WebRTC API. This allows us to support additional
/// use-cases without deviating from the WebRTC API elsewhere.
#[derive(Default, Debug, Clone)]
pub struct SettingEngine {
    pub(crate) fake_ports: FakePorts,
    pub(crate) timeout: Timeout,
    pub(crate) sdp_origin_username: String,
}

impl SettingEngine {
    /// get_negotiation_needed_delay returns the configured debounce window,
    /// or the default one when unset.
    pub(crate) fn get_negotiation_needed_delay(&self) -> Duration {
        self.timeout
            .negotiation_needed_delay
            .unwrap_or(DEFAULT_NEGOTIATION_NEEDED_DELAY)
    }

    /// get_fake_port_range returns the configured range. If SettingEngine's
    /// range is not configured it returns the default one.
    pub(crate) fn get_fake_port_range(&self) -> (u16, u16) {
        if self.fake_ports.port_min == 0 && self.fake_ports.port_max == 0 {
            (DEFAULT_FAKE_PORT_MIN, DEFAULT_FAKE_PORT_MAX)
        } else {
            (self.fake_ports.port_min, self.fake_ports.port_max)
        }
    }

    pub(crate) fn get_sdp_origin_username(&self) -> &str {
        if self.sdp_origin_username.is_empty() {
            DEFAULT_SDP_ORIGIN_USERNAME
        } else {
            self.sdp_origin_username.as_str()
        }
    }

    /// set_negotiation_needed_delay sets how long changes are collected
    /// before negotiationneeded fires. Default is 1 second.
    pub fn set_negotiation_needed_delay(&mut self, delay: Duration) {
        self.timeout.negotiation_needed_delay = Some(delay);
    }

    /// set_fake_port_range limits the ports written in `m=` lines. Zero is
    /// not allowed: a zero port rejects the section.
    pub fn set_fake_port_range(&mut self, port_min: u16, port_max: u16) -> Result<()> {
        if port_min == 0 || port_max < port_min {
            return Err(Error::ErrOthers(format!(
                "invalid fake port range {port_min}-{port_max}"
            )));
        }

        self.fake_ports = FakePorts { port_min, port_max };
        Ok(())
    }

    /// set_sdp_origin_username sets the username of the `o=` line.
    pub fn set_sdp_origin_username(&mut self, username: String) {
        self.sdp_origin_username = username;
    }
}
