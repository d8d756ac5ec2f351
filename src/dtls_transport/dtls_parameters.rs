use serde::{Deserialize, Serialize};

use super::dtls_fingerprint::*;
use super::dtls_role::*;

/// DTLSParameters holds information relating to DTLS configuration.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DTLSParameters {
    pub role: DTLSRole,
    pub fingerprints: Vec<RTCDtlsFingerprint>,
}

impl DTLSParameters {
    /// fingerprint returns the fingerprint computed with the given algorithm.
    pub fn fingerprint(&self, algorithm: &str) -> Option<&RTCDtlsFingerprint> {
        self.fingerprints
            .iter()
            .find(|f| f.algorithm.eq_ignore_ascii_case(algorithm))
    }
}
