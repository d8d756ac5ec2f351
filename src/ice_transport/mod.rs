pub mod ice_candidate;
pub mod ice_candidate_type;
pub mod ice_parameters;
pub mod ice_protocol;
