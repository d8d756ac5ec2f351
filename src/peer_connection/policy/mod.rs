pub mod sdp_semantics;
