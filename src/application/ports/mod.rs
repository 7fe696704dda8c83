//! Ports - interfaces the application requires from external systems

mod synthesis_port;

pub use synthesis_port::{SynthesisPort, SynthesisRequest, SynthesisResponse};
