mod error;
mod model;
mod plan;
mod service;

pub use error::ReplayError;
pub use model::{
    CapturedRequest, Fields, Payload, ProbeResult, RESPONSE_TEXT_LIMIT, RedirectInfo,
    ReplayMethod, ReplayOutcome, ReplayReport, ReplayResult,
};
pub use plan::{EXCLUDED_HEADERS, PlannedRequest, plan_request};
pub use service::{ReplayService, Transport};
