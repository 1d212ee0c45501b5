// Use cases layer: application workflows for the hazard engine.

pub mod registry;
pub mod scoring;
pub mod session;
pub mod types;

pub use registry::{
    RemoveSessionError, SessionError, SessionHandle, SessionRegistry, SessionSettings,
};
pub use scoring::ScoringSink;
pub use session::{SessionWorld, session_task};
pub use types::{HazardUpdate, PlaceChargeReply, ScoringEvent, SessionEvent, SessionState};
