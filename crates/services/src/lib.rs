#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod remote;
pub mod session;
pub mod sync;

pub use plan_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, RemoteConfigError, RemoteError, SessionError, SyncError};
pub use remote::{HttpRemoteStore, InMemoryRemoteStore, RemoteLogStore, ScriptedFailure};
pub use session::{
    CompletionOutcome, DayContent, PlanContent, PlanState, ReadingPlanService, RejectReason,
    StaticPlanContent,
};
pub use sync::{HydrateOutcome, PendingUpsert, SyncService, WriteState};
