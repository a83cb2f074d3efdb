//! Core data types shared across the agent turn loop: tasks, identity,
//! conversation messages, plans, typed actions, links and usage samples.

mod action;
mod error;
mod identity;
mod link;
mod message;
mod plan;
mod task;
mod trace;
mod usage;

pub use action::{ActionOutcome, ActionRequest, ProjectTeamMember, SkillLevel, TypedAction};
pub use error::Error;
pub use identity::Identity;
pub use link::{Link, LinkKind};
pub use message::{Message, Role};
pub use plan::{Plan, PlanStep, StepStatus};
pub use task::TaskDescriptor;
pub use trace::TraceEvent;
pub use usage::UsageSample;

pub type Result<T> = std::result::Result<T, Error>;
