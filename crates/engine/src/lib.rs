//! Reconciler Engine - Sampling, comparison, polling and provisioning

pub mod compare;
pub mod poll;
pub mod provision;
pub mod sampler;
pub mod scenario;

pub use compare::Comparator;
pub use poll::{PollDriver, PollPolicy};
pub use provision::{AccountLedger, GeneratedIdentity, Provisioner};
pub use sampler::{ButtonState, ClaimState, Locator, Sampler, ScriptedSurface, Surface, ValueParser};
pub use scenario::{
    verify_deposit_credit, verify_mission_claim, verify_reward_credit, verify_vip_remaining, FieldOutcome,
    ReconcileContext, Scenario, ScenarioReport, StepFuture, StepReport, StepStatus,
};
