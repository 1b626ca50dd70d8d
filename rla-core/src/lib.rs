//! The audit engine at the core of a risk-limiting ballot-polling audit
//! (BRAVO): margins and ASN, sample-size planning, deterministic sampling,
//! audit-board balancing, and round-by-round risk evaluation.
//!
//! This crate has no I/O of its own; `rla-webserver` and `rla-cli` sit on
//! top of it and own the manifest/CSV/HTTP boundaries described in the
//! surrounding workspace's specification.

pub mod balancer;
pub mod config;
pub mod contest;
pub mod error;
pub mod manifest;
pub mod margins;
pub mod planner;
pub mod risk;
pub mod round;
pub mod sampler;

pub use config::{AuditConfig, AuditMethod};
pub use contest::{CandidateId, Contest, Count};
pub use error::{RlaError, RlaResult};
pub use manifest::{Batch, BallotSlot, Manifest};
pub use margins::{compute_margins, Margins, PairMargin};
pub use planner::{sample_size_menu, SampleSizeMenu, SampleSizeOption, SampleSizeType};
pub use risk::{compute_risk, PairRisk, RiskResult};
pub use round::{Round, RoundOutcome, RoundStatus};
pub use sampler::{draw as draw_sample, BallotDraw};
