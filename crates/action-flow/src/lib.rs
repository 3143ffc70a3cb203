//! Flow Orchestration Layer
//!
//! Drives one wizard run from the live page to a single
//! [`Outcome`](action_primitives::Outcome):
//! - [`navigation`]: click-to-advance with URL verification, direct navigation fallback
//! - [`handler`] and [`templates`]: the step-handler contract and its execution templates
//! - [`steps`]: handlers for the screens of the default wizard plan
//! - [`executor`]: the step sequencer state machine
//! - [`phone`] and [`otp`]: the phone-verification sub-flow and its code providers

pub mod detector;
pub mod errors;
pub mod executor;
pub mod handler;
pub mod navigation;
pub mod otp;
pub mod phone;
pub mod registry;
pub mod steps;
pub mod strategies;
pub mod templates;

pub use errors::{FlowError, OtpError};
pub use executor::{FlowExecutor, StepSequencer};
pub use handler::{FormFill, StepEnv, StepHandler};
pub use navigation::Navigator;
pub use otp::{FileDropOtpProvider, NoOtpProvider, OtpChain, OtpProvider};
pub use registry::HandlerRegistry;
pub use strategies::FailureStrategy;
