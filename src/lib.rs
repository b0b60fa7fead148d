// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # SpaceOdT
//!
//! Configuration export and staged telephony provisioning against the Webex
//! REST API.
//!
//! ## Overview
//!
//! SpaceOdT covers two workflows:
//!
//! - **Export**: read organizations, locations, people, groups and group
//!   members, and write them as JSON and CSV with a status file, a report and
//!   an optional cache.
//! - **Provisioning**: turn CSV/JSON templates into a deterministic plan of
//!   staged actions, execute them one by one or all at once, and record the
//!   remote state before and after every action.
//!
//! A small local UI exposes the plan, background location jobs and direct
//! transformations (PSTN routing, numbers, main number, legacy forward).
//!
//! ## Modules
//!
//! - [`config`]: Settings, export contract and token resolution
//! - [`webex`]: REST client, the [`webex::WebexApi`] seam and retry helper
//! - [`export`]: Export runner, status records and reports
//! - [`inputs`]: Input templates, loaders and the static policy
//! - [`planner`]: Plan construction and stage execution
//! - [`state`]: Action and run state persistence
//! - [`softphone`]: v2 softphone stages with operator decisions
//! - [`jobs`]: Supervised background location jobs
//! - [`transform`]: Direct before/after transformations
//! - [`ui`]: Local HTTP UI
//! - [`dummy`]: Dummy lab users
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```text
//! spaceodt export-all --out-dir .artifacts --skip-group-members
//! spaceodt plan
//! spaceodt action 3 --apply
//! spaceodt serve --port 8765
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod dummy;
pub mod error;
pub mod export;
pub mod inputs;
pub mod jobs;
pub mod planner;
pub mod softphone;
pub mod state;
pub mod transform;
pub mod ui;
pub mod webex;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Settings, SpaceOdtConfig};
pub use error::{Result, SpaceOdtError};
pub use export::{ExportOptions, ExportRunner, ExportSummary};
pub use jobs::JobManager;
pub use planner::{ActionExecutor, PlanRow, ProvisioningInputs};
pub use softphone::SoftphoneRunner;
pub use state::{LocalStateStore, StateStore};
pub use webex::{WebexApi, WebexClient};
