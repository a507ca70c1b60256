//! Kernel-domain logic.
//!
//! - **version**: version-string parsing and total ordering
//! - **catalog**: package-name grammar and catalog construction
//! - **classify**: protected/removable partitioning
//! - **validator**: removal-plan safety state machine

pub mod catalog;
pub mod classify;
pub mod validator;
pub mod version;
