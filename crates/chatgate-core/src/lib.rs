//! # chatgate-core
//!
//! Foundation types shared by every chatgate crate:
//!
//! - [`provider`]: the per-session [`ProviderSelection`]
//! - [`protocol`]: inbound text classification and the fixed outbound notice formats
//! - [`errors`]: the hosted-provider failure taxonomy and local-daemon errors
//! - [`logging`]: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod errors;
pub mod logging;
pub mod protocol;
pub mod provider;

pub use errors::{CompletionError, LocalDaemonError};
pub use protocol::{Inbound, Outbound};
pub use provider::{ParseProviderError, ProviderSelection};
