//! SOAR execution engine core: webhook ingestion, trigger evaluation,
//! declarative playbook orchestration, and the SLA accounting built on top
//! of it.
//!
//! - Ingestion pipeline: [`security`] (filter + auth) → [`trigger_eval`] →
//!   [`normalizer`] → [`persistence`] → [`engine`].
//! - Playbooks are validated once at save time by [`validator`] and never
//!   re-validated at run time.
//! - [`connectors`] is the narrow capability boundary between the engine and
//!   any concrete integration (enrichment, firewall, chat, ticketing).

pub mod api;
pub mod config;
pub mod connectors;
pub mod domain;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod persistence;
pub mod resolver;
pub mod security;
pub mod sla_accounting;
pub mod trigger_eval;
pub mod validator;
pub mod value_path;

pub use config::AppConfig;
pub use engine::Engine;
pub use error::{SoarError, SoarResult};
