//! # EventGenie Agents
//!
//! Event planning and budgeting agents over a remote chat model.
//!
//! This library provides:
//! - Planning and finance agents that always return a usable result
//! - Recovery of fenced, truncated or malformed model JSON
//! - Budget reconciliation against a spending ceiling
//! - An HTTP API and an orchestrator that routes free-text requests
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │             Maestro              │
//!        │  (intent → planning / finance)   │
//!        └───────┬──────────────────┬───────┘
//!                │                  │
//!                ▼                  ▼
//!       ┌───────────────┐  ┌────────────────┐
//!       │ PlanningAgent │  │  FinanceAgent  │
//!       └───────┬───────┘  └───────┬────────┘
//!               │    recovery      │ + reconcile
//!               └────────┬─────────┘
//!                        ▼
//!               ┌─────────────────┐
//!               │  chat model API │
//!               └─────────────────┘
//! ```
//!
//! ## Modules
//! - `agents`: planning, finance and the orchestrator
//! - `recovery`: JSON extraction, truncation repair, partial recovery
//! - `budget`: line items, reconciliation, fallback estimate
//! - `llm`: chat-completions client and the text-completion seam

pub mod agents;
pub mod api;
pub mod budget;
pub mod config;
pub mod event;
pub mod llm;
pub mod recovery;

pub use config::Config;
pub use event::EventRequest;
