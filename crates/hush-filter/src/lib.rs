//! # Hush Filter - Message Rewrite Layer
//!
//! The filter is the part of Hush that touches messages. It sits in every
//! connection's pipeline, looks at each decoded protocol unit, and removes
//! the client-attestation machinery of the chat protocol so that chat on a
//! server that does not verify signatures keeps working and stays
//! unreportable.
//!
//! ## Purpose
//!
//! 1. **Server signatures** - Signed player chat is re-sent as an unsigned
//!    broadcast with the same decorated text.
//!
//! 2. **Client signatures** - Signatures on chat and command submissions
//!    are cleared before the host sees them.
//!
//! 3. **Session updates** - Profile key updates are dropped.
//!
//! 4. **Warning toast** - The "enforces secure chat" flag on server data
//!    and login is forced on so the client stays quiet.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   INTERCEPTION STAGE                    │
//! ├─────────────────────────────────────────────────────────┤
//! │                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  │
//! │  │  CLASSIFIER  │─▶│   RULE SET   │─▶│   COUNTERS   │  │
//! │  │              │  │              │  │              │  │
//! │  │ tag + dir    │  │ Pass         │  │ diagnostics  │  │
//! │  │ + schema     │  │ Replace(m)   │  │ stage stats  │  │
//! │  │   adapter    │  │ Drop         │  │ deferred log │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  │
//! │                                                         │
//! │        errors and panics ──▶ forward original           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Schema Drift
//!
//! Field layouts move between protocol revisions. The [`schema`] module
//! keeps one adapter table per kind; a message whose revision or fields do
//! not match any adapter is classified `Malformed` and forwarded as-is.
//!
//! ## Usage
//!
//! ```rust
//! use hush_filter::{fixtures, FilterConfig, InterceptionStage, SessionId};
//! use hush_monitor::{DeferredLog, Diagnostics};
//! use std::sync::Arc;
//!
//! let stage = InterceptionStage::new(
//!     SessionId::new(),
//!     Arc::new(FilterConfig::default()),
//!     Arc::new(Diagnostics::new()),
//!     DeferredLog::disabled(),
//! );
//!
//! let forwarded = stage.process(fixtures::player_chat("Steve", "hello")).unwrap();
//! assert_eq!(forwarded.tag, "system_chat");
//!
//! // Session updates never reach the server.
//! assert!(stage.process(fixtures::chat_session_update()).is_none());
//! ```

pub mod classify;
pub mod component;
pub mod config;
pub mod fixtures;
pub mod models;
pub mod rules;
pub mod schema;
pub mod stage;

pub use classify::{classify, Kind, Shape};
pub use component::{ChatDecoration, Component, DecorationParameter, TextComponent, TranslatableComponent};
pub use config::FilterConfig;
pub use models::{tags, Direction, FilterError, Message, ProtocolVersion, Result, SessionId};
pub use rules::{RuleOutcome, RuleSet, StandardRules};
pub use stage::{InterceptionStage, Stage, StageStatsSnapshot};
