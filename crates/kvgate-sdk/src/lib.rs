// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! kvgate SDK - coordination for stateless workers sharing a key-value store.
//!
//! Workers run as interchangeable replicas and coordinate only through the
//! store, reached over the gateway's HTTP API (see [`kvgate_client`]).
//!
//! # Features
//!
//! - **Session locks**: at most one worker handles a given session at a time
//! - **Liveness**: workers signal periodically; auditors find and remove the
//!   silent ones
//! - **Chatbot store**: flows, session fields, AI context and caches
//! - **Conversation cache**: message histories shared through the store
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use kvgate_sdk::KvGateSdk;
//!
//! #[tokio::main]
//! async fn main() -> kvgate_sdk::Result<()> {
//!     let sdk = KvGateSdk::from_env()?;
//!     let heartbeat = sdk.start_heartbeat("agents");
//!
//!     if sdk.acquire_session("5511999").await? {
//!         sdk.chatbot()
//!             .update_session("5511999", &[("currentStep", "greet")])
//!             .await?;
//!         sdk.release_session("5511999").await?;
//!     }
//!
//!     let stats = sdk.liveness().health_stats("agents").await?;
//!     println!("{} of {} workers active", stats.active_workers, stats.total_workers);
//!
//!     if let Some(heartbeat) = heartbeat {
//!         heartbeat.stop().await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! Everything is written against [`KvBackend`]. [`HttpBackend`] talks to the
//! gateway; [`MemoryBackend`] keeps state in process with the same atomicity,
//! which is what the tests run on:
//!
//! ```
//! use std::sync::Arc;
//! use kvgate_sdk::{KvGateSdk, MemoryBackend, SdkConfig, SystemClock};
//!
//! let sdk = KvGateSdk::with_backend(
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(SystemClock),
//!     SdkConfig::new("worker-1"),
//! );
//! assert_eq!(sdk.worker_id(), "worker-1");
//! ```

mod backend;
mod chatbot;
mod client;
mod clock;
mod config;
mod conversation;
mod error;
mod heartbeat;
pub mod keys;
mod liveness;
mod lock;
mod types;

pub use backend::KvBackend;
pub use backend::http::HttpBackend;
pub use backend::memory::MemoryBackend;
pub use chatbot::ChatbotStore;
pub use client::KvGateSdk;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_ACTIVE_WINDOW_SECS, DEFAULT_HEARTBEAT_INTERVAL_MS, SdkConfig};
pub use conversation::ConversationCache;
pub use error::{Result, SdkError};
pub use heartbeat::HeartbeatHandle;
pub use liveness::LivenessRegistry;
pub use lock::{LockRecord, SessionLock};
pub use types::{
    AiContextMessage, ChatbotStats, ConditionOperator, Conversation, ConversationMessage,
    ConversationStats, FlowCondition, FlowConfig, FlowSettings, FlowStep, HealthStats,
    MessageMetadata, MessageRole, Role, StepType, WorkerHeartbeat,
};

// Re-export the gateway client so callers need only one dependency.
pub use kvgate_client;
pub use kvgate_client::{ScoreBound, ScoredMember};
