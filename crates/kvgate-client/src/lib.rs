// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! kvgate client
//!
//! Typed HTTP client for the key-value gateway, a REST front for a Redis-like
//! store.
//!
//! # Architecture
//!
//! Every gateway route is a `POST` under `{base_url}/api/{version}` with a JSON
//! body. [`GatewayClient`] groups them the way the gateway does:
//! - Keys (get, set, del, incr, expire, ttl, exists, rename, type, scan)
//! - Hashes (get, getAll, set, setIfAbsent, del, multi-field delete)
//! - Lists, sets and sorted sets
//! - Pipelines and transactions via [`Pipeline`]
//! - Named operations and workflows via [`Operation`] and [`WorkflowStep`]
//!
//! # Example
//!
//! ```no_run
//! use kvgate_client::{ClientConfig, GatewayClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GatewayClient::new(
//!     ClientConfig::new("http://localhost:11911").with_api_key("my-token"),
//! )?;
//!
//! client.hashes().set("user:1", "name", "Ana").await?;
//! let name = client.hashes().get("user:1", "name").await?;
//! println!("name: {:?}", name);
//!
//! client.sets().add("tags", &["rust", "redis"]).await?;
//! let tags = client.sets().members("tags").await?;
//! println!("tags: {:?}", tags);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod operations;
mod pipeline;
mod types;
mod wire;

pub use client::{GatewayClient, Hashes, Keys, Lists, Sets, SortedSets};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{ClientError, Result};
pub use operations::{Operation, WorkflowStep};
pub use pipeline::Pipeline;
pub use types::{Command, ExecMode, ListEnd, ScanPage, ScoreBound, ScoredMember};
