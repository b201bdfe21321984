//! Provider Waiters
//!
//! Reusable primitives for cloud provider resources: waiting for a resource to
//! reach a state, and draining paginated list APIs with local filtering.
//!
//! # Overview
//!
//! - **State polling**: [`wait_for_state`] drives a describe call until a goal
//!   state, a failure state, absence, or a timeout
//! - **Pagination**: [`list_all`] drains page-number and next-token APIs
//!   through one loop, filtering items as they arrive
//! - **Filtering**: [`ItemFilter`] for id sets, name patterns, and status
//! - **Error taxonomy**: [`ErrorClassifier`] sorts vendor errors into
//!   not-found, retryable, and terminal
//! - **Retry**: [`retry()`] wraps an SDK call with incremental backoff
//! - **Client seam**: [`ApiClient`] plus [`DescribeBinding`] and [`ListBinding`]
//!   connect a vendor SDK to the primitives
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use provider_waiters::{
//!     ClientContext, DescribeBinding, ItemFilter, ListBinding, PollSpec, WaiterConfig,
//! };
//!
//! let config = WaiterConfig::from_json(provider_config["timeouts"].clone())?;
//! let ctx = ClientContext::new("cn-hangzhou").with_retry(config.retry_policy());
//!
//! // Wait for a new VPC to become available
//! let vpc = DescribeBinding::new("DescribeVpcs", "VpcId")
//!     .with_object_path("$.Vpcs.Vpc")
//!     .with_id_field("VpcId")
//!     .with_not_found_codes(["InvalidVpcId.NotFound"]);
//! let spec = config
//!     .poll_spec(["Available".to_string()])
//!     .with_fail_states(["Failed".to_string()]);
//! vpc.wait_for(&client, &ctx, &vpc_id, &spec).await?;
//!
//! // List its vswitches whose name starts with "prod"
//! let filter = ItemFilter::new().with_name_regex("VSwitchName", "^prod")?;
//! let vswitches = ListBinding::new("DescribeVSwitches", "$.VSwitches.VSwitch")
//!     .list_with(&client, &ctx, config.page_number(), &filter)
//!     .await?;
//! ```
//!
//! # Concurrency
//!
//! Everything runs on the caller's task. A wait or listing resolves only when
//! it is finished; nothing is spawned and no state is shared between calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pager;
pub mod path;
pub mod poller;
pub mod retry;
pub mod status;
pub mod testing;

// Re-export main types at crate root
pub use client::{ApiClient, ClientContext, DescribeBinding, ListBinding};
pub use config::WaiterConfig;
pub use error::{ApiError, Error, ErrorClassifier, ErrorKind};
pub use filter::ItemFilter;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use pager::{list_all, list_all_unfiltered, Continuation, Cursor, Page, PageRequest, Pagination};
pub use poller::{wait_for_state, Observed, PollResult, PollSpec};
pub use retry::{retry, RetryPolicy};
pub use status::Status;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
