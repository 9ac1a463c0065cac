// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait for pluggable drivers.

use async_trait::async_trait;

use crate::error::AbotError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and lifecycle shared by every driver the core loads.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Human-readable name of this driver instance.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    async fn health_check(&self) -> Result<HealthStatus, AbotError>;

    /// Release any held resources.
    async fn shutdown(&self) -> Result<(), AbotError>;
}
