// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route registry: `command_object` → registered plugin.
//!
//! Filled by `Abot.RegisterPlugin` calls. Registering a route that is already
//! claimed replaces the previous binding and logs a warning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use abot_core::{AbotError, PluginDescriptor};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::client::PluginClient;

/// A plugin the core can call.
#[derive(Debug)]
pub struct RegisteredPlugin {
    pub descriptor: PluginDescriptor,
    pub client: PluginClient,
}

impl RegisteredPlugin {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Mutex-guarded route map shared by the RPC listener and the request path.
#[derive(Debug)]
pub struct Registry {
    routes: Mutex<HashMap<String, Arc<RegisteredPlugin>>>,
    call_timeout: Duration,
}

impl Registry {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            call_timeout,
        }
    }

    /// Bind every route in the descriptor's trigger. Returns the routes.
    pub async fn register(&self, descriptor: PluginDescriptor) -> Result<Vec<String>, AbotError> {
        descriptor.validate()?;
        let client = PluginClient::new(&descriptor.rpc_address, self.call_timeout)?;
        let routes = descriptor.trigger.routes();
        let plugin = Arc::new(RegisteredPlugin { descriptor, client });

        let mut map = self.routes.lock().await;
        for route in &routes {
            if let Some(previous) = map.insert(route.clone(), plugin.clone()) {
                warn!(
                    route = %route,
                    previous = %previous.name(),
                    plugin = %plugin.name(),
                    "route already registered, replacing"
                );
            }
        }
        info!(
            plugin = %plugin.name(),
            addr = %plugin.descriptor.rpc_address,
            routes = routes.len(),
            "registered plugin"
        );
        Ok(routes)
    }

    pub async fn get(&self, route: &str) -> Option<Arc<RegisteredPlugin>> {
        self.routes.lock().await.get(route).cloned()
    }

    /// First candidate route that is registered, with its plugin.
    pub async fn first_match(
        &self,
        candidates: &[String],
    ) -> Option<(String, Arc<RegisteredPlugin>)> {
        let map = self.routes.lock().await;
        candidates
            .iter()
            .find_map(|route| map.get(route).map(|p| (route.clone(), p.clone())))
    }

    /// Registered plugin by name, if it still owns any route.
    pub async fn plugin(&self, name: &str) -> Option<Arc<RegisteredPlugin>> {
        self.routes
            .lock()
            .await
            .values()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Usage examples of every registered plugin, by plugin name.
    pub async fn usages(&self) -> Vec<String> {
        let map = self.routes.lock().await;
        let mut seen: HashMap<&str, &[String]> = HashMap::new();
        for plugin in map.values() {
            seen.insert(plugin.name(), &plugin.descriptor.usage);
        }
        let mut names: Vec<_> = seen.keys().copied().collect();
        names.sort_unstable();
        names
            .into_iter()
            .flat_map(|n| seen[n].iter().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.routes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.routes.lock().await.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
