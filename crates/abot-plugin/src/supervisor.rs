// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin child processes.
//!
//! Each configured plugin is started with the core's RPC address as
//! `--core-addr <addr>` and in `ABOT_CORE_ADDR`. A plugin that fails to start
//! is logged and skipped.

use std::net::SocketAddr;
use std::process::Stdio;

use abot_config::model::PluginEntry;
use abot_core::rpc::CORE_ADDR_ENV;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

#[derive(Debug)]
struct Running {
    name: String,
    child: Child,
}

/// Owns the spawned plugin processes. Dropping it kills them.
#[derive(Debug, Default)]
pub struct Supervisor {
    children: Vec<Running>,
}

impl Supervisor {
    /// Start every configured plugin.
    pub fn spawn_all(entries: &[PluginEntry], core_addr: SocketAddr) -> Self {
        let addr = format!("http://{core_addr}");
        let mut children = Vec::new();
        for entry in entries {
            let spawned = Command::new(&entry.command)
                .args(&entry.args)
                .arg("--core-addr")
                .arg(&addr)
                .env(CORE_ADDR_ENV, &addr)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .spawn();
            match spawned {
                Ok(child) => {
                    info!(plugin = %entry.name, pid = ?child.id(), "started plugin");
                    children.push(Running {
                        name: entry.name.clone(),
                        child,
                    });
                }
                Err(e) => {
                    error!(plugin = %entry.name, command = %entry.command, error = %e, "failed to start plugin");
                }
            }
        }
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Kill every child and wait for it to exit.
    pub async fn shutdown(mut self) {
        for running in &mut self.children {
            if let Err(e) = running.child.kill().await {
                warn!(plugin = %running.name, error = %e, "failed to stop plugin");
            } else {
                info!(plugin = %running.name, "stopped plugin");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, command: &str, args: &[&str]) -> PluginEntry {
        PluginEntry {
            name: name.into(),
            command: command.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn missing_binaries_are_skipped() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let sup = Supervisor::spawn_all(&[entry("ghost", "/nonexistent/abot-ghost", &[])], addr);
        assert!(sup.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn children_are_stopped_on_shutdown() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        // `sh -c` takes the appended flags as positional parameters.
        let sup = Supervisor::spawn_all(&[entry("sleeper", "sh", &["-c", "sleep 30"])], addr);
        assert_eq!(sup.len(), 1);
        sup.shutdown().await;
    }
}
