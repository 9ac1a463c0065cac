// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete core: temp SQLite database, in-memory
//! word lists, a live RPC listener, plugins registered over HTTP exactly as
//! real plugin processes do, and a recording SMS driver. `send_phone()` and
//! `send_user()` drive the full process-text pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use abot_agent::{Core, Scheduler, TickReport, Turn};
use abot_config::model::SchedulerConfig;
use abot_core::{AbotError, FlexIdKind, Request, SmsSender, User};
use abot_nlp::{Pipeline, WordLists};
use abot_plugin::{Registry, listener};
use abot_sdk::Plugin;
use abot_storage::queries::{messages, users};
use abot_storage::{Database, NewUser, StoredMessage};
use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

use crate::mock_plugin::MockPlugin;
use crate::mock_sms::MockSms;

/// Public URL handed to the onboarding plugin.
pub const TEST_BASE_URL: &str = "http://localhost:4200";

const REGISTER_WAIT: Duration = Duration::from_secs(5);

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// A small vocabulary covering the end-to-end scenarios.
///
/// Filler words go into the dictionary only, so they are known to the
/// spell corrector but never become correction targets.
pub fn default_word_lists() -> WordLists {
    WordLists {
        verbs: words(&["find", "show", "schedule", "remind", "help"]),
        nouns: words(&["pizza", "food", "meeting", "restaurant"]),
        adverbs: words(&["nearby"]),
        names_male: words(&["jim", "sam"]),
        names_female: words(&["sarah", "sam"]),
        offensive: words(&["darn"]),
        dictionary: words(&[
            "not", "that", "one", "and", "then", "again", "me", "at", "the", "about", "you",
            "thanks", "hello", "please", "with", "tomorrow", "today",
        ]),
        ..Default::default()
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    word_lists: WordLists,
    plugins: Vec<Plugin>,
    mock_plugins: Vec<MockPlugin>,
    onboard: bool,
    sms: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            word_lists: default_word_lists(),
            plugins: Vec::new(),
            mock_plugins: Vec::new(),
            onboard: true,
            sms: true,
        }
    }

    /// Replace the default vocabulary.
    pub fn with_word_lists(mut self, lists: WordLists) -> Self {
        self.word_lists = lists;
        self
    }

    /// Serve an SDK plugin in-process.
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Register a recording mock plugin.
    pub fn with_mock_plugin(mut self, plugin: MockPlugin) -> Self {
        self.mock_plugins.push(plugin);
        self
    }

    /// Skip the onboarding plugin.
    pub fn without_onboarding(mut self) -> Self {
        self.onboard = false;
        self
    }

    /// Run with no SMS driver configured.
    pub fn without_sms(mut self) -> Self {
        self.sms = false;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, AbotError> {
        let temp_dir = tempfile::TempDir::new().map_err(AbotError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let nlp = Arc::new(Pipeline::from_word_lists(&self.word_lists, 2, 4));
        let registry = Arc::new(Registry::new(Duration::from_secs(5)));
        let shutdown = CancellationToken::new();

        let (rpc_listener, core_addr) = listener::bind("127.0.0.1").await?;
        tokio::spawn(listener::serve(
            rpc_listener,
            registry.clone(),
            shutdown.clone(),
        ));
        let core_url = format!("http://{core_addr}");

        let client = reqwest::Client::new();
        for mock in &self.mock_plugins {
            let descriptor = mock.start(shutdown.clone()).await?;
            abot_sdk::server::register(&client, &core_url, &descriptor).await?;
        }

        let mut plugins = self.plugins;
        if self.onboard {
            plugins.push(abot_onboard::plugin(TEST_BASE_URL)?);
        }
        for plugin in plugins {
            let name = plugin.name().to_string();
            let url = core_url.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = abot_sdk::serve(plugin, "127.0.0.1", &url, token).await {
                    tracing::warn!(error = %e, "test plugin stopped");
                }
            });
            wait_for_registration(&registry, &name).await?;
        }

        let sms = Arc::new(MockSms::new());
        let driver = self.sms.then(|| sms.clone() as Arc<dyn SmsSender>);
        let core = Core::new(db.clone(), nlp, registry.clone(), driver.clone());
        let scheduler = Scheduler::new(db.clone(), driver, &SchedulerConfig::default());

        Ok(TestHarness {
            core,
            db,
            registry,
            sms,
            scheduler,
            mock_plugins: self.mock_plugins,
            core_addr,
            shutdown,
            _temp_dir: temp_dir,
        })
    }
}

async fn wait_for_registration(registry: &Registry, name: &str) -> Result<(), AbotError> {
    let poll = async {
        while registry.plugin(name).await.is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    tokio::time::timeout(REGISTER_WAIT, poll)
        .await
        .map_err(|_| AbotError::Timeout {
            duration: REGISTER_WAIT,
        })
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub core: Core,
    pub db: Database,
    pub registry: Arc<Registry>,
    /// Recording SMS driver. Unused by the core when built `without_sms`.
    pub sms: Arc<MockSms>,
    pub scheduler: Scheduler,
    pub mock_plugins: Vec<MockPlugin>,
    pub core_addr: SocketAddr,
    shutdown: CancellationToken,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A mock plugin registered at build time, by name.
    pub fn mock(&self, name: &str) -> Option<&MockPlugin> {
        self.mock_plugins.iter().find(|m| m.name() == name)
    }

    /// Message from a phone number, as the SMS webhook would send it.
    pub async fn send_phone(&self, phone: &str, text: &str) -> Result<Turn, AbotError> {
        self.send_phone_at(phone, text, chrono::Local::now().naive_local())
            .await
    }

    pub async fn send_phone_at(
        &self,
        phone: &str,
        text: &str,
        now: NaiveDateTime,
    ) -> Result<Turn, AbotError> {
        let req = Request {
            cmd: text.to_string(),
            flexid: Some(phone.to_string()),
            flexidtype: Some(FlexIdKind::Phone.code()),
            ..Default::default()
        };
        self.core.process_text_at(&req, now).await
    }

    /// Message from a signed-up user, as the web chat would send it.
    pub async fn send_user(&self, uid: i64, text: &str) -> Result<Turn, AbotError> {
        self.send_user_at(uid, text, chrono::Local::now().naive_local())
            .await
    }

    pub async fn send_user_at(
        &self,
        uid: i64,
        text: &str,
        now: NaiveDateTime,
    ) -> Result<Turn, AbotError> {
        let req = Request {
            cmd: text.to_string(),
            uid: Some(uid),
            ..Default::default()
        };
        self.core.process_text_at(&req, now).await
    }

    /// Message typed into the web chat by a logged-in user.
    pub async fn send_web(
        &self,
        uid: i64,
        session: &str,
        text: &str,
    ) -> Result<Turn, AbotError> {
        let req = Request {
            cmd: text.to_string(),
            uid: Some(uid),
            flexid: Some(session.to_string()),
            flexidtype: Some(FlexIdKind::WebSession.code()),
        };
        self.core.process_text(&req).await
    }

    /// Create a user, optionally binding a phone number.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<User, AbotError> {
        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$dGVzdA$dGVzdA".to_string(),
            phone: phone.map(str::to_string),
            admin: false,
            trainer: false,
        };
        users::create_user(&self.db, &new_user).await
    }

    pub async fn message(&self, id: i64) -> Result<Option<StoredMessage>, AbotError> {
        messages::get_message(&self.db, id).await
    }

    /// Run one scheduler pass at `now`.
    pub async fn tick(&self, now: NaiveDateTime) -> Result<TickReport, AbotError> {
        self.scheduler.tick(now).await
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
