//! TPA plugin - enable / reload / disable lifecycle
//!
//! Owns the configuration, the shared message catalog, the session and the
//! timer thread for as long as the plugin is enabled.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, info, warn};

use crate::core::constants::DRIVER_TICK_INTERVAL;
use crate::core::messages::{MessageKey, PH_AUTO_REJECT_SECONDS, PH_TELEPORT_WAIT_SECONDS};
use crate::core::session::TpaSession;
use crate::core::traits::MessagingChannel;
use crate::core::types::{ActorId, TimingSettings};

use super::catalog::MessageCatalog;
use super::config::{Config, ConfigError};
use super::driver::{SharedSession, TimerDriver};
use super::host::{ChatHost, GameHost};
use super::logging::init_logging;

// =============================================================================
// TPA PLUGIN
// =============================================================================

pub struct TpaPlugin<G: GameHost + Send + Sync + 'static> {
    config_path: PathBuf,
    config: Config,
    session: SharedSession<ChatHost<G>>,
    driver: TimerDriver,
}

impl<G: GameHost + Send + Sync + 'static> TpaPlugin<G> {
    /// Load config, set up logging and start the timer thread.
    ///
    /// A broken config file is logged and replaced by defaults; the plugin
    /// always comes up.
    pub fn enable(config_path: impl Into<PathBuf>, game: G) -> Self {
        let config_path = config_path.into();

        // Logging settings come from the file, so problems reading it are
        // only reported once the subscriber is up
        let startup = read_startup_config(&config_path);
        let config = startup.config;
        init_logging(&config.logging, config.log_file_path(&config_path));
        info!(path = %config_path.display(), "[plugin] Enabling TPA system");
        for problem in &startup.problems {
            problem.report();
        }

        let catalog = Arc::new(RwLock::new(MessageCatalog::from_overrides(&config.messages)));
        let host = ChatHost::new(game, catalog);
        let timings = config.timing_settings();
        let session = SharedSession::new(TpaSession::new(timings), host);
        let driver = TimerDriver::start(session.clone(), DRIVER_TICK_INTERVAL);

        info!(
            auto_reject_secs = timings.auto_reject.as_secs(),
            teleport_wait_secs = timings.teleport_wait.as_secs(),
            "[plugin] Enabled"
        );

        Self {
            config_path,
            config,
            session,
            driver,
        }
    }

    /// Handle used by the command layer
    pub fn session(&self) -> &SharedSession<ChatHost<G>> {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    /// Re-read the config file and apply timings and message templates.
    ///
    /// Timers that are already armed keep their deadlines. On error nothing
    /// changes. `requested_by` receives `reload-success`.
    pub fn reload(&mut self, requested_by: Option<ActorId>) -> Result<TimingSettings, ConfigError> {
        let config = Config::load(&self.config_path).map_err(|e| {
            error!(error = %e, "[plugin] Reload failed, keeping current config");
            e
        })?;

        let timings = config.timing_settings();
        self.session.set_timings(timings);
        self.session
            .host()
            .replace_catalog(MessageCatalog::from_overrides(&config.messages));
        self.config = config;

        info!(
            auto_reject_secs = timings.auto_reject.as_secs(),
            teleport_wait_secs = timings.teleport_wait.as_secs(),
            "[plugin] Reloaded"
        );

        if let Some(actor) = requested_by {
            self.session.host().notify(
                actor,
                MessageKey::ReloadSuccess,
                vec![
                    (PH_AUTO_REJECT_SECONDS, timings.auto_reject.as_secs().to_string()),
                    (PH_TELEPORT_WAIT_SECONDS, timings.teleport_wait.as_secs().to_string()),
                ],
            );
        }
        Ok(timings)
    }

    /// Stop the timer thread and drop every pending request.
    ///
    /// Returns the number of requests that were still pending.
    pub fn disable(mut self) -> usize {
        self.driver.stop();
        let cleared = self.session.shutdown();
        info!(cleared, "[plugin] Disabled");
        cleared
    }
}

// =============================================================================
// STARTUP CONFIG
// =============================================================================

/// Something that went wrong while reading the config on enable
#[derive(Debug)]
enum StartupProblem {
    DefaultNotWritten(ConfigError),
    LoadFailed(ConfigError),
}

impl StartupProblem {
    fn report(&self) {
        match self {
            StartupProblem::DefaultNotWritten(e) => {
                warn!(error = %e, "[plugin] Could not write default config")
            }
            StartupProblem::LoadFailed(e) => {
                error!(error = %e, "[plugin] Failed to load config, using defaults")
            }
        }
    }
}

struct StartupConfig {
    config: Config,
    problems: Vec<StartupProblem>,
}

/// Write the default file if needed and load it, never failing
fn read_startup_config(path: &Path) -> StartupConfig {
    let mut problems = Vec::new();

    if let Err(e) = Config::write_default_if_missing(path) {
        problems.push(StartupProblem::DefaultNotWritten(e));
    }
    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            problems.push(StartupProblem::LoadFailed(e));
            Config::default()
        }
    };

    StartupConfig { config, problems }
}

// =============================================================================
// TESTS
// =============================================================================
