//! Application state wiring all services together.
//!
//! The core services are generic over repository traits; AppState pins them
//! to the SQLite implementations and shares one `SessionStore` between the
//! conversation service and the reaper.

use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use habitlog_core::clock::{Clock, SystemClock};
use habitlog_core::conversation::ConversationService;
use habitlog_core::session::{SessionReaper, SessionStore};
use habitlog_core::stats::StatsAggregator;
use habitlog_core::timezone::{TimezoneResolver, parse_timezone};
use habitlog_infra::config::{load_config, resolve_data_dir};
use habitlog_infra::sqlite::pool::DatabasePool;
use habitlog_infra::sqlite::record::SqliteRecordRepository;
use habitlog_infra::sqlite::user::SqliteUserRepository;
use habitlog_types::config::HabitlogConfig;

pub type ConcreteConversationService =
    ConversationService<SqliteRecordRepository, SqliteUserRepository>;

pub type ConcreteStatsAggregator = StatsAggregator<SqliteRecordRepository, SqliteUserRepository>;

pub type ConcreteTimezoneResolver = TimezoneResolver<SqliteUserRepository>;

/// Shared application state, used by both CLI commands and REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<ConcreteConversationService>,
    pub stats: Arc<ConcreteStatsAggregator>,
    pub timezones: Arc<ConcreteTimezoneResolver>,
    pub sessions: SessionStore,
    pub clock: Arc<dyn Clock>,
    pub config: HabitlogConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load config, open the database and wire the services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;

        let default_timezone = match parse_timezone(&config.default_timezone) {
            Ok(tz) => tz,
            Err(err) => {
                tracing::warn!("default_timezone in config.toml: {err}, using UTC");
                Tz::UTC
            }
        };

        let db_pool = DatabasePool::open(&data_dir).await?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sessions = SessionStore::new(clock.clone(), config.session_ttl());

        let timezones = Arc::new(TimezoneResolver::new(
            SqliteUserRepository::new(db_pool.clone()),
            default_timezone,
        ));
        let records = SqliteRecordRepository::new(db_pool.clone());

        let conversation = ConversationService::new(
            sessions.clone(),
            records.clone(),
            timezones.clone(),
            config.restart_policy,
        );
        let stats = StatsAggregator::new(records, timezones.clone());

        tracing::debug!(
            data_dir = %data_dir.display(),
            ttl_minutes = config.session_ttl().num_minutes(),
            cleanup_secs = config.cleanup_interval().as_secs(),
            restart_policy = %config.restart_policy,
            default_timezone = default_timezone.name(),
            "application state initialized"
        );

        Ok(Self {
            conversation: Arc::new(conversation),
            stats: Arc::new(stats),
            timezones,
            sessions,
            clock,
            config,
            data_dir,
        })
    }

    /// A reaper over this state's session store at the configured interval.
    pub fn reaper(&self) -> SessionReaper {
        SessionReaper::new(self.sessions.clone(), self.config.cleanup_interval())
    }
}
