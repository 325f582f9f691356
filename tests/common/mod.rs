use std::sync::Arc;

use labquote_api::{
    auth::{CurrentUser, Role},
    config::AppConfig,
    db, events,
    handlers::AppServices,
    mailer::{LogMailer, Mailer},
    AppState,
};
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with the full
/// migrated schema. Services are exercised directly.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_mailer(Arc::new(LogMailer)).await
    }

    /// Same, but with a caller-supplied mailer implementation.
    pub async fn with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // A single pooled connection keeps the in-memory database alive and
        // shared for the whole test.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            mailer,
            &cfg,
        );

        Self {
            state: AppState {
                db: db_arc,
                config: cfg,
                event_sender,
                services,
            },
            _event_task: event_task,
        }
    }
}

/// A fresh personal-scope principal.
pub fn member() -> CurrentUser {
    CurrentUser {
        user_id: Uuid::new_v4(),
        organization_id: None,
        role: Role::Member,
    }
}

/// A fresh admin principal inside the given organization.
#[allow(dead_code)]
pub fn org_admin(organization_id: Uuid) -> CurrentUser {
    CurrentUser {
        user_id: Uuid::new_v4(),
        organization_id: Some(organization_id),
        role: Role::Admin,
    }
}

/// A fresh non-admin principal inside the given organization.
#[allow(dead_code)]
pub fn org_member(organization_id: Uuid) -> CurrentUser {
    CurrentUser {
        user_id: Uuid::new_v4(),
        organization_id: Some(organization_id),
        role: Role::Member,
    }
}
