use crate::config::{StorageBackend, TreasuryConfig};
use crate::handlers;
use crate::services::notifier::{EmailProvider, SmtpProvider};
use crate::services::storage::{FileStore, LocalStorage, S3Storage, Storage};
use crate::services::Database;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use treasury_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: TreasuryConfig,
    pub db: Database,
    pub store: FileStore,
    pub mailer: Arc<dyn EmailProvider>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: TreasuryConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            e
        })?;

        let storage: Arc<dyn Storage> = match config.storage.backend {
            StorageBackend::Local => {
                let path = config
                    .storage
                    .local_path
                    .clone()
                    .unwrap_or_else(|| "uploads".to_string());
                Arc::new(LocalStorage::new(&path).await.map_err(|e| {
                    tracing::error!("Failed to initialize local storage at {}: {}", path, e);
                    e
                })?)
            }
            StorageBackend::S3 => {
                let bucket = config.storage.s3_bucket.clone().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "STORAGE_S3_BUCKET is required for the s3 backend"
                    ))
                })?;
                let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
                if let Some(region) = config.storage.s3_region.clone() {
                    loader = loader.region(aws_config::Region::new(region));
                }
                let sdk_config = loader.load().await;
                let client = aws_sdk_s3::Client::new(&sdk_config);
                Arc::new(S3Storage::new(
                    client,
                    bucket,
                    config.storage.public_base_url.clone(),
                ))
            }
        };

        let mailer: Arc<dyn EmailProvider> =
            Arc::new(SmtpProvider::new(config.smtp.clone()).map_err(|e| {
                tracing::error!("Failed to initialize SMTP provider: {}", e);
                AppError::EmailError(e.to_string())
            })?);

        let state = AppState {
            config: config.clone(),
            db: db.clone(),
            store: FileStore::new(storage),
            mailer,
        };

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route("/treasury/invoices/stage", post(handlers::stage_invoice))
            .route(
                "/treasury/payments",
                get(handlers::list_payments).post(handlers::create_payment),
            )
            .route(
                "/treasury/payments/:id/status",
                put(handlers::update_payment_status),
            )
            .route("/treasury/payments/:id", delete(handlers::delete_payment))
            .route(
                "/treasury/payments/repair-voucher-links",
                post(handlers::repair_links),
            )
            .route("/scheduled-payments/confirm", post(handlers::confirm_payment))
            .route(
                "/scheduled-payments/:id/status",
                put(handlers::update_payment_status),
            )
            .route(
                "/scheduled-payments/:id/documents",
                get(handlers::payment_documents),
            )
            .route(
                "/scheduled-payments/:id/upload-voucher",
                post(handlers::upload_voucher),
            )
            .route("/payment-vouchers", get(handlers::list_vouchers))
            .route(
                "/payment-vouchers/:id",
                get(handlers::get_voucher)
                    .put(handlers::update_voucher)
                    .delete(handlers::delete_voucher),
            )
            .route(
                "/payment-vouchers/:id/status",
                put(handlers::update_voucher_status),
            )
            .route("/payment-vouchers/:id/pay", post(handlers::pay_voucher))
            .route(
                "/payment-vouchers/:id/notifications",
                get(handlers::voucher_notifications),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
