pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;

pub use commands::organize_commands::{
    batch_organize, execute_rename, preview_rename, BatchOrganizeRequest, BatchOrganizeResponse,
    ExecuteRenameRequest, PreviewRenameRequest,
};
pub use commands::report_commands::{
    build_ownership_outline, build_ownership_report, drive_status, DriveStatus,
};
pub use config::AppConfig;
pub use error::AppError;
pub use state::{AppState, Credentials, Session};

/// Installs the global fmt subscriber. `RUST_LOG` wins over the built-in filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("drivetidy=debug,info")),
        )
        .try_init();
}
