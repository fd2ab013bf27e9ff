//! Account Store Server - digital credential storefront backend
//!
//! # Architecture overview
//!
//! - **Database** (`db`): embedded SurrealDB storage, models and repositories
//! - **Auth** (`auth`): JWT + Argon2 authentication, centralized access guard
//! - **Orders** (`orders`): the reservation engine and the expiry sweeper
//! - **HTTP API** (`api`): RESTful routes and handlers
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/          # configuration, state, server, background tasks
//! ├── auth/          # JWT auth, access guard
//! ├── db/            # database service, models, repositories
//! ├── orders/        # reservation engine, expiry sweeper
//! ├── api/           # HTTP routes and handlers
//! ├── routes/        # router assembly
//! └── utils/         # logging, validation, time
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod orders;
pub mod routes;
pub mod utils;

// Re-export common types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::{CartLine, ReservationEngine};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
