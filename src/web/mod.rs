//! Web server module
//!
//! Exposes the border pipeline over HTTP.
//!
//! # Endpoints
//!
//! - `GET /` - welcome message
//! - `GET /health` - health check
//! - `POST /process-image/` - multipart upload (`file`), optional
//!   `border_thickness`, `border_color` (`"R,G,B,A"`) and `margin_size` as
//!   query parameters or form fields. Responds with the PNG; its metadata is
//!   in the `X-Image-Metadata` header.
//!
//! # Usage
//!
//! ```bash
//! cargo build --features web
//! image-border serve --port 8000
//! ```

mod routes;
mod server;

pub use routes::{api_routes, AppError, AppState, ProcessParams, METADATA_HEADER};
pub use server::{ServerConfig, WebServer};
