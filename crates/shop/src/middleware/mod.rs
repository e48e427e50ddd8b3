//! HTTP middleware stack for the shop.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (binary only)
//! 2. `TraceLayer` span, request ID
//! 3. Request body limit
//! 4. Static files (`/images`, public directory)
//! 5. Session layer (tower-sessions)
//! 6. Error page renderer
//! 7. Upload (multipart to stored image + urlencoded form)
//! 8. CSRF guard
//! 9. Flash messages
//! 10. User hydration

pub mod auth;
pub mod context;
pub mod csrf;
pub mod error_page;
pub mod flash;
pub mod request_id;
pub mod session;
pub mod upload;

pub use auth::{CurrentUser, OptionalUser, RequireUser, hydrate_user, log_in, log_out};
pub use context::ViewContext;
pub use csrf::{CsrfToken, csrf_guard};
pub use error_page::render_error_pages;
pub use flash::{Flash, attach_flash};
pub use request_id::{request_span, stamp_request_id};
pub use session::{create_migrated_session_store, create_session_layer};
pub use upload::{MaybeImage, UploadedImage, delete_image, handle_upload};
