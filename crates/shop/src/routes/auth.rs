//! Authentication route handlers.
//!
//! Email/password login and signup against the `users` table. Failed
//! submissions re-render the form with status 422 and keep the entered email.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::Form;
use crate::middleware::{Flash, ViewContext, flash, log_in, log_out};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: ViewContext,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub ctx: ViewContext,
    pub email: String,
    pub error: Option<String>,
}

/// Split an auth failure into a form message or a server error.
fn form_error(err: AuthError) -> Result<String> {
    match err.user_message() {
        Some(message) => Ok(message),
        None => Err(AppError::Auth(err)),
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// `GET /login`
pub async fn login_page(ctx: ViewContext, flash: Flash) -> Result<impl IntoResponse> {
    Ok(LoginTemplate {
        ctx,
        email: String::new(),
        error: flash.take_first(flash::ERROR).await?,
        success: flash.take_first(flash::SUCCESS).await?,
    })
}

/// `POST /login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ctx: ViewContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            log_in(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            let message = form_error(err)?;
            tracing::info!("Login rejected");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                LoginTemplate {
                    ctx,
                    email: form.email,
                    error: Some(message),
                    success: None,
                },
            )
                .into_response())
        }
    }
}

/// `POST /logout`
pub async fn logout(session: Session) -> Result<impl IntoResponse> {
    log_out(&session).await?;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Signup Routes
// =============================================================================

/// `GET /signup`
pub async fn signup_page(ctx: ViewContext, flash: Flash) -> Result<impl IntoResponse> {
    Ok(SignupTemplate {
        ctx,
        email: String::new(),
        error: flash.take_first(flash::ERROR).await?,
    })
}

/// `POST /signup`
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    ctx: ViewContext,
    flash: Flash,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .signup(&form.email, &form.password, &form.confirm_password)
        .await
    {
        Ok(_) => {
            flash
                .push(flash::SUCCESS, "Account created. Please log in.")
                .await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(err) => {
            let message = form_error(err)?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                SignupTemplate {
                    ctx,
                    email: form.email,
                    error: Some(message),
                },
            )
                .into_response())
        }
    }
}
