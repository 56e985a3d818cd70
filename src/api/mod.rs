use crate::{
    api::handlers::{auth, health, root, users},
    cache::{CodeStore, MemoryCodeStore, RedisCodeStore},
    credentials::TokenIssuer,
    storage::PgUserStore,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use url::Url;

pub mod email;
pub mod handlers;

use email::{EmailSender, LogEmailSender, SmtpConfig, SmtpEmailSender};

/// External collaborators chosen at startup.
#[derive(Debug)]
pub struct Backends {
    pub dsn: SecretString,
    pub redis_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub cors_origin: Option<String>,
}

/// Build the API router with every route and the request-scoped layers.
pub fn router(auth_state: Arc<auth::AuthState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register::register))
        .route("/verify", post(auth::register::verify))
        .route("/login", post(auth::login::login))
        .route("/forgot-password", post(auth::recovery::forgot_password))
        .route(
            "/verify-forgot-password",
            post(auth::recovery::verify_forgot_password),
        )
        .route("/update-password", post(auth::recovery::update_password));

    let user_routes = Router::new()
        .route("/", post(users::create_user))
        .route("/me", get(users::me))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .nest("/v1/auth", auth_routes)
        .nest("/v1/users", user_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    auth_config: auth::AuthConfig,
    token_secret: SecretString,
    backends: Backends,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(backends.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let codes: Arc<dyn CodeStore> = match backends.redis_url.as_deref() {
        Some(url) => Arc::new(RedisCodeStore::connect(url).await?),
        None => {
            warn!("No Redis URL configured, verification codes are kept in process memory");
            Arc::new(MemoryCodeStore::new())
        }
    };

    let emails: Arc<dyn EmailSender> = match backends.smtp.as_ref() {
        Some(smtp) => {
            info!("Sending email through {}:{}", smtp.host(), smtp.port());
            Arc::new(SmtpEmailSender::new(smtp)?)
        }
        None => {
            warn!("No SMTP host configured, emails are only logged");
            Arc::new(LogEmailSender)
        }
    };

    let auth_state = Arc::new(auth::AuthState::new(
        auth_config,
        Arc::new(PgUserStore::new(pool)),
        codes,
        TokenIssuer::new(token_secret),
        emails,
    ));

    let cors = cors_layer(backends.cors_origin.as_deref())?;
    let app = router(auth_state).layer(cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {err}");
                std::future::pending::<()>().await;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);
    Ok(match origin {
        Some(origin) => layer.allow_origin(AllowOrigin::exact(frontend_origin(origin)?)),
        None => layer.allow_origin(AllowOrigin::any()),
    })
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_drops_path() -> Result<()> {
        let origin = frontend_origin("https://blog.example.com:8443/app/")?;
        assert_eq!(origin, "https://blog.example.com:8443");
        Ok(())
    }

    #[test]
    fn frontend_origin_requires_host() {
        assert!(frontend_origin("not a url").is_err());
    }

    #[test]
    fn cors_layer_accepts_missing_origin() {
        assert!(cors_layer(None).is_ok());
        assert!(cors_layer(Some("https://blog.example.com")).is_ok());
        assert!(cors_layer(Some("::nope")).is_err());
    }
}
