// Router assembly.
//
// Public routes need nothing. Everything under `protected_routes` runs behind
// `jwt_auth_middleware`; admin routes additionally carry a per-handler
// `require_permission` guard so GET and PUT on one path can demand different
// codes.

use axum::{
    handler::Handler,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::config;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, require_permission};
use crate::presence::{chat_hub, PresenceHub};
use crate::rbac::codes;

/// Shared state handed to handlers that need the live hub
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<PresenceHub>,
}

impl AppState {
    pub fn new(hub: Arc<PresenceHub>) -> Self {
        Self { hub }
    }
}

/// Wrap a handler with a permission check
macro_rules! require {
    ($handler:expr, $code:expr) => {
        $handler.layer(middleware::from_fn_with_state($code, require_permission))
    };
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/hubs/chat", get(chat_hub))
        .merge(auth_public_routes())
        .merge(protected_routes())
        .fallback(public::system::not_found)
        .with_state(state);

    if let Some(cors) = cors_layer() {
        router = router.layer(cors);
    }
    if config().server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(session_routes())
        .merge(user_routes())
        .merge(role_routes())
        .merge(permission_routes())
        .merge(menu_routes())
        .merge(online_user_routes())
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn session_routes() -> Router<AppState> {
    use protected::session;

    Router::new()
        .route("/api/auth/me", get(session::me))
        .route("/api/auth/menus", get(session::menus))
        .route("/api/auth/password", put(session::change_password))
        .route("/api/auth/logout", post(session::logout))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route(
            "/api/users",
            get(require!(users::list, codes::USER_VIEW)).post(require!(users::create, codes::USER_CREATE)),
        )
        .route(
            "/api/users/:id",
            get(require!(users::get, codes::USER_VIEW))
                .put(require!(users::update, codes::USER_UPDATE))
                .delete(require!(users::delete, codes::USER_DELETE)),
        )
        .route("/api/users/:id/status", put(require!(users::set_status, codes::USER_UPDATE)))
        .route(
            "/api/users/:id/password",
            put(require!(users::reset_password, codes::USER_UPDATE)),
        )
        .route(
            "/api/users/:id/roles",
            get(require!(users::roles, codes::USER_VIEW)).put(require!(users::set_roles, codes::USER_ASSIGN_ROLE)),
        )
        .route(
            "/api/users/:id/permissions",
            get(require!(users::permissions, codes::USER_VIEW))
                .put(require!(users::set_permissions, codes::USER_ASSIGN_PERMISSION)),
        )
        .route(
            "/api/users/:id/effective-permissions",
            get(require!(users::effective_permissions, codes::USER_VIEW)),
        )
}

fn role_routes() -> Router<AppState> {
    use protected::roles;

    Router::new()
        .route(
            "/api/roles",
            get(require!(roles::list, codes::ROLE_VIEW)).post(require!(roles::create, codes::ROLE_CREATE)),
        )
        .route("/api/roles/all", get(require!(roles::list_enabled, codes::ROLE_VIEW)))
        .route(
            "/api/roles/:id",
            get(require!(roles::get, codes::ROLE_VIEW))
                .put(require!(roles::update, codes::ROLE_UPDATE))
                .delete(require!(roles::delete, codes::ROLE_DELETE)),
        )
        .route(
            "/api/roles/:id/permissions",
            get(require!(roles::permissions, codes::ROLE_VIEW))
                .put(require!(roles::set_permissions, codes::ROLE_ASSIGN_PERMISSION)),
        )
}

fn permission_routes() -> Router<AppState> {
    use protected::permissions;

    Router::new()
        .route(
            "/api/permissions",
            get(require!(permissions::list, codes::PERMISSION_VIEW))
                .post(require!(permissions::create, codes::PERMISSION_CREATE)),
        )
        .route(
            "/api/permissions/:id",
            get(require!(permissions::get, codes::PERMISSION_VIEW))
                .put(require!(permissions::update, codes::PERMISSION_UPDATE))
                .delete(require!(permissions::delete, codes::PERMISSION_DELETE)),
        )
}

fn menu_routes() -> Router<AppState> {
    use protected::menus;

    Router::new()
        .route(
            "/api/menus",
            get(require!(menus::list, codes::MENU_VIEW)).post(require!(menus::create, codes::MENU_CREATE)),
        )
        .route("/api/menus/tree", get(require!(menus::tree, codes::MENU_VIEW)))
        .route(
            "/api/menus/:id",
            get(require!(menus::get, codes::MENU_VIEW))
                .put(require!(menus::update, codes::MENU_UPDATE))
                .delete(require!(menus::delete, codes::MENU_DELETE)),
        )
}

fn online_user_routes() -> Router<AppState> {
    use protected::online_users;

    Router::new()
        .route("/api/online-users", get(require!(online_users::list, codes::ONLINE_VIEW)))
        .route(
            "/api/online-users/count",
            get(require!(online_users::count, codes::ONLINE_VIEW)),
        )
        .route(
            "/api/online-users/:id",
            delete(require!(online_users::kick, codes::ONLINE_KICK)),
        )
}

/// Development allows any origin; other profiles use the configured list
fn cors_layer() -> Option<CorsLayer> {
    let cfg = config();
    if !cfg.security.enable_cors {
        return None;
    }

    if crate::is_development!() || cfg.security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = cfg
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
