use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use ipnet::IpNet;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::access::ResourceGroupIndex;
use crate::auth::{TrackTokenService, TrustedNetworks, UserStore};
use crate::config::{AppConfig, SecurityConfig};
use crate::handlers;
use crate::jbrowse::{MetadataStore, UriRewriter};
use crate::middleware::session_gateway;
use crate::session::{MemorySessionStore, SessionStore};

/// Shared, read-mostly state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub groups: Arc<ResourceGroupIndex>,
    pub metadata: Arc<MetadataStore>,
    pub tokens: Arc<TrackTokenService>,
    pub rewriter: Arc<UriRewriter>,
    pub trusted: Arc<TrustedNetworks>,
    /// Peers whose `X-Forwarded-For` is honoured.
    pub proxies: Arc<Vec<IpNet>>,
    pub users: Arc<UserStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Token keys are read from the configured paths here and nowhere else.
    pub fn new(config: AppConfig) -> Self {
        let tokens = TrackTokenService::from_key_files(
            config.tokens.private_key_path.as_deref(),
            config.tokens.public_key_path.as_deref(),
            config.token_ttl(),
        );
        Self::with_tokens(config, tokens)
    }

    pub fn with_tokens(config: AppConfig, tokens: TrackTokenService) -> Self {
        let idle = chrono::Duration::minutes(config.access.session_idle_minutes);
        Self {
            groups: Arc::new(ResourceGroupIndex::new(&config.access.groups_file)),
            metadata: Arc::new(MetadataStore::new(&config.tracks.metadata_dir)),
            rewriter: Arc::new(UriRewriter::new(&config.tracks.site_prefix)),
            trusted: Arc::new(config.trusted_networks()),
            proxies: Arc::new(config.trusted_proxies()),
            users: Arc::new(UserStore::new(&config.access.users_file)),
            sessions: Arc::new(MemorySessionStore::new(idle)),
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let gated = Router::new()
        .merge(public_routes())
        .merge(protected_routes())
        .merge(elevated_routes())
        .layer(middleware::from_fn_with_state(state.clone(), session_gateway));

    let app = gated
        // Track server trusts tokens only, never the session
        .merge(track_routes())
        .layer(CookieManagerLayer::new())
        .layer(cors_layer(&state.config.security));

    let app = if state.config.server.enable_request_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    };

    app.with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public::{index, session};

    Router::new()
        .route("/", get(index::root))
        .route("/health", get(index::health))
        .route("/access_denied", get(index::access_denied))
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/api/auth/whoami", get(session::whoami))
}

fn protected_routes() -> Router<AppState> {
    use handlers::protected::{groups, jbrowse, organisms};

    Router::new()
        .route("/organisms/:organism", get(organisms::organism_get))
        .route("/organisms/:organism/:assembly", get(organisms::assembly_get))
        .route("/groups/:group", get(groups::group_get))
        .route("/api/jbrowse2/config", get(jbrowse::config_get))
}

fn elevated_routes() -> Router<AppState> {
    use handlers::elevated::access;

    Router::new().route("/admin/api/access", get(access::access_check))
}

fn track_routes() -> Router<AppState> {
    use handlers::tracks::files;

    Router::new().route("/api/jbrowse2/tracks", get(files::track_file_get))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
}
