// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, anime, auth, comments, community, profile},
    state::AppState,
    utils::session::{admin_middleware, session_middleware},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, anime, comments, posts, profile, admin).
/// * Applies global middleware (Trace, CORS, Session).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let anime_routes = Router::new()
        .route("/", get(anime::list_anime))
        .route("/{id}", get(anime::get_anime))
        .route("/{id}/episodes", get(anime::list_episodes))
        .route("/{id}/episodes/{number}", get(anime::get_episode));

    // Reads are public; writes take `AuthUser` and answer 401 without a session.
    let comment_routes = Router::new()
        .route(
            "/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/render", get(comments::render_comments))
        .route(
            "/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/{id}/like", post(comments::like_comment))
        .route("/{id}/dislike", post(comments::dislike_comment))
        .route("/{id}/spoilers/{segment}", get(comments::reveal_spoiler));

    let post_routes = Router::new()
        .route("/", get(community::list_posts).post(community::create_post))
        .route(
            "/{id}",
            get(community::get_post).delete(community::delete_post),
        )
        .route("/{id}/like", post(community::toggle_post_like));

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me).put(profile::update_me))
        .route("/comments", get(profile::list_my_comments));

    let user_routes = Router::new().route("/{id}", get(profile::get_user));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/bulk-delete", post(admin::bulk_delete_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/anime", post(admin::create_anime))
        .route(
            "/anime/{id}",
            put(admin::update_anime).delete(admin::delete_anime),
        )
        .route("/anime/{id}/episodes", post(admin::create_episode))
        .route("/anime/{id}/episodes/preview", post(admin::preview_episodes))
        .route("/anime/{id}/episodes/bulk", post(admin::bulk_create_episodes))
        .route(
            "/episodes/{id}",
            put(admin::update_episode).delete(admin::delete_episode),
        )
        .layer(middleware::from_fn(admin_middleware));

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/anime", anime_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/users", user_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    session_middleware,
                )),
        )
        .with_state(state)
}
