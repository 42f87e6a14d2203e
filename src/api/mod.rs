//! HTTP interface - axum routes over the core operations.
//!
//! Handlers only extract input, call into [`crate::core`] and shape the
//! response; every rule lives in the core layer.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod recipes;
pub mod users;

use crate::{
    config::AppConfig,
    core::pagination::{PageParams, PageWindow},
    errors::Result,
};
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Loaded application configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Creates the shared state.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Page window for a request, using the configured default page size.
    #[must_use]
    pub fn page_window(&self, params: PageParams) -> PageWindow {
        PageWindow::new(params, self.config.server.page_size)
    }
}

/// Builds the application router with every route nested under `/api`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/recipes", get(recipes::list).post(recipes::create))
        .route(
            "/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/:id",
            get(recipes::retrieve)
                .patch(recipes::update)
                .delete(recipes::destroy),
        )
        .route(
            "/recipes/:id/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .route("/ingredients", get(catalog::list_ingredients))
        .route("/ingredients/:id", get(catalog::get_ingredient))
        .route("/tags", get(catalog::list_tags))
        .route("/tags/:id", get(catalog::get_tag))
        .route("/users", get(users::list).post(users::register))
        .route("/users/me", get(users::me))
        .route("/users/set_password", post(users::set_password))
        .route("/users/subscriptions", get(users::subscriptions))
        .route("/users/:id", get(users::retrieve))
        .route(
            "/users/:id/subscribe",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route("/auth/token/login", post(auth::login))
        .route("/auth/token/logout", post(auth::logout));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config.server.address.clone();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn setup_app() -> crate::errors::Result<(Router, DatabaseConnection)> {
        let db = setup_test_db().await?;
        let app = router(AppState::new(db.clone(), AppConfig::default()));
        Ok((app, db))
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Token {token}"));
        }
        match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn login(app: &Router, email: &str) -> String {
        let response = send(
            app,
            request(
                Method::POST,
                "/api/auth/token/login",
                None,
                Some(json!({ "email": email, "password": TEST_PASSWORD })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["auth_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_anonymous_can_browse() -> crate::errors::Result<()> {
        let (app, db) = setup_app().await?;
        let author = create_test_user(&db, "alice").await?;
        let (tag, salt, _) = create_test_catalog(&db).await?;
        let recipe =
            create_named_recipe(&db, &author, "Porridge", &[tag.id], &[(salt.id, 10)]).await?;

        let response = send(&app, request(Method::GET, "/api/recipes", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["count"], 1);
        assert_eq!(page["next"], Value::Null);
        let first = &page["results"][0];
        assert_eq!(first["id"], recipe.id);
        assert_eq!(first["is_favorited"], false);
        assert_eq!(first["author"]["username"], "alice");
        assert_eq!(first["ingredients"][0]["amount"], 10);
        assert_eq!(first["tags"][0]["slug"], "breakfast");

        let response = send(&app, request(Method::GET, "/api/ingredients?name=sa", None, None)).await;
        let ingredients = body_json(response).await;
        assert_eq!(ingredients.as_array().unwrap().len(), 1);
        assert_eq!(ingredients[0]["name"], "Salt");

        Ok(())
    }

    #[tokio::test]
    async fn test_huge_page_numbers_return_empty_pages() -> crate::errors::Result<()> {
        let (app, db) = setup_app().await?;
        let reader = create_test_user(&db, "reader").await?;
        let token = login(&app, &reader.email).await;

        for uri in [
            "/api/recipes?page=1000000000000000000&limit=100",
            "/api/users?page=18446744073709551615&limit=100",
            "/api/users/subscriptions?page=1000000000000000000&limit=100",
        ] {
            let response = send(&app, request(Method::GET, uri, Some(&token), None)).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let page = body_json(response).await;
            assert_eq!(page["results"], json!([]), "{uri}");
            assert_eq!(page["next"], Value::Null, "{uri}");
        }

        let response = send(
            &app,
            request(Method::GET, "/api/recipes?page=1000000000000000000", None, None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        Ok(())
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() -> crate::errors::Result<()> {
        let (app, _db) = setup_app().await?;

        let response = send(&app, request(Method::GET, "/api/users/me", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(response).await["detail"].is_string());

        let response = send(&app, request(Method::GET, "/api/users/me", Some("bogus"), None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app,
            request(Method::POST, "/api/recipes/1/favorite", None, None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        Ok(())
    }

    #[tokio::test]
    async fn test_register_login_and_publish() -> crate::errors::Result<()> {
        let (app, db) = setup_app().await?;
        let (tag, salt, pepper) = create_test_catalog(&db).await?;

        let response = send(
            &app,
            request(
                Method::POST,
                "/api/users",
                None,
                Some(json!({
                    "email": "chef@example.com",
                    "username": "chef",
                    "first_name": "Chef",
                    "last_name": "Cook",
                    "password": TEST_PASSWORD,
                })),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert!(created.get("password_hash").is_none());

        let token = login(&app, "chef@example.com").await;

        let payload = json!({
            "name": "Pepper soup",
            "image": "data:image/png;base64,AAAA",
            "text": "Boil",
            "cooking_time": 15,
            "tags": [tag.id],
            "ingredients": [{ "id": salt.id, "amount": 3 }, { "id": pepper.id, "amount": 1 }],
        });
        let response = send(&app, request(Method::POST, "/api/recipes", Some(&token), Some(payload))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let recipe = body_json(response).await;
        assert_eq!(recipe["author"]["username"], "chef");
        assert_eq!(recipe["ingredients"].as_array().unwrap().len(), 2);

        let invalid = json!({
            "name": "Nothing",
            "image": "",
            "text": "",
            "cooking_time": 15,
            "tags": [],
            "ingredients": [],
        });
        let response = send(&app, request(Method::POST, "/api/recipes", Some(&token), Some(invalid))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, request(Method::POST, "/api/auth/token/logout", Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, request(Method::GET, "/api/users/me", Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        Ok(())
    }

    #[tokio::test]
    async fn test_cart_toggle_and_download() -> crate::errors::Result<()> {
        let (app, db) = setup_app().await?;
        let author = create_test_user(&db, "alice").await?;
        let (tag, salt, _) = create_test_catalog(&db).await?;
        let recipe_id = create_named_recipe(&db, &author, "Porridge", &[tag.id], &[(salt.id, 10)])
            .await?
            .id;
        let token = login(&app, &author.email).await;

        let response = send(
            &app,
            request(Method::GET, "/api/recipes/download_shopping_cart", Some(&token), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let uri = format!("/api/recipes/{recipe_id}/shopping_cart");
        let response = send(&app, request(Method::POST, &uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["name"], "Porridge");

        let response = send(&app, request(Method::POST, &uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            request(Method::GET, "/api/recipes/download_shopping_cart", Some(&token), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=shopping_cart.txt"
        );
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(text, "Salt (g) — 10\n");

        let response = send(&app, request(Method::DELETE, &uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, request(Method::DELETE, &uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        Ok(())
    }

    #[tokio::test]
    async fn test_non_author_cannot_edit() -> crate::errors::Result<()> {
        let (app, db) = setup_app().await?;
        let author = create_test_user(&db, "alice").await?;
        let (tag, salt, _) = create_test_catalog(&db).await?;
        let recipe = create_named_recipe(&db, &author, "Porridge", &[tag.id], &[(salt.id, 10)]).await?;
        let stranger = create_test_user(&db, "mallory").await?;
        let token = login(&app, &stranger.email).await;

        let uri = format!("/api/recipes/{}", recipe.id);
        let response = send(
            &app,
            request(Method::PATCH, &uri, Some(&token), Some(json!({ "name": "Mine now" }))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, request(Method::DELETE, &uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, request(Method::GET, "/api/recipes/999", None, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "Recipe 999 not found");

        Ok(())
    }

    #[tokio::test]
    async fn test_subscribe_flow() -> crate::errors::Result<()> {
        let (app, db) = setup_app().await?;
        let reader = create_test_user(&db, "reader").await?;
        let chef = create_test_user(&db, "chef").await?;
        let token = login(&app, &reader.email).await;

        let uri = format!("/api/users/{}/subscribe?recipes_limit=2", chef.id);
        let response = send(&app, request(Method::POST, &uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let profile = body_json(response).await;
        assert_eq!(profile["is_subscribed"], true);
        assert_eq!(profile["recipes_count"], 0);

        let response = send(&app, request(Method::POST, &uri, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            request(Method::GET, "/api/users/subscriptions", Some(&token), None),
        )
        .await;
        let page = body_json(response).await;
        assert_eq!(page["count"], 1);
        assert_eq!(page["results"][0]["username"], "chef");

        let own = format!("/api/users/{}/subscribe", reader.id);
        let response = send(&app, request(Method::POST, &own, Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        Ok(())
    }
}
