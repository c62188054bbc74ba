//! HTTP surface: `POST /graphql`, GraphiQL on `GET /graphql`

use async_graphql::http::GraphiQLSource;
use axum::{
    http::HeaderMap,
    response::{Html, IntoResponse},
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{extract_token, AuthToken};
use crate::dataloaders::AddressLoader;
use crate::format::GraphQLReply;
use crate::repository::UserRepository;
use crate::schema::{build_schema, AppSchema};
use crate::service::UserService;

pub const GRAPHQL_PATH: &str = "/graphql";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub schema: AppSchema,
    repository: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(service: UserService) -> Self {
        let repository = service.repository();
        Self {
            schema: build_schema(service),
            repository,
        }
    }
}

/// Run one GraphQL request with a fresh per-request address loader
pub async fn execute(
    state: &AppState,
    token: Option<AuthToken>,
    request: async_graphql::Request,
) -> GraphQLReply {
    let mut request = request.data(AddressLoader::for_repository(state.repository.clone()));
    if let Some(token) = token {
        request = request.data(token);
    }

    GraphQLReply::from(state.schema.execute(request).await)
}

pub async fn graphql_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<async_graphql::Request>,
) -> Json<GraphQLReply> {
    Json(execute(&state, extract_token(&headers), request).await)
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, get(graphiql).post(graphql_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
