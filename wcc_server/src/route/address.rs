use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use wcc_core::garbage_client::Address;

use crate::{error::ApiError, route::SharedPipeline};

#[derive(Debug, Clone, Deserialize)]
pub struct AddressQueryParams {
    query: String,
}

/// Look up the identifiers of addresses matching the `query`.
pub async fn handler(
    State(pipeline): State<SharedPipeline>,
    Query(query_params): Query<AddressQueryParams>,
) -> Result<Json<Vec<Address>>, ApiError> {
    let addresses = pipeline.search_address(&query_params.query).await?;
    Ok(Json(addresses))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::util::ServiceExt;

    use crate::route::test_utils::{body_to_string, get, test_app};

    #[tokio::test]
    async fn test_search() {
        let (app, _client, _dir) = test_app();
        let response = app.oneshot(get("/address?query=Storgata%201")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_string(response.into_body()).await;
        assert_eq!(body, r#"[{"id":"123","label":"Storgata 1, Oslo"}]"#);
    }

    #[tokio::test]
    async fn test_missing_query() {
        let (app, _client, _dir) = test_app();
        let missing = app.clone().oneshot(get("/address")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        let blank = app.oneshot(get("/address?query=%20")).await.unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    }
}
