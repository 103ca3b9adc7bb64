use axum::{
    extract::{Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use wcc_core::{cache_key::QueryParams, Error};

use crate::{error::ApiError, route::SharedPipeline};

static HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Handle calendar requests.
///
/// The `addressId` must be given in the query string, `format` may be `ics` (default) or `text`.
/// Every other parameter is part of the cache key.
pub async fn handler(
    State(pipeline): State<SharedPipeline>,
    request_headers: HeaderMap,
    Query(query_params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    let served = pipeline.calendar(&query_params).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        LAST_MODIFIED,
        header_value(&served.last_modified.format(HTTP_DATE_FORMAT).to_string())?,
    );
    if not_modified_since(&request_headers, served.last_modified) {
        return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(served.content_type()));
    if let Some(filename) = served.attachment_filename() {
        headers.insert(
            CONTENT_DISPOSITION,
            header_value(&format!("attachment; filename=\"{filename}\""))?,
        );
    }
    Ok((headers, served.body).into_response())
}

/// Whether the client's copy, per `If-Modified-Since`, is at least as new as the artifact.
fn not_modified_since(request_headers: &HeaderMap, last_modified: DateTime<Utc>) -> bool {
    request_headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
        .is_some_and(|since| last_modified.timestamp() <= since.timestamp())
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|err| ApiError(Error::unknown(format!("invalid header value {value:?}: {err}"))))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use axum::body::Body;
    use tower::util::ServiceExt;

    use super::*;
    use crate::route::test_utils::{body_to_string, get, test_app};

    #[tokio::test]
    async fn test_calendar() {
        let (app, _client, _dir) = test_app();
        let response = app.oneshot(get("/calendar?addressId=123")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/calendar; charset=utf-8"
        );
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"calendar.ics\""
        );
        let last_modified = response.headers()[LAST_MODIFIED].to_str().unwrap();
        assert!(last_modified.ends_with(" GMT"));
        assert!(DateTime::parse_from_rfc2822(last_modified).is_ok());
        let body = body_to_string(response.into_body()).await;
        assert!(body.starts_with("BEGIN:VCALENDAR"));
        assert!(body.contains("SUMMARY:Restafval"));
        assert!(body.contains("TRIGGER:-PT4H\r\n"));
    }

    #[tokio::test]
    async fn test_text_format_and_cache_hit() {
        let (app, client, _dir) = test_app();
        let ics = app
            .clone()
            .oneshot(get("/calendar?addressId=123&format=ics"))
            .await
            .unwrap();
        let text = app
            .oneshot(get("/calendar?format=text&addressId=123"))
            .await
            .unwrap();
        assert_eq!(client.requests(), 1);
        assert_eq!(text.status(), StatusCode::OK);
        assert_eq!(text.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert!(text.headers().get(CONTENT_DISPOSITION).is_none());
        assert_eq!(text.headers()[LAST_MODIFIED], ics.headers()[LAST_MODIFIED]);
        let ics_body = body_to_string(ics.into_body()).await;
        let text_body = body_to_string(text.into_body()).await;
        assert_eq!(ics_body, text_body);
    }

    #[tokio::test]
    async fn test_conditional_get() {
        let (app, _client, _dir) = test_app();
        let first = app
            .clone()
            .oneshot(get("/calendar?addressId=123"))
            .await
            .unwrap();
        let last_modified = first.headers()[LAST_MODIFIED].clone();
        let request = Request::builder()
            .uri("/calendar?addressId=123")
            .header(IF_MODIFIED_SINCE, last_modified.clone())
            .body(Body::empty())
            .unwrap();
        let second = app.clone().oneshot(request).await.unwrap();
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(second.headers()[LAST_MODIFIED], last_modified);
        assert!(body_to_string(second.into_body()).await.is_empty());

        let request = Request::builder()
            .uri("/calendar?addressId=123")
            .header(IF_MODIFIED_SINCE, "Mon, 01 Jan 2001 00:00:00 GMT")
            .body(Body::empty())
            .unwrap();
        let third = app.oneshot(request).await.unwrap();
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_client_errors() {
        let (app, client, _dir) = test_app();
        let missing = app.clone().oneshot(get("/calendar")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert!(body_to_string(missing.into_body())
            .await
            .contains("addressId"));
        let format = app
            .oneshot(get("/calendar?addressId=123&format=pdf"))
            .await
            .unwrap();
        assert_eq!(format.status(), StatusCode::BAD_REQUEST);
        assert_eq!(client.requests(), 0);
    }

    #[test]
    fn test_not_modified_since() {
        let last_modified = DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut headers = HeaderMap::new();
        assert!(!not_modified_since(&headers, last_modified));
        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Wed, 01 Jan 2025 12:00:00 GMT"),
        );
        assert!(not_modified_since(&headers, last_modified));
        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Wed, 01 Jan 2025 11:59:59 GMT"),
        );
        assert!(!not_modified_since(&headers, last_modified));
        headers.insert(IF_MODIFIED_SINCE, HeaderValue::from_static("yesterday"));
        assert!(!not_modified_since(&headers, last_modified));
    }
}
