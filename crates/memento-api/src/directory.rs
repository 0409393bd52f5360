use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use memento_core::directory::{SortConfig, project};
use memento_types::api::{Claims, DirectoryQuery};

use crate::error::ApiError;
use crate::{AppState, run_db};

/// All directory records, ordered by `?sort=<key>&dir=<asc|desc>`. Without
/// `sort` the records come back in registration order.
pub async fn list_directory(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<DirectoryQuery>, ApiError>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let records = run_db(&state, |db| db.list_profiles()).await?;

    // The wire form of a sort: the client states the final (key, dir)
    // pair. Header clicks go through `request_sort` on the client.
    let config = SortConfig {
        key: query.sort,
        direction: query.dir.unwrap_or_default(),
    };
    Ok(Json(project(&records, config)))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    fn names(body: &Value) -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|r| r["identity"]["full_name"].as_str().unwrap_or("").to_string())
            .collect()
    }

    #[tokio::test]
    async fn sorted_by_query() {
        let app = TestApp::new();
        for (username, full_name) in [("bob", Some("Bob")), ("alice", Some("Alice")), ("anon", None)] {
            let user = app.register(username).await;
            if let Some(name) = full_name {
                let update = json!({ "identity": { "full_name": name } });
                app.call(Method::PUT, "/profile/me", Some(&user.token), Some(update)).await;
            }
        }
        let viewer = app.register("viewer").await;

        let (status, body) = app.call(Method::GET, "/directory", Some(&viewer.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["Bob", "Alice", "", ""]);

        let (_, body) = app.call(Method::GET, "/directory?sort=name", Some(&viewer.token), None).await;
        assert_eq!(names(&body), vec!["", "", "Alice", "Bob"]);

        let (_, body) = app.call(Method::GET, "/directory?sort=name&dir=desc", Some(&viewer.token), None).await;
        assert_eq!(names(&body), vec!["Bob", "Alice", "", ""]);

        let (status, body) = app.call(Method::GET, "/directory?sort=shoe_size", Some(&viewer.token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("shoe_size"), "{}", body);
    }
}
