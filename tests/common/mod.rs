//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::Router;
use serde_json::{json, Value};

/// Serves `router` on an ephemeral local port and returns its base URL
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("upstream server");
    });

    format!("http://{}", addr)
}

/// A TMDB movie record with the fields the catalog normally sends
pub fn tmdb_movie(id: i64, title: &str, vote_average: f64) -> Value {
    json!({
        "adult": false,
        "backdrop_path": null,
        "genre_ids": [28],
        "id": id,
        "original_language": "en",
        "original_title": title,
        "overview": format!("Overview of {}", title),
        "popularity": 10.5,
        "poster_path": format!("/{}.jpg", id),
        "release_date": "2020-01-01",
        "title": title,
        "video": false,
        "vote_average": vote_average,
        "vote_count": 100
    })
}

/// A TMDB paginated response wrapping `results`
pub fn tmdb_page(results: Vec<Value>) -> Value {
    let total = results.len();
    json!({
        "page": 1,
        "results": results,
        "total_pages": 1,
        "total_results": total
    })
}
