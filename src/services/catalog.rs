/// TMDB movie catalog client
///
/// Thin wrapper over the TMDB v3 REST API. Every call is a fresh round trip:
/// there is no caching and no retry, so transport failures, non-2xx statuses
/// and undecodable bodies surface directly to the caller.
use crate::{
    error::{AppError, AppResult},
    models::{DiscoveryFilter, GenreList, Movie, MoviePage},
};
use futures::future::try_join_all;
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};

/// Read access to a movie catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Default discovery listing (popular movies)
    async fn list_popular(&self) -> AppResult<MoviePage>;

    /// All movie genres known to the catalog
    async fn list_genres(&self) -> AppResult<GenreList>;

    /// Discovery narrowed by the given filter
    async fn discover(&self, filter: &DiscoveryFilter) -> AppResult<MoviePage>;

    /// Free-text title search for one keyword
    async fn search_by_keyword(&self, keyword: &str) -> AppResult<Vec<Movie>>;

    /// Searches every keyword concurrently and concatenates the results
    ///
    /// Keyword order is kept, as is the order within each keyword's results.
    /// One failed lookup fails the whole fan-out.
    async fn search_by_keywords(&self, keywords: &[String]) -> AppResult<Vec<Movie>> {
        let lookups = keywords.iter().map(|keyword| self.search_by_keyword(keyword));
        let per_keyword = try_join_all(lookups).await?;

        Ok(per_keyword.into_iter().flatten().collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<Movie>,
}

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    access_token: Option<String>,
    api_url: String,
}

impl TmdbCatalog {
    pub fn new(api_key: String, access_token: Option<String>, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            access_token,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Full request URL for `path` with an already-encoded query string
    fn url(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/{}", self.api_url, path)
        } else {
            format!("{}/{}?{}", self.api_url, path, query)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &str) -> AppResult<T> {
        let url = self.url(path, query);

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())]);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        tracing::debug!(path = %path, response = %body, "Raw TMDB API response");

        decode_body(&body)
    }
}

/// Decodes a TMDB response body, separating bad records from broken JSON
fn decode_body<T: DeserializeOwned>(body: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|e| match e.classify() {
        serde_json::error::Category::Data => {
            tracing::warn!(error = %e, "TMDB response failed validation");
            AppError::InvalidRecord(e.to_string())
        }
        _ => AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e)),
    })
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbCatalog {
    async fn list_popular(&self) -> AppResult<MoviePage> {
        let page: MoviePage = self.get_json("discover/movie", "").await?;

        tracing::info!(results = page.results.len(), "Popular movies fetched");

        Ok(page)
    }

    async fn list_genres(&self) -> AppResult<GenreList> {
        let genres: GenreList = self.get_json("genre/movie/list", "language=en").await?;

        tracing::info!(genres = genres.genres.len(), "Genres fetched");

        Ok(genres)
    }

    async fn discover(&self, filter: &DiscoveryFilter) -> AppResult<MoviePage> {
        let query = filter.to_query_string();
        let page: MoviePage = self.get_json("discover/movie", &query).await?;

        tracing::info!(
            query = %query,
            results = page.results.len(),
            total_results = page.total_results,
            "Discovery completed"
        );

        Ok(page)
    }

    async fn search_by_keyword(&self, keyword: &str) -> AppResult<Vec<Movie>> {
        if keyword.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search keyword cannot be empty".to_string(),
            ));
        }

        let query: DiscoveryFilter = [("query", keyword)].into_iter().collect();
        let response: SearchResponse = self
            .get_json("search/movie", &query.to_query_string())
            .await?;

        tracing::info!(
            keyword = %keyword,
            results = response.results.len(),
            "Keyword search completed"
        );

        Ok(response.results)
    }
}
