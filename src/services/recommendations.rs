use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{
        movie::{MAX_RATING, MIN_RATING},
        AssistantReply, DiscoveryFilter, MoviePage,
    },
    services::{
        assistant::{extract_structured_filter, PollOptions},
        Assistant, MovieCatalog,
    },
};

/// What the user told us they are in the mood for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_min_rating")]
    pub min_rating: f64,
    #[serde(default = "default_max_rating")]
    pub max_rating: f64,
}

fn default_min_rating() -> f64 {
    MIN_RATING
}

fn default_max_rating() -> f64 {
    MAX_RATING
}

impl Preferences {
    pub fn validate(&self) -> AppResult<()> {
        let in_range = |v: f64| v.is_finite() && (MIN_RATING..=MAX_RATING).contains(&v);

        if !in_range(self.min_rating) || !in_range(self.max_rating) {
            return Err(AppError::InvalidInput(format!(
                "Rating range must be within {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        if self.min_rating > self.max_rating {
            return Err(AppError::InvalidInput(
                "Minimum rating cannot exceed maximum rating".to_string(),
            ));
        }
        Ok(())
    }

    /// Renders the preferences as the single message sent to the assistant
    pub fn to_prompt(&self) -> String {
        let genres = if self.genres.is_empty() {
            "any".to_string()
        } else {
            self.genres.join(", ")
        };
        let description = match self.description.trim() {
            "" => "none",
            text => text,
        };

        format!(
            "Genres: {}\nDescription: {}\nRating range: {:.1} to {:.1}",
            genres, description, self.min_rating, self.max_rating
        )
    }
}

/// Movies picked for a set of preferences, with the filter that found them
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub filter: DiscoveryFilter,
    pub movies: MoviePage,
    /// The assistant message the filter was read from
    pub reply: AssistantReply,
}

/// Runs one recommendation round trip
///
/// Preferences go to the assistant, its reply to this prompt is parsed into
/// a discovery filter and the filter is run against the catalog. Any failure
/// along the way aborts the whole round trip; there is no fallback to
/// unfiltered discovery.
pub async fn recommend(
    assistant: &dyn Assistant,
    catalog: &dyn MovieCatalog,
    preferences: &Preferences,
    poll: PollOptions,
) -> AppResult<Recommendation> {
    preferences.validate()?;

    tracing::info!(
        genres = preferences.genres.len(),
        "Waiting for assistant suggestions"
    );

    let reply = assistant.ask(&preferences.to_prompt(), poll).await?;
    let filter = extract_structured_filter(&reply)?;

    tracing::info!(filter_terms = filter.len(), "Assistant suggested discovery filter");

    let movies = catalog.discover(&filter).await?;

    tracing::info!(
        results = movies.results.len(),
        total_results = movies.total_results,
        "Recommendation completed"
    );

    Ok(Recommendation {
        filter,
        movies,
        reply,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::{assistant::MockAssistant, catalog::MockMovieCatalog};
    use mockall::predicate::{always, eq};
    use std::time::Duration;

    fn poll() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(1),
        }
    }

    fn preferences() -> Preferences {
        Preferences {
            genres: vec!["Action".to_string(), "Science Fiction".to_string()],
            description: "big space battles".to_string(),
            min_rating: 6.0,
            max_rating: 10.0,
        }
    }

    fn empty_page() -> MoviePage {
        MoviePage {
            page: 1,
            results: vec![],
            total_pages: 0,
            total_results: 0,
        }
    }

    fn assistant_replying(content: &'static str) -> MockAssistant {
        let mut assistant = MockAssistant::new();
        assistant
            .expect_ask()
            .with(eq(preferences().to_prompt()), always())
            .times(1)
            .returning(move |_, _| {
                Ok(AssistantReply {
                    role: Role::Assistant,
                    content: content.to_string(),
                })
            });
        assistant
    }

    #[test]
    fn test_prompt_lists_all_preferences() {
        let prompt = preferences().to_prompt();
        assert_eq!(
            prompt,
            "Genres: Action, Science Fiction\nDescription: big space battles\nRating range: 6.0 to 10.0"
        );
    }

    #[test]
    fn test_prompt_with_no_preferences() {
        let prefs = Preferences {
            genres: vec![],
            description: "   ".to_string(),
            min_rating: 0.0,
            max_rating: 10.0,
        };
        assert_eq!(
            prefs.to_prompt(),
            "Genres: any\nDescription: none\nRating range: 0.0 to 10.0"
        );
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut prefs = preferences();
        prefs.min_rating = 8.0;
        prefs.max_rating = 3.0;
        assert!(matches!(prefs.validate(), Err(AppError::InvalidInput(_))));

        prefs.min_rating = -1.0;
        prefs.max_rating = 5.0;
        assert!(matches!(prefs.validate(), Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_recommend_runs_filter_against_catalog() {
        let assistant =
            assistant_replying("```json\n{\"with_genres\": \"28,878\", \"vote_average.gte\": 6}\n```");

        let expected: DiscoveryFilter = [("with_genres", "28,878"), ("vote_average.gte", "6")]
            .into_iter()
            .collect();

        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_discover()
            .with(eq(expected.clone()))
            .times(1)
            .returning(|_| Ok(empty_page()));

        let recommendation = recommend(&assistant, &catalog, &preferences(), poll())
            .await
            .unwrap();

        assert_eq!(recommendation.filter, expected);
        assert_eq!(recommendation.movies, empty_page());
        assert_eq!(recommendation.reply.role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_recommend_aborts_on_unparseable_reply() {
        let assistant = assistant_replying("I think you would enjoy Star Wars!");

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_discover().never();

        let result = recommend(&assistant, &catalog, &preferences(), poll()).await;
        assert!(matches!(result, Err(AppError::InvalidFilter(_))));
    }

    #[tokio::test]
    async fn test_recommend_aborts_when_run_fails() {
        let mut assistant = MockAssistant::new();
        assistant.expect_ask().times(1).returning(|_, _| {
            Err(AppError::AssistantRun {
                status: "failed".to_string(),
                message: "server_error: try again".to_string(),
            })
        });

        let mut catalog = MockMovieCatalog::new();
        catalog.expect_discover().never();

        let result = recommend(&assistant, &catalog, &preferences(), poll()).await;
        assert!(matches!(result, Err(AppError::AssistantRun { .. })));
    }

    #[tokio::test]
    async fn test_recommend_propagates_discovery_failure() {
        let assistant = assistant_replying("{\"with_genres\": \"28\"}");

        let mut catalog = MockMovieCatalog::new();
        catalog
            .expect_discover()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("TMDB API returned status 503".to_string())));

        let result = recommend(&assistant, &catalog, &preferences(), poll()).await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_recommend_validates_before_calling_assistant() {
        let mut assistant = MockAssistant::new();
        assistant.expect_ask().never();
        let catalog = MockMovieCatalog::new();

        let mut prefs = preferences();
        prefs.max_rating = 11.0;

        let result = recommend(&assistant, &catalog, &prefs, poll()).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
