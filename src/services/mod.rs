pub mod candidates;
pub mod genre_preferences;
pub mod ranking;
pub mod rating_aggregator;
pub mod recommendations;
pub mod shelf_query;

pub use candidates::CandidateRetriever;
pub use genre_preferences::{GenreCount, GenrePreferenceExtractor};
pub use rating_aggregator::{BookRatings, RatingAggregator};
pub use recommendations::{RecommendationService, RecommendationSettings};
pub use shelf_query::ShelfQueryEngine;
