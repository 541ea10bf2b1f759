pub mod account;
pub mod assistant;
pub mod filter;
pub mod movie;

pub use account::{DbId, User, UserResponse, WatchlistEntry};
pub use assistant::{AssistantReply, Role, RunHandle, RunStatus};
pub use filter::DiscoveryFilter;
pub use movie::{Genre, GenreList, Movie, MoviePage, Rating, RatingOutOfRange};
