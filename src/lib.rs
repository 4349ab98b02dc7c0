pub mod api;
pub mod auth;
pub mod config;
pub mod drive;
pub mod error;
pub mod faces;
pub mod matcher;
pub mod shared;

pub use error::{ApiError, CompareError, ConfigError, DriveError, MatchError};
pub use matcher::{
    compare_with_collection, MatchReport, MatchResult, ReferenceImage, SimilarityMatcher,
    SimilarityThreshold,
};
