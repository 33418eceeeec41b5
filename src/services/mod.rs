/// Admin service for player and team registration.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Display helpers for scores and drive requirements.
pub mod formatting;
/// Health check service.
pub mod health_service;
/// Leaderboard aggregation.
pub mod leaderboard;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Score submission validation and persistence.
pub mod submission_service;
/// Read-only tournament and team queries.
pub mod tournament_service;
