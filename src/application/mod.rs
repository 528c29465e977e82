// Application layer - Use cases over the statistics repository
pub mod dashboard_service;
pub mod report_service;
pub mod series_service;
pub mod server_service;
pub mod stat_repository;
pub mod streaming_service;
