// Domain layer - Value types shared by every other layer
pub mod dashboard;
pub mod geometry;
pub mod meter;
pub mod report;
pub mod series;
pub mod server;
