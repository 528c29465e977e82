// Rendering layer - Time-series graphs drawn onto paged surfaces
pub mod backend;
pub mod canvas;
pub mod graph;
pub mod labels;
pub mod layout;
pub mod mapper;

#[cfg(test)]
pub mod recording;
