// Installer tooling for web server integration
pub mod apache;
