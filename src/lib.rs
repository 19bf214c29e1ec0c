// Heat-pump telemetry timeline engine
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
