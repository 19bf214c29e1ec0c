// Presentation layer - HTTP/JSON surface for the rendering front end
pub mod app_state;
pub mod handlers;
