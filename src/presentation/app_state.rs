// Application state for HTTP handlers
use crate::application::timeline_service::TimelineService;

pub struct AppState {
    pub timeline_service: TimelineService,
}
