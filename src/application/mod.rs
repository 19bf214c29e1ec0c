// Application layer - Timeline engine operations and the service driving them
pub mod energy;
pub mod history_provider;
pub mod locator;
#[cfg(test)]
pub mod mock_provider;
pub mod segmenter;
pub mod series_builder;
pub mod snapshot;
pub mod timeline_service;
pub mod units;
