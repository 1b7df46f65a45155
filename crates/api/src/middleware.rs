//! Shared handler state.

use wayfind_core::PlaceService;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub place_service: PlaceService,
}

impl AppState {
    /// Create the state shared by all handlers.
    #[must_use]
    pub const fn new(place_service: PlaceService) -> Self {
        Self { place_service }
    }
}
