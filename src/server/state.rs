use crate::location::{LocationResolver, ResolvedLocation};

/// Shared by every request. Each request runs its own resolution session.
pub struct AppState {
    pub resolver: LocationResolver,
    pub default_location: ResolvedLocation,
}
