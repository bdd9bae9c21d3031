//! Imsakiyah locator: resolves a position fix to the province and
//! city/regency names of the Indonesian Ramadan schedule API.

pub mod config;
pub mod location;
pub mod server;
