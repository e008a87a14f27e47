//! Endpoint groups, one per backend service.
//!
//! Each group borrows the `ApiClient` and only builds requests; the shared
//! pipeline does the rest.

pub mod attraction;
pub mod social;
pub mod user;

pub use attraction::AttractionApi;
pub use social::SocialApi;
pub use user::UserApi;
