pub mod conclusion;
pub mod profile;
