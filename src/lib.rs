pub mod api;
pub mod config;
pub mod humanize;
pub mod multipart;
pub mod observability;
pub mod ratelimit;
pub mod upstream;
