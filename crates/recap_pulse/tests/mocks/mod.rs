pub mod feed;
pub mod generator;
pub mod transcript;
