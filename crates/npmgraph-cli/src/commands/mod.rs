pub mod build;
pub mod download;
pub mod run;
pub mod version;
