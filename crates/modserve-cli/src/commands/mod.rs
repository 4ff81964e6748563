pub mod rewrite;
pub mod version;
