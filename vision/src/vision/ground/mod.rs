pub mod dedup;
pub mod perspective;
