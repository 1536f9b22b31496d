pub mod heading;
pub mod mapper;
