pub mod cones;
pub mod ground;
pub mod steering;
