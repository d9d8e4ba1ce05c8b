pub mod attack;
pub mod baseline;
pub mod bounds;
pub mod padm;
