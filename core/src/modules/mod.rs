pub mod crawler;
pub mod ports;
