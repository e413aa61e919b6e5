pub mod entity;
pub mod lists;
mod mapper;
pub mod migrations;
pub mod seed;
