pub mod dto;
pub mod fetch;
pub mod registry;
pub mod rest;
pub mod ws;
