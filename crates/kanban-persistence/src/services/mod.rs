pub mod sprint_service;

pub use sprint_service::*;
