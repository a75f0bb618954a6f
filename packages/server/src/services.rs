pub mod game_service;
pub mod game_store;
pub mod reveal_scheduler;
