pub mod command;
pub mod config;
pub mod endgame;
pub mod error;
pub mod game;
pub mod night;
pub mod player;
pub mod reveal;
pub mod role;
pub mod view;
pub mod vote;
