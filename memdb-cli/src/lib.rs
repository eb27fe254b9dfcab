// memdb command-line library

pub mod command;
pub mod generator;
pub mod models;
pub mod runner;
pub mod session;
pub mod stats;
