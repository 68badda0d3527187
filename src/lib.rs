pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod generator;
pub mod output;
pub mod runner;

#[cfg(test)]
mod tests;
