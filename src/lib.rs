// Library surface for the binary, headless tests and the HTTP round trip tests.
pub mod api;
pub mod app;
pub mod app_dirs;
pub mod client;
pub mod clock;
pub mod config;
pub mod controller;
pub mod export;
pub mod leaderboard;
pub mod runtime;
pub mod schedule;
pub mod server;
pub mod session;
pub mod store;
pub mod ui;
pub mod util;
