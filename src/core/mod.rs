// src/core/mod.rs

pub mod banner;
pub mod bundler;
pub mod catalog;
pub mod config;
pub mod copy;
pub mod interpolator;
pub mod livereload;
pub mod navigator;
pub mod rewrite;
pub mod runner;
pub mod server;
pub mod style_vars;
pub mod transpile;
pub mod watch;
