pub mod auth;
pub mod cli;
pub mod common;
pub mod config;
pub mod downloader;
pub mod web;
