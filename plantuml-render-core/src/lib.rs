#![doc = "plantuml-render-core: core logic library for plantuml-render."]

//! This crate contains all logic and data models for rendering PlantUML
//! sources through a remote PlantUML server. The CLI crate only wires
//! configuration and output around it.
//!
//! # Usage
//! Build a [`config::RenderConfig`], pick an [`contract::Encoder`] and an
//! [`contract::ImageFetcher`], and hand them to [`render::Renderer`].

pub mod attempt;
pub mod config;
pub mod contract;
pub mod discover;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod render;
pub mod validate;
