//! Library exports for the form builder application
//!
//! This module exposes internal components for testing and potential library usage.

pub mod database;
pub mod element;
pub mod error;
pub mod form;
pub mod handler;
pub mod handler_form;
pub mod handler_key;
pub mod middleware;
pub mod model;
pub mod route;
pub mod submit;
pub mod validate;
