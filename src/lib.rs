pub mod app;
pub mod constants;
pub mod controller;
pub mod document;
pub mod drag;
pub mod drivers;
pub mod event_loop;
pub mod geometry;
pub mod input;
pub mod pager;
pub mod settings;
pub mod stream;
pub mod surface;
pub mod theme;
pub mod throttle;
pub mod tracing_sub;
pub mod translate;
