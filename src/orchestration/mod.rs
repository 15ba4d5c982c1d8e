//! In-process host for the presale engine.

pub mod service;

pub use service::PresaleService;
