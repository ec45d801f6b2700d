//! Machine-translate gettext templates into `.po`/`.mo` catalogs.
//!
//! Every (entry, locale) pair is resolved by a `ResolutionEngine` walking a
//! strict-priority `ProviderChain` with per-provider retries; the
//! `BatchCoordinator` drives all pairs through a bounded worker pool and the
//! `CatalogWriter` persists one catalog per locale.

pub mod batch;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod i18n;
pub mod model;
pub mod providers;
pub mod report;
pub mod retry;
