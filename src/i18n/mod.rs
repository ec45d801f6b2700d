//! Locale data and translation quality checks.
//!
//! # Architecture
//!
//! - `locale`: the `Locale` value (provider code, display name, catalog tag)
//! - `registry`: the table of known locales, built-in or loaded from JSON
//! - `validator`: placeholder/markup preservation checks on accepted translations
//! - `metrics`: atomic progress counters for one batch
//!
//! # Example
//!
//! ```rust,ignore
//! use po_autotranslate::i18n::LocaleRegistry;
//!
//! let registry = LocaleRegistry::builtin();
//! let locales = registry.select(&["fr", "de"])?;
//! ```

mod locale;
mod metrics;
mod registry;
mod validator;

pub use locale::Locale;
pub use metrics::{BatchMetrics, MetricsReport};
pub use registry::LocaleRegistry;
pub use validator::{TranslationValidator, ValidationReport};
