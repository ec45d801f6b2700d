//! Gettext catalog I/O.
//!
//! - `template`: reads `.pot` templates into `MessageEntry` lists
//! - `po`: renders `.po`/`.pot` text
//! - `mo`: compiles binary `.mo` catalogs
//!
//! `CatalogWriter` ties them together: one `LocaleCatalog` in, one `.po`
//! and one `.mo` file out, named `{template}-{locale tag}`.

pub mod mo;
pub mod po;
mod template;

pub use template::Template;

use crate::batch::LocaleCatalog;
use crate::error::CatalogError;
use mo::MoMessage;
use po::RenderedEntry;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths of the files written for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenCatalog {
    pub po_path: PathBuf,
    pub mo_path: PathBuf,
}

/// Writes per-locale `.po`/`.mo` pairs into one directory.
#[derive(Debug, Clone)]
pub struct CatalogWriter {
    output_dir: PathBuf,
    revision_date: String,
}

impl CatalogWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            revision_date: chrono::Local::now().format("%Y-%m-%d %H:%M%z").to_string(),
        }
    }

    /// Override the `PO-Revision-Date` stamped into headers.
    pub fn with_revision_date(mut self, revision_date: impl Into<String>) -> Self {
        self.revision_date = revision_date.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File stem for a locale: `{base}-{tag}`.
    pub fn file_stem(template: &Template, catalog: &LocaleCatalog) -> String {
        format!("{}-{}", template.base_name, catalog.locale.catalog_tag())
    }

    /// Header metadata for a locale: the template's, with `Language` and
    /// `PO-Revision-Date` replaced and a content type guaranteed.
    pub fn metadata_for(&self, template: &Template, catalog: &LocaleCatalog) -> Vec<(String, String)> {
        let mut metadata = template.metadata.clone();
        set_field(&mut metadata, "Language", catalog.locale.catalog_tag());
        set_field(&mut metadata, "PO-Revision-Date", &self.revision_date);
        if !metadata
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("Content-Type"))
        {
            metadata.push((
                "Content-Type".to_string(),
                "text/plain; charset=UTF-8".to_string(),
            ));
        }
        metadata
    }

    /// Write the `.po` and `.mo` files for one locale.
    pub fn write(
        &self,
        template: &Template,
        catalog: &LocaleCatalog,
    ) -> Result<WrittenCatalog, CatalogError> {
        check_alignment(template, catalog)?;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| CatalogError::io(&self.output_dir, e))?;

        let stem = Self::file_stem(template, catalog);
        let po_path = self.output_dir.join(format!("{}.po", stem));
        let mo_path = self.output_dir.join(format!("{}.mo", stem));

        let metadata = self.metadata_for(template, catalog);
        let nplurals = template.nplurals();

        let rendered: Vec<RenderedEntry> = template
            .entries
            .iter()
            .zip(&catalog.results)
            .map(|(entry, result)| RenderedEntry {
                entry,
                translation: Some(result.translated_text.as_str()),
                fuzzy: !result.succeeded,
            })
            .collect();
        let po_text = po::render(&metadata, &rendered, nplurals);

        let header: String = metadata
            .iter()
            .map(|(k, v)| format!("{}: {}\n", k, v))
            .collect();
        let messages: Vec<MoMessage> = template
            .entries
            .iter()
            .zip(&catalog.results)
            .map(|(entry, result)| {
                let slots = if entry.plural.is_some() { nplurals } else { 1 };
                let translations = vec![result.translated_text.as_str(); slots];
                MoMessage::new(
                    entry.context.as_deref(),
                    &entry.source_text,
                    entry.plural.as_deref(),
                    &translations,
                )
            })
            .collect();
        let mo_bytes = mo::compile(&header, &messages);

        std::fs::write(&po_path, po_text).map_err(|e| CatalogError::io(&po_path, e))?;
        std::fs::write(&mo_path, mo_bytes).map_err(|e| CatalogError::io(&mo_path, e))?;

        info!("Saved {} and {}", po_path.display(), mo_path.display());

        Ok(WrittenCatalog { po_path, mo_path })
    }

    /// Write every catalog of a run. Stops at the first I/O failure.
    pub fn write_all(
        &self,
        template: &Template,
        catalogs: &[LocaleCatalog],
    ) -> Result<Vec<WrittenCatalog>, CatalogError> {
        catalogs
            .iter()
            .map(|catalog| self.write(template, catalog))
            .collect()
    }
}

fn set_field(metadata: &mut Vec<(String, String)>, key: &str, value: &str) {
    match metadata.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
        Some((_, v)) => *v = value.to_string(),
        None => metadata.push((key.to_string(), value.to_string())),
    }
}

fn check_alignment(template: &Template, catalog: &LocaleCatalog) -> Result<(), CatalogError> {
    let mismatch = |message: String| CatalogError::Mismatch {
        locale: catalog.locale.code().to_string(),
        message,
    };

    if template.entries.len() != catalog.results.len() {
        return Err(mismatch(format!(
            "{} entries but {} results",
            template.entries.len(),
            catalog.results.len()
        )));
    }
    if let Some((entry, result)) = template
        .entries
        .iter()
        .zip(&catalog.results)
        .find(|(entry, result)| entry.id != result.entry_id)
    {
        return Err(mismatch(format!(
            "expected '{}' but found '{}'",
            entry.id, result.entry_id
        )));
    }
    Ok(())
}
