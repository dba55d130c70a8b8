//! Session Module
//! Cache service owned by the presentation layer: each table is loaded or
//! derived once per key and shared afterwards.

use crate::config::Settings;
use crate::data::{write_csv_file, DataLoader, LoaderError, MemoCache};
use crate::spatial::{enrich, GeoError, ReferenceSet};
use crate::stats::{DashboardViews, ViewError};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("Refusing to export over input file {}", .0.display())]
    OverwritesInput(PathBuf),
    #[error("Failed to write {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

/// Which table an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTable {
    /// Landings exactly as read, incomplete rows included.
    Raw,
    /// Landings with country and continent labels.
    Enriched,
}

type EnrichKey = (Vec<PathBuf>, PathBuf);

pub struct Session {
    settings: Settings,
    raw: MemoCache<Vec<PathBuf>, DataFrame>,
    landings: MemoCache<Vec<PathBuf>, DataFrame>,
    references: MemoCache<PathBuf, ReferenceSet>,
    enriched: MemoCache<EnrichKey, DataFrame>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            raw: MemoCache::new(),
            landings: MemoCache::new(),
            references: MemoCache::new(),
            enriched: MemoCache::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Landing table as read from the source files, without dropping or casting.
    pub fn raw_landings(&self) -> Result<Arc<DataFrame>, SessionError> {
        let paths = &self.settings.landings;
        let df = self
            .raw
            .get_or_try_init(paths, || DataLoader::load_all(paths))?;
        Ok(df)
    }

    /// Landing table with incomplete rows dropped and the schema validated.
    pub fn landings(&self) -> Result<Arc<DataFrame>, SessionError> {
        let paths = &self.settings.landings;
        let df = self.landings.get_or_try_init(paths, || {
            let raw = self.raw_landings()?;
            let before = raw.height();
            let complete = raw.drop_nulls::<String>(None).map_err(LoaderError::from)?;
            debug!(dropped = before - complete.height(), "dropped incomplete rows");
            Ok::<_, SessionError>(self.settings.schema.validate(&complete)?)
        })?;
        Ok(df)
    }

    pub fn reference(&self) -> Result<Arc<ReferenceSet>, SessionError> {
        let path = &self.settings.reference;
        let set = self.references.get_or_try_init(path, || {
            ReferenceSet::load(path, &self.settings.reference_properties)
        })?;
        Ok(set)
    }

    /// Landings joined with the reference polygons.
    pub fn enriched(&self) -> Result<Arc<DataFrame>, SessionError> {
        let key = (
            self.settings.landings.clone(),
            self.settings.reference.clone(),
        );
        let df = self
            .enriched
            .get_or_try_init(&key, || -> Result<DataFrame, SessionError> {
                let landings = self.landings()?;
                let reference = self.reference()?;
                Ok(enrich(
                    &landings,
                    &reference,
                    &self.settings.schema,
                    self.settings.join_policy,
                )?)
            })?;
        Ok(df)
    }

    /// Write a table as CSV to `output`, refusing any path that is one of the inputs.
    ///
    /// Returns the number of rows written.
    pub fn export(&self, table: ExportTable, output: &Path) -> Result<usize, SessionError> {
        let target = resolve(output);
        if let Some(input) = self
            .settings
            .landings
            .iter()
            .chain([&self.settings.reference])
            .find(|input| resolve(input) == target)
        {
            return Err(SessionError::OverwritesInput(input.clone()));
        }

        let df = match table {
            ExportTable::Raw => self.raw_landings()?,
            ExportTable::Enriched => self.enriched()?,
        };
        write_csv_file(&df, output).map_err(|source| SessionError::Export {
            path: output.to_path_buf(),
            source,
        })?;
        info!(path = %output.display(), rows = df.height(), "exported table");
        Ok(df.height())
    }

    /// Every chart table of the landings page. Recomputed on each call from cached inputs.
    pub fn views(&self) -> Result<DashboardViews, SessionError> {
        let landings = self.landings()?;
        let enriched = self.enriched()?;
        Ok(DashboardViews::compute(
            &landings,
            &enriched,
            &self.settings.schema,
            &self.settings.views,
        )?)
    }
}

/// Absolute form of `path`; the parent is resolved when the file does not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(path) = path.canonicalize() {
        return path;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}
