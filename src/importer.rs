use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::client::{CatalogClient, CatalogEntry, ENTITY_RESOURCE, FORM_RESOURCE};
use crate::config::ResolvedConfig;
use crate::domain::{EntityName, EntityRecord, ItemStatus};
use crate::error::DexError;
use crate::normalize::normalize_entity;
use crate::pace::Paced;
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::species::{SpeciesResolver, Variety};
use crate::store::{InsertOutcome, RecordStore};

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub base_url: String,
    pub catalog_limit: u32,
    pub catalog_offset: u32,
    pub request_interval: Duration,
    pub sprite_base_url: String,
    pub discover_variants: bool,
    pub variant_id_start: u32,
    pub form_limit: u32,
    pub form_patterns: Vec<String>,
}

impl ImportOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            catalog_limit: config.catalog_limit,
            catalog_offset: config.catalog_offset,
            request_interval: config.request_interval,
            sprite_base_url: config.sprite_base_url.clone(),
            discover_variants: true,
            variant_id_start: config.variant_id_start,
            form_limit: config.form_limit,
            form_patterns: config.form_patterns.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Created(EntityRecord),
    Existing(EntityRecord),
    InFlight,
}

impl ImportOutcome {
    pub fn status(&self) -> ItemStatus {
        match self {
            ImportOutcome::Created(_) => ItemStatus::Ok,
            ImportOutcome::Existing(_) => ItemStatus::Exists,
            ImportOutcome::InFlight => ItemStatus::Error,
        }
    }

    pub fn record(&self) -> Option<&EntityRecord> {
        match self {
            ImportOutcome::Created(record) | ImportOutcome::Existing(record) => Some(record),
            ImportOutcome::InFlight => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportItemResult {
    pub index: usize,
    pub name: String,
    pub status: ItemStatus,
    pub variant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub phase: String,
    pub listed: usize,
    pub created: usize,
    pub existing: usize,
    pub errors: usize,
    pub cancelled: bool,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub items: Vec<ImportItemResult>,
}

impl ImportReport {
    fn new(phase: &str) -> Self {
        Self {
            phase: phase.to_string(),
            listed: 0,
            created: 0,
            existing: 0,
            errors: 0,
            cancelled: false,
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            items: Vec::new(),
        }
    }

    fn record(
        &mut self,
        index: usize,
        name: &str,
        variant: bool,
        result: &Result<ItemStatus, DexError>,
    ) {
        let (status, error) = match result {
            Ok(status) => (*status, None),
            Err(err) => (ItemStatus::Error, Some(err.to_string())),
        };
        match status {
            ItemStatus::Ok => self.created += 1,
            ItemStatus::Exists => self.existing += 1,
            ItemStatus::Error => self.errors += 1,
            ItemStatus::Started => {}
        }
        self.items.push(ImportItemResult {
            index,
            name: name.to_string(),
            status,
            variant,
            error,
        });
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
        self
    }

    pub fn failed(&self) -> impl Iterator<Item = &ImportItemResult> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Error)
    }
}

struct Run<'r> {
    in_flight: HashSet<String>,
    index: usize,
    total: usize,
    sink: &'r dyn ProgressSink,
    cancel: &'r CancelFlag,
    report: ImportReport,
}

impl Run<'_> {
    fn emit(&self, label: &str, status: ItemStatus) {
        self.sink.report(ProgressUpdate {
            index: self.index,
            total: self.total,
            label: label.to_string(),
            status,
        });
    }

    fn finish_item(&mut self, label: &str, variant: bool, result: Result<ImportOutcome, DexError>) {
        let result = result.and_then(|outcome| match outcome {
            ImportOutcome::InFlight => Err(DexError::ImportInFlight(label.to_string())),
            outcome => Ok(outcome.status()),
        });
        if let Err(err) = &result {
            tracing::warn!(entity = label, error = %err, "import failed");
        }
        self.report.record(self.index, label, variant, &result);
        let status = result.unwrap_or(ItemStatus::Error);
        self.emit(label, status);
    }
}

pub struct Importer<'a, C: CatalogClient, S: RecordStore> {
    client: Paced<'a, C>,
    store: &'a S,
    options: ImportOptions,
}

impl<'a, C: CatalogClient, S: RecordStore> Importer<'a, C, S> {
    pub fn new(client: &'a C, store: &'a S, options: ImportOptions) -> Self {
        Self {
            client: Paced::new(client, options.request_interval),
            store,
            options,
        }
    }

    // Only a listing failure is returned; per-entity failures go to the report.
    pub fn import_all(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<ImportReport, DexError> {
        sink.phase("Importing catalog");
        let listing = self
            .client
            .list_catalog(self.options.catalog_limit, self.options.catalog_offset)
            .map_err(|err| DexError::CatalogListing(err.to_string()))?;
        tracing::info!(entries = listing.len(), "catalog listed");

        let mut run = Run {
            in_flight: HashSet::new(),
            index: 0,
            total: listing.len(),
            sink,
            cancel,
            report: ImportReport::new("catalog"),
        };
        run.report.listed = listing.len();

        for (position, entry) in listing.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(processed = position, "import cancelled");
                run.report.cancelled = true;
                break;
            }
            run.index = position + 1;
            run.emit(&entry.name, ItemStatus::Started);
            let result = self.import_entity(entry, None, &mut run);
            run.finish_item(&entry.name, false, result);
        }

        self.store.sync()?;
        let report = run.report.finish();
        tracing::info!(
            created = report.created,
            existing = report.existing,
            errors = report.errors,
            "catalog import finished"
        );
        Ok(report)
    }

    /// Imports a single entity by name. When the entity is already stored and
    /// is the default variety of its species, varieties missing from the
    /// store are imported again.
    pub fn import_one(
        &self,
        name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<ImportOutcome, DexError> {
        let name: EntityName = name.parse()?;
        let entry = CatalogEntry {
            url: format!("{}{ENTITY_RESOURCE}/{name}/", self.options.base_url),
            name: name.into_string(),
        };
        let cancel = CancelFlag::new();
        let mut run = Run {
            in_flight: HashSet::new(),
            index: 1,
            total: 1,
            sink,
            cancel: &cancel,
            report: ImportReport::new("single"),
        };
        let outcome = self.import_entity(&entry, None, &mut run)?;
        if let ImportOutcome::Existing(primary) = &outcome {
            if self.options.discover_variants {
                if let Err(err) = self.rescan_variants(primary, &entry.url, &mut run) {
                    tracing::warn!(entity = %primary.name, error = %err, "variant rescan failed");
                }
            }
        }
        self.store.sync()?;
        Ok(outcome)
    }

    fn import_entity(
        &self,
        entry: &CatalogEntry,
        donor: Option<&EntityRecord>,
        run: &mut Run<'_>,
    ) -> Result<ImportOutcome, DexError> {
        let name: EntityName = entry.name.parse()?;
        if !run.in_flight.insert(name.as_str().to_string()) {
            return Ok(match self.store.find_by_name(name.as_str())? {
                Some(existing) => ImportOutcome::Existing(existing),
                None => ImportOutcome::InFlight,
            });
        }
        let result = self.import_claimed(entry, donor, run);
        // A name that was not persisted stays open for a later listing entry.
        if !matches!(result, Ok(ImportOutcome::Created(_))) {
            run.in_flight.remove(name.as_str());
        }
        result
    }

    fn import_claimed(
        &self,
        entry: &CatalogEntry,
        donor: Option<&EntityRecord>,
        run: &mut Run<'_>,
    ) -> Result<ImportOutcome, DexError> {
        if let Some(existing) = self.store.find_by_name(&entry.name)? {
            return Ok(ImportOutcome::Existing(existing));
        }

        let document = self.client.fetch_document(&entry.url)?;
        let normalized = normalize_entity(&document, &self.options.sprite_base_url)?;
        if let Some(existing) = self.find_existing(&normalized.record)? {
            return Ok(ImportOutcome::Existing(existing));
        }

        let mut record = normalized.record;
        let species = SpeciesResolver::new(&self.client).enrich(
            &mut record,
            normalized.species_url.as_deref(),
            donor,
        );

        let created = match self.store.insert_new(record)? {
            InsertOutcome::Inserted(record) => record,
            InsertOutcome::Existing(existing) => return Ok(ImportOutcome::Existing(existing)),
        };
        tracing::debug!(id = created.id, name = %created.name, "entity created");

        if donor.is_none() && self.options.discover_variants {
            self.discover_variants(&created, &species.varieties, run);
        }

        Ok(ImportOutcome::Created(created))
    }

    fn discover_variants(
        &self,
        primary: &EntityRecord,
        varieties: &[Variety],
        run: &mut Run<'_>,
    ) {
        for variety in varieties.iter().filter(|variety| !variety.is_default) {
            if run.cancel.is_cancelled() {
                return;
            }
            match self.store.find_by_name(&variety.name) {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(err) => {
                    run.finish_item(&variety.name, true, Err(err));
                    continue;
                }
            }
            run.emit(&variety.name, ItemStatus::Started);
            let entry = CatalogEntry {
                name: variety.name.clone(),
                url: variety.url.clone(),
            };
            let result = self.import_entity(&entry, Some(primary), run);
            run.finish_item(&variety.name, true, result);
        }
    }

    fn rescan_variants(
        &self,
        primary: &EntityRecord,
        entity_url: &str,
        run: &mut Run<'_>,
    ) -> Result<(), DexError> {
        let document = self.client.fetch_document(entity_url)?;
        let Some(species_url) = normalize_entity(&document, &self.options.sprite_base_url)?
            .species_url
        else {
            return Ok(());
        };
        let varieties = SpeciesResolver::new(&self.client).varieties_of(&species_url);
        let is_primary = varieties
            .iter()
            .any(|variety| variety.is_default && variety.name == primary.name);
        if is_primary {
            self.discover_variants(primary, &varieties, run);
        }
        Ok(())
    }

    fn find_existing(&self, record: &EntityRecord) -> Result<Option<EntityRecord>, DexError> {
        if let Some(existing) = self.store.find_by_identity(record.id)? {
            return Ok(Some(existing));
        }
        self.store.find_by_name(&record.name)
    }

    pub fn import_forms(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<ImportReport, DexError> {
        sink.phase("Importing alternate forms");
        let listing = self
            .client
            .list_resource(FORM_RESOURCE, self.options.form_limit, 0)
            .map_err(|err| DexError::CatalogListing(err.to_string()))?;
        let forms: Vec<CatalogEntry> = listing
            .into_iter()
            .filter(|entry| self.matches_form_pattern(&entry.name))
            .collect();
        tracing::info!(forms = forms.len(), "form listing filtered");

        let mut run = Run {
            in_flight: HashSet::new(),
            index: 0,
            total: forms.len(),
            sink,
            cancel,
            report: ImportReport::new("forms"),
        };
        run.report.listed = forms.len();
        let mut next_id = self.options.variant_id_start;

        for (position, entry) in forms.iter().enumerate() {
            if cancel.is_cancelled() {
                run.report.cancelled = true;
                break;
            }
            run.index = position + 1;
            run.emit(&entry.name, ItemStatus::Started);
            let result = self.import_form(entry, &mut next_id);
            run.finish_item(&entry.name, true, result);
        }

        self.store.sync()?;
        Ok(run.report.finish())
    }

    fn matches_form_pattern(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.options
            .form_patterns
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
    }

    fn import_form(
        &self,
        entry: &CatalogEntry,
        next_id: &mut u32,
    ) -> Result<ImportOutcome, DexError> {
        let name: EntityName = entry.name.parse()?;
        if let Some(existing) = self.store.find_by_name(name.as_str())? {
            return Ok(ImportOutcome::Existing(existing));
        }

        let form = self.client.fetch_document(&entry.url)?;
        let entity_url = form
            .get("pokemon")
            .and_then(|v| v.get("url"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DexError::MalformedPayload(format!("form {name} does not reference an entity"))
            })?;
        let document = self.client.fetch_document(entity_url)?;
        let normalized = normalize_entity(&document, &self.options.sprite_base_url)?;

        let mut record = normalized.record;
        record.id = self.allocate_local_id(next_id)?;
        record.name = name.as_str().to_string();
        record.evolution = vec![name.as_str().to_string()];
        record.description = format!("Official alternate form: {name}");
        record.generation = normalized
            .species_url
            .as_deref()
            .and_then(|url| SpeciesResolver::new(&self.client).generation_of(url));

        match self.store.insert_new(record)? {
            InsertOutcome::Inserted(record) => Ok(ImportOutcome::Created(record)),
            InsertOutcome::Existing(existing) => Ok(ImportOutcome::Existing(existing)),
        }
    }

    fn allocate_local_id(&self, next_id: &mut u32) -> Result<u32, DexError> {
        while self.store.find_by_identity(*next_id)?.is_some() {
            *next_id = next_id.checked_add(1).ok_or_else(|| {
                DexError::StoreConflict("local identity space exhausted".to_string())
            })?;
        }
        let id = *next_id;
        *next_id = next_id.saturating_add(1);
        Ok(id)
    }
}
