use std::mem;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use crate::client::CatalogClient;
use crate::config::ResolvedConfig;
use crate::domain::{EntityRecord, ItemStatus};
use crate::error::DexError;
use crate::importer::CancelFlag;
use crate::pace::Paced;
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct AssetOptions {
    pub interval: Duration,
    pub identity_ceiling: Option<u32>,
    pub batch_size: usize,
}

impl AssetOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            interval: config.asset_interval,
            identity_ceiling: None,
            batch_size: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetItemResult {
    pub id: u32,
    pub name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetReport {
    pub total: usize,
    pub downloaded: usize,
    pub existing: usize,
    pub errors: usize,
    pub cancelled: bool,
    pub items: Vec<AssetItemResult>,
}

pub struct AssetMaterializer<'a, C: CatalogClient, S: RecordStore> {
    client: Paced<'a, C>,
    store: &'a S,
    options: AssetOptions,
}

impl<'a, C: CatalogClient, S: RecordStore> AssetMaterializer<'a, C, S> {
    pub fn new(client: &'a C, store: &'a S, options: AssetOptions) -> Self {
        Self {
            client: Paced::new(client, options.interval),
            store,
            options,
        }
    }

    pub fn materialize(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<AssetReport, DexError> {
        sink.phase("Materializing sprites");
        let records: Vec<EntityRecord> = self
            .store
            .find_all_ordered_by_id()?
            .into_iter()
            .filter(|record| {
                self.options
                    .identity_ceiling
                    .map(|ceiling| record.id <= ceiling)
                    .unwrap_or(true)
            })
            .collect();

        let total = records.len();
        let mut report = AssetReport {
            total,
            ..AssetReport::default()
        };
        let mut pending = Vec::new();

        for (position, mut record) in records.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let index = position + 1;

            if record.has_sprite_asset() {
                report.existing += 1;
                report.items.push(item(&record, ItemStatus::Exists, None));
                emit(sink, index, total, &record.name, ItemStatus::Exists);
                continue;
            }

            emit(sink, index, total, &record.name, ItemStatus::Started);
            match self.download(&record) {
                Ok(encoded) => {
                    record.sprite_base64 = Some(encoded);
                    report.downloaded += 1;
                    report.items.push(item(&record, ItemStatus::Ok, None));
                    emit(sink, index, total, &record.name, ItemStatus::Ok);
                    pending.push(record);
                }
                Err(err) => {
                    tracing::warn!(id = record.id, error = %err, "sprite not materialized");
                    report.errors += 1;
                    report
                        .items
                        .push(item(&record, ItemStatus::Error, Some(err.to_string())));
                    emit(sink, index, total, &record.name, ItemStatus::Error);
                }
            }

            if pending.len() >= self.options.batch_size.max(1) {
                self.store.save_all(mem::take(&mut pending))?;
            }
        }

        self.store.save_all(pending)?;
        tracing::info!(
            downloaded = report.downloaded,
            existing = report.existing,
            errors = report.errors,
            "sprite pass finished"
        );
        Ok(report)
    }

    fn download(&self, record: &EntityRecord) -> Result<String, DexError> {
        let bytes = self
            .client
            .fetch_binary(&record.sprite)
            .map_err(|err| DexError::AssetDownload {
                url: record.sprite.clone(),
                reason: err.to_string(),
            })?;
        if bytes.is_empty() {
            return Err(DexError::AssetDownload {
                url: record.sprite.clone(),
                reason: "empty response body".to_string(),
            });
        }
        Ok(BASE64.encode(&bytes))
    }
}

fn item(record: &EntityRecord, status: ItemStatus, error: Option<String>) -> AssetItemResult {
    AssetItemResult {
        id: record.id,
        name: record.name.clone(),
        status,
        error,
    }
}

fn emit(sink: &dyn ProgressSink, index: usize, total: usize, label: &str, status: ItemStatus) {
    sink.report(ProgressUpdate {
        index,
        total,
        label: label.to_string(),
        status,
    });
}
