use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::client::{CatalogClient, CatalogEntry};
use crate::error::DexError;

/// Enforces a fixed minimum interval between consecutive outbound calls.
/// A zero interval never sleeps.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let Ok(mut last) = self.last_call.lock() else {
            return;
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct Paced<'a, C: CatalogClient> {
    inner: &'a C,
    pacer: Pacer,
}

impl<'a, C: CatalogClient> Paced<'a, C> {
    pub fn new(inner: &'a C, interval: Duration) -> Self {
        Self {
            inner,
            pacer: Pacer::new(interval),
        }
    }
}

impl<C: CatalogClient> CatalogClient for Paced<'_, C> {
    fn list_resource(
        &self,
        resource: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CatalogEntry>, DexError> {
        self.pacer.wait();
        self.inner.list_resource(resource, limit, offset)
    }

    fn fetch_document(&self, url: &str) -> Result<Value, DexError> {
        self.pacer.wait();
        self.inner.fetch_document(url)
    }

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, DexError> {
        self.pacer.wait();
        self.inner.fetch_binary(url)
    }
}
