//! In-memory collaborators for cycle tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use threadwatch_core::CatalogPage;
use threadwatch_dispatch::{Channel, Notice, NotificationSink, SinkError};

use crate::catalog::{CatalogError, CatalogSource};

/// Serves queued listings in order; an exhausted queue fails like a 503.
#[derive(Clone, Default)]
pub(crate) struct FakeCatalog {
    listings: Arc<Mutex<VecDeque<Vec<CatalogPage>>>>,
    fetches: Arc<Mutex<usize>>,
}

impl FakeCatalog {
    pub(crate) fn new(listings: Vec<Vec<CatalogPage>>) -> Self {
        Self {
            listings: Arc::new(Mutex::new(listings.into())),
            fetches: Arc::default(),
        }
    }

    pub(crate) fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch(&self) -> Result<Vec<CatalogPage>, CatalogError> {
        *self.fetches.lock().unwrap() += 1;
        self.listings
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(CatalogError::Status { status: 503 })
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    sent: Arc<Mutex<Vec<(Channel, Notice)>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingSink {
    pub(crate) fn sent(&self) -> Vec<(Channel, Notice)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, channel: Channel, notice: &Notice) -> Result<(), SinkError> {
        if *self.failing.lock().unwrap() {
            return Err(SinkError::Rejected {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        self.sent.lock().unwrap().push((channel, notice.clone()));
        Ok(())
    }
}
