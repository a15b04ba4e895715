//! Batch address-ingestion pipeline
//!
//! One shared start address plus an ordered list of destinations. Each
//! destination is resolved in two sequential external calls (geocode, then
//! route) and persisted on success. The pipeline is a pull-based producer:
//! every call to `next_event` advances it by exactly one step and yields one
//! `ProgressEvent`; no work happens before the first call, and a fully
//! consumed run cannot be replayed.
//!
//! Failure semantics:
//! - batch-fatal (one error event, nothing else): empty address list, empty
//!   start address, unresolvable start address
//! - item-fatal (failed progress event, batch continues): unresolvable
//!   destination, no route, store insert failure

use crate::domain::{Coordinates, ProgressEvent, RouteRecord};
use crate::io::geocoder::Geocode;
use crate::io::router::PlanRoute;
use crate::io::store::StoreRoutes;
use std::sync::Arc;
use tracing::{error, info, warn};

const ERR_GEOCODE: &str = "could not geocode address";
const ERR_ROUTE: &str = "could not calculate route";

#[derive(Debug, Clone, Copy)]
enum RunState {
    NotStarted,
    Processing { start: Coordinates, next: usize, successful: usize },
    Done,
}

/// One batch run. Create, then drain with `next_event` until it returns None.
pub struct BatchRun<G, R, S> {
    geocoder: Arc<G>,
    router: Arc<R>,
    store: Arc<S>,
    start_address: String,
    addresses: Vec<String>,
    state: RunState,
}

impl<G: Geocode, R: PlanRoute, S: StoreRoutes> BatchRun<G, R, S> {
    pub fn new(
        geocoder: Arc<G>,
        router: Arc<R>,
        store: Arc<S>,
        start_address: String,
        addresses: Vec<String>,
    ) -> Self {
        Self { geocoder, router, store, start_address, addresses, state: RunState::NotStarted }
    }

    /// Split uploaded content into trimmed, non-empty lines, order preserved
    pub fn parse_addresses(content: &str) -> Vec<String> {
        content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
    }

    /// Advance the pipeline by one step. Suspension points are exactly the
    /// geocode and route calls plus the per-item store write.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.state {
                RunState::NotStarted => {
                    if let Some(abort) = self.validate_and_resolve_start().await {
                        self.state = RunState::Done;
                        return Some(abort);
                    }
                    // Start resolved; loop around to process the first item
                }
                RunState::Processing { start, next, successful } => {
                    let total = self.addresses.len();
                    if next >= total {
                        self.state = RunState::Done;
                        info!(successful = %successful, total = %total, "batch_complete");
                        return Some(ProgressEvent::Complete { successful, total });
                    }

                    let event = self.process_item(start, next).await;
                    let succeeded = matches!(
                        event,
                        ProgressEvent::Progress { success: true, .. }
                    );
                    self.state = RunState::Processing {
                        start,
                        next: next + 1,
                        successful: successful + usize::from(succeeded),
                    };
                    return Some(event);
                }
                RunState::Done => return None,
            }
        }
    }

    /// Preconditions plus the one external call whose failure aborts the
    /// whole batch: resolving the shared start address. Returns the abort
    /// event, or None when processing may begin.
    async fn validate_and_resolve_start(&mut self) -> Option<ProgressEvent> {
        if self.addresses.is_empty() {
            warn!("batch_rejected_empty_address_list");
            return Some(ProgressEvent::aborted("no addresses in uploaded file".to_string()));
        }
        if self.start_address.trim().is_empty() {
            warn!("batch_rejected_missing_start_address");
            return Some(ProgressEvent::aborted("start address is required".to_string()));
        }

        match self.geocoder.geocode(&self.start_address).await {
            Some(start) => {
                info!(
                    start_address = %self.start_address,
                    coords = %start,
                    total = %self.addresses.len(),
                    "batch_started"
                );
                self.state = RunState::Processing { start, next: 0, successful: 0 };
                None
            }
            None => {
                warn!(start_address = %self.start_address, "batch_start_address_unresolved");
                Some(ProgressEvent::aborted(format!(
                    "could not geocode start address: {}",
                    self.start_address
                )))
            }
        }
    }

    /// Resolve, route, and persist one destination. Every failure in here is
    /// item-fatal: it is reported in the returned event and the batch moves
    /// on to the next address.
    async fn process_item(&self, start: Coordinates, index: usize) -> ProgressEvent {
        let address = &self.addresses[index];
        let current = index + 1;
        let total = self.addresses.len();

        let Some(coords) = self.geocoder.geocode(address).await else {
            warn!(current = %current, total = %total, address = %address, "item_geocode_failed");
            return ProgressEvent::item_failed(current, total, address, ERR_GEOCODE);
        };

        let Some(route) = self.router.route(start, coords).await else {
            warn!(current = %current, total = %total, address = %address, "item_route_failed");
            return ProgressEvent::item_failed(current, total, address, ERR_ROUTE);
        };

        let record = RouteRecord::from_route(&self.start_address, address, route, "");
        match self.store.insert_route(&record) {
            Ok(id) => {
                info!(
                    current = %current,
                    total = %total,
                    address = %address,
                    record_id = %id,
                    distance_km = %record.distance_km,
                    "item_saved"
                );
                ProgressEvent::item_ok(current, total, address)
            }
            Err(e) => {
                error!(current = %current, address = %address, error = %e, "item_persist_failed");
                ProgressEvent::item_failed(current, total, address, &e.to_string())
            }
        }
    }
}
