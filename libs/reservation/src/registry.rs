use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use nrm_proto::ReservationRef;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::Reservation;
use crate::projection::InUseProjection;

struct RegistryState {
    reservations: HashMap<Uuid, Reservation>,
    short_ids: HashMap<u32, Uuid>,
    next_short_id: u32,
}

impl RegistryState {
    fn resolve(&self, reference: &ReservationRef) -> Option<Uuid> {
        match reference {
            ReservationRef::Global(id) => self.reservations.contains_key(id).then_some(*id),
            ReservationRef::Short(short) => self.short_ids.get(short).copied(),
        }
    }
}

/// The single owner of live reservation state (: "Global mutable
/// registry: treat as a single owner guarded by a readers-writer lock").
///
/// The `--wdmsa` round-robin cursor lives here too but outside the lock —
/// it is a single counter, not part of the reservation set, and per spec
/// §9's resolved Open Question it is process-local and resets on restart.
pub struct ReservationRegistry {
    state: RwLock<RegistryState>,
    wdmsa_cursor: AtomicU32,
}

impl Default for ReservationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationRegistry {
    pub fn new() -> Self {
        ReservationRegistry {
            state: RwLock::new(RegistryState {
                reservations: HashMap::new(),
                short_ids: HashMap::new(),
                next_short_id: 1,
            }),
            wdmsa_cursor: AtomicU32::new(0),
        }
    }

    /// Commit a reservation, assigning it the next `shortId` (    /// "Ordering guarantees": "Reservations receive shortIds in strict
    /// order of successful commit"). `build` receives the assigned id and
    /// returns the finished record.
    pub async fn commit(&self, build: impl FnOnce(u32) -> Reservation) -> Reservation {
        let mut state = self.state.write().await;
        let short_id = state.next_short_id;
        state.next_short_id += 1;
        let reservation = build(short_id);
        state.short_ids.insert(short_id, reservation.global_id);
        state.reservations.insert(reservation.global_id, reservation.clone());
        reservation
    }

    pub async fn get(&self, reference: &ReservationRef) -> Option<Reservation> {
        let state = self.state.read().await;
        let id = state.resolve(reference)?;
        state.reservations.get(&id).cloned()
    }

    pub async fn remove(&self, reference: &ReservationRef) -> Option<Reservation> {
        let mut state = self.state.write().await;
        let id = state.resolve(reference)?;
        let reservation = state.reservations.remove(&id)?;
        state.short_ids.remove(&reservation.short_id);
        Some(reservation)
    }

    /// `TERMINATEALL` — atomic with respect to external observers (spec
    /// §4.5 "Cancellation"): the whole registry is cleared under one write
    /// lock, so no intermediate state is ever visible.
    pub async fn clear(&self) -> Vec<Reservation> {
        let mut state = self.state.write().await;
        let drained: Vec<Reservation> = state.reservations.drain().map(|(_, r)| r).collect();
        state.short_ids.clear();
        drained
    }

    pub async fn list(&self) -> Vec<Reservation> {
        let state = self.state.read().await;
        let mut all: Vec<Reservation> = state.reservations.values().cloned().collect();
        all.sort_by_key(|r| r.short_id);
        all
    }

    pub async fn projection(&self) -> InUseProjection {
        let state = self.state.read().await;
        let mut projection = InUseProjection::default();
        for reservation in state.reservations.values() {
            projection.inuse_x.extend(reservation.solution.x.iter().copied());
            for (device, activations) in &reservation.solution.c {
                for &c_id in activations {
                    *projection.inuse_c.entry((device.clone(), c_id)).or_insert(0) += 1;
                }
            }
        }
        projection
    }

    /// Replace the whole registry from a durable-store load, re-assigning
    /// `shortId`s in `creationTime` order ("shortIds are
    /// re-assigned on load").
    pub async fn load(&self, mut reservations: Vec<Reservation>) {
        reservations.sort_by_key(|r| r.creation_time);
        let mut state = self.state.write().await;
        state.reservations.clear();
        state.short_ids.clear();
        state.next_short_id = 1;
        for mut reservation in reservations {
            reservation.short_id = state.next_short_id;
            state.next_short_id += 1;
            state.short_ids.insert(reservation.short_id, reservation.global_id);
            state.reservations.insert(reservation.global_id, reservation);
        }
    }

    /// Select the next WDM channel from `candidates` in round-robin order
    /// across calls ("hits each WDM channel in strict
    /// round-robin order").
    pub fn next_wdmsa_channel<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.wdmsa_cursor.fetch_add(1, Ordering::Relaxed) as usize % candidates.len();
        Some(candidates[index].as_str())
    }
}
