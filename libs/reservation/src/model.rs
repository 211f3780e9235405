//! Reservation record and solution shapes ("Reservation", "Solution").

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use nrm_proto::ConnectionRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The variables a connection actually occupies: the global pathfinding
/// `x` set plus, for solvec decompositions, each activated device's `c`
/// set keyed by device name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub x: HashSet<u32>,
    #[serde(default)]
    pub c: HashMap<String, HashSet<u32>>,
}

/// A committed connection. Immutable once built — `terminate`/
/// `TERMINATEALL` remove the whole record rather than edit it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub global_id: Uuid,
    pub short_id: u32,
    pub request: ConnectionRequest,
    pub solution: Solution,
    pub creation_time: DateTime<Utc>,
    pub bidi: bool,
    pub wdmsa: bool,
    pub route_text: String,
}
