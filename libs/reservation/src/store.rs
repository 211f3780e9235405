use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pathcompiler::GlobalSkeleton;
use tracing::error;

use crate::error::ReservationError;
use crate::model::Reservation;
use crate::registry::ReservationRegistry;

/// Load `reserved.json` at startup, feeding every record into `registry`
/// (: "On load, shortIds are re-assigned in creationTime order").
/// A missing file is not an error — a fresh deployment has no store yet.
///
/// Every loaded reservation's `x` set is checked against `skeleton`'s `vt`
/// before it's admitted (invariant: "For every live Reservation, every
/// 4-tuple in its `x` set satisfies `vt[...] > 0` under the current
/// topology"). A reservation that fails this — the topology changed out
/// from under a stale store — is logged as a consistency error and
/// dropped rather than aborting the whole load.
pub async fn load(
    registry: &ReservationRegistry,
    path: &Path,
    skeleton: &GlobalSkeleton,
) -> Result<(), ReservationError> {
    let reservations = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(ReservationError::Persistence { path: path.to_path_buf(), source })
        }
    };

    let reservations: Vec<Reservation> = serde_json::from_str(&reservations)
        .map_err(|source| ReservationError::StoreFormat { path: path.to_path_buf(), source })?;

    let (valid, invalid): (Vec<Reservation>, Vec<Reservation>) =
        reservations.into_iter().partition(|r| is_consistent(r, skeleton));

    for reservation in &invalid {
        let err = ReservationError::ConsistencyViolation(reservation.global_id);
        error!(global_id = %reservation.global_id, "{err}");
    }

    registry.load(valid).await;
    Ok(())
}

/// Every selected variable must still resolve to a tuple under the
/// current skeleton's `vt`.
fn is_consistent(reservation: &Reservation, skeleton: &GlobalSkeleton) -> bool {
    reservation.solution.x.iter().all(|&id| skeleton.vt.lookup(id).is_some())
}

/// Persist the whole registry to `path`, atomically (write to a sibling
/// temp file, then rename over the target) so a crash mid-write never
/// leaves a truncated store behind (`writeDB`).
pub async fn write(registry: &ReservationRegistry, path: &Path) -> Result<(), ReservationError> {
    let reservations = registry.list().await;
    let json = serde_json::to_string_pretty(&reservations)
        .map_err(|source| ReservationError::StoreFormat { path: path.to_path_buf(), source })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| ReservationError::Persistence { path: parent.to_path_buf(), source })?;
    }

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, json)
        .map_err(|source| ReservationError::Persistence { path: tmp_path.clone(), source })?;
    fs::rename(&tmp_path, path)
        .map_err(|source| ReservationError::Persistence { path: path.to_path_buf(), source })?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nrm_proto::ConnectionRequest;
    use std::collections::{HashMap, HashSet};
    use uuid::Uuid;

    const LINE_TOPOLOGY: &str = r#"
    <topology>
      <channelTables><channelTable id="opt" type="optical"><channel no="1"/></channelTable></channelTables>
      <components>
        <component ref="A" cost="0">
          <model>m</model>
          <port number="1" name="A_IN" io="input"><supPortChannel ref="opt"/></port>
          <port number="2" name="A_OUT" io="output"><supPortChannel ref="opt"/></port>
        </component>
        <component ref="B" cost="0">
          <model>m</model>
          <port number="1" name="B_IN" io="input"><supPortChannel ref="opt"/></port>
        </component>
      </components>
      <portPairs></portPairs>
    </topology>
    "#;

    /// A skeleton with exactly one compiled variable (id 1), for a
    /// one-available-connection topology (`A_IN[1] -> A_OUT[1] -> PORT:B_IN`).
    fn one_var_skeleton() -> GlobalSkeleton {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let mut connections = HashMap::new();
        connections.insert(
            "A".to_string(),
            vec![acbuild::AvailableConnection {
                in_port: "A_1".into(),
                in_channel: 1,
                out_port: "A_2".into(),
                out_channel: 1,
            }],
        );
        pathcompiler::compile_global(&topo, &connections).unwrap()
    }

    fn sample() -> Reservation {
        Reservation {
            global_id: Uuid::new_v4(),
            short_id: 7,
            request: ConnectionRequest { src: "A".into(), dst: "B".into(), ..Default::default() },
            solution: crate::model::Solution { x: HashSet::from([1]), c: HashMap::new() },
            creation_time: Utc::now(),
            bidi: false,
            wdmsa: false,
            route_text: "A -> B".to_string(),
        }
    }

    #[tokio::test]
    async fn write_then_load_round_trips_reservations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reserved.json");
        let skeleton = one_var_skeleton();

        let registry = ReservationRegistry::new();
        let committed = registry.commit(|_| sample()).await;
        write(&registry, &path).await.unwrap();

        let loaded_registry = ReservationRegistry::new();
        load(&loaded_registry, &path, &skeleton).await.unwrap();
        let all = loaded_registry.list().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].global_id, committed.global_id);
        assert_eq!(all[0].short_id, 1); // re-assigned on load, not the original 7.
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        let registry = ReservationRegistry::new();
        load(&registry, &path, &one_var_skeleton()).await.unwrap();
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn write_leaves_no_stray_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reserved.json");
        let registry = ReservationRegistry::new();
        registry.commit(|_| sample()).await;
        write(&registry, &path).await.unwrap();

        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists());
    }

    #[tokio::test]
    async fn reservation_referencing_a_stale_var_id_is_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reserved.json");

        let registry = ReservationRegistry::new();
        registry
            .commit(|_| {
                let mut r = sample();
                r.solution.x = HashSet::from([999]); // no topology compiles this many vars
                r
            })
            .await;
        write(&registry, &path).await.unwrap();

        let loaded_registry = ReservationRegistry::new();
        load(&loaded_registry, &path, &one_var_skeleton()).await.unwrap();
        assert!(loaded_registry.list().await.is_empty());
    }
}
