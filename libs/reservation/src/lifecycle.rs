//! The Reservation Engine: the request lifecycle binding topology, the
//! compiled pathfinding skeleton, the solvec decomposition compiler, a
//! `SolverDriver`, and the live registry together ("Reservation
//! Engine").

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use nrm_proto::{ConnectionRequest, ReservationRef};
use pathcompiler::{DeviceSkeleton, GlobalSkeleton};
use solver::{SolverDriver, SolverOutcome};
use tokio::task::JoinSet;
use topology::{Port, Topology};
use uuid::Uuid;

use crate::ero::{self, EroSegment};
use crate::error::ReservationError;
use crate::instance::{render_instance_data, InstanceRequest};
use crate::model::{Reservation, Solution};
use crate::projection::InUseProjection;
use crate::registry::ReservationRegistry;

/// The outcome of resolving a connection's route, before it is either
/// handed back as a pathfind result or committed as a reservation.
struct RouteResult {
    channel: String,
    x: HashSet<u32>,
    route_text: String,
}

/// What `Engine::pathfind`/`Engine::reserve` return on success.
pub enum ConnectOutcome {
    Route(String),
    Reserved(Reservation),
    NoRoute,
}

/// Binds every dependency a request needs: the immutable topology and
/// compiled skeleton, the solvec device templates, the solver, the live
/// registry, and where to find the static pathfinding model + scratch
/// space. One `Engine` is built once at startup and shared across every
/// connection the TCP server accepts.
pub struct Engine {
    topo: Arc<Topology>,
    skeleton: Arc<GlobalSkeleton>,
    solvec_devices: Vec<DeviceSkeleton>,
    driver: Arc<dyn SolverDriver>,
    registry: Arc<ReservationRegistry>,
    global_model_path: PathBuf,
    tmp_dir: PathBuf,
    num_threads: usize,
    num_comps: AtomicUsize,
}

impl Engine {
    /// Build the engine, validating that every device named in
    /// `solvec_devices` is actually a solvec-eligible component of `topo`
    /// ("decomposition ... runs only over components marked eligible").
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        topo: Arc<Topology>,
        skeleton: Arc<GlobalSkeleton>,
        solvec_devices: Vec<DeviceSkeleton>,
        driver: Arc<dyn SolverDriver>,
        registry: Arc<ReservationRegistry>,
        global_model_path: PathBuf,
        tmp_dir: PathBuf,
        num_threads: usize,
    ) -> Result<Self, ReservationError> {
        for device in &solvec_devices {
            match topo.component(&device.device) {
                Some(component) if component.is_solvec_eligible() => {}
                _ => return Err(ReservationError::UnknownSolvecDevice(device.device.clone())),
            }
        }

        Ok(Engine {
            topo,
            skeleton,
            solvec_devices,
            driver,
            registry,
            global_model_path,
            tmp_dir,
            num_threads: num_threads.max(1),
            num_comps: AtomicUsize::new(0),
        })
    }

    pub fn solvec_device_names(&self) -> Vec<String> {
        self.solvec_devices.iter().map(|d| d.device.clone()).collect()
    }

    pub fn set_num_comps(&self, num_comps: usize) {
        self.num_comps.store(num_comps, Ordering::Relaxed);
    }

    fn num_comps(&self) -> usize {
        self.num_comps.load(Ordering::Relaxed)
    }

    pub fn set_deltmp(&self, enabled: bool) {
        self.driver.set_deltmp(enabled);
    }

    pub fn deltmp(&self) -> bool {
        self.driver.deltmp()
    }

    pub fn set_dump_glpsol(&self, enabled: bool) {
        self.driver.set_dump_glpsol(enabled);
    }

    pub fn dump_glpsol(&self) -> bool {
        self.driver.dump_glpsol()
    }

    /// `pathfind`: resolve a route without reserving anything.
    pub async fn pathfind(&self, request: &ConnectionRequest) -> Result<ConnectOutcome, ReservationError> {
        match self.try_connect(request).await? {
            Some(result) => Ok(ConnectOutcome::Route(result.route_text)),
            None => Ok(ConnectOutcome::NoRoute),
        }
    }

    /// `reserve`: resolve a route, run solvec decomposition over every
    /// activated eligible device, and commit the reservation atomically.
    pub async fn reserve(&self, request: &ConnectionRequest) -> Result<ConnectOutcome, ReservationError> {
        let Some(result) = self.try_connect(request).await? else {
            return Ok(ConnectOutcome::NoRoute);
        };

        let activated = self.activated_solvec_components(&result.x);
        let c = if activated.is_empty() {
            HashMap::new()
        } else {
            let projection = self.registry.projection().await;
            self.decompose(&activated, &projection).await?
        };

        let route_text = result.route_text.clone();
        let reservation = self
            .registry
            .commit(|short_id| Reservation {
                global_id: Uuid::new_v4(),
                short_id,
                request: request.clone(),
                solution: Solution { x: result.x, c },
                creation_time: Utc::now(),
                bidi: request.bi,
                wdmsa: request.wdmsa,
                route_text,
            })
            .await;

        Ok(ConnectOutcome::Reserved(reservation))
    }

    pub async fn query(&self, reference: Option<ReservationRef>) -> Vec<String> {
        match reference {
            Some(r) => self.registry.get(&r).await.iter().map(query_line).collect(),
            None => self.registry.list().await.iter().map(query_line).collect(),
        }
    }

    pub async fn terminate(&self, reference: ReservationRef) -> Result<Reservation, ReservationError> {
        self.registry
            .remove(&reference)
            .await
            .ok_or_else(|| ReservationError::UnknownReservation(format!("{reference:?}")))
    }

    pub async fn terminate_all(&self) -> usize {
        self.registry.clear().await.len()
    }

    pub async fn write_db(&self, path: &Path) -> Result<(), ReservationError> {
        crate::store::write(&self.registry, path).await
    }

    /// Resolve a full request (possibly ERO-segmented, possibly bidi)
    /// across candidate channels in order, stopping at the first channel
    /// every segment solves on.
    async fn try_connect(&self, request: &ConnectionRequest) -> Result<Option<RouteResult>, ReservationError> {
        let segments = ero::segment(&request.src, &request.dst, &request.ero);
        for waypoint in std::iter::once(&request.src).chain(request.ero.iter()).chain(std::iter::once(&request.dst))
        {
            self.find_port(waypoint).ok_or_else(|| ReservationError::UnknownPort(waypoint.clone()))?;
        }

        let candidates = self.candidate_channels(request);
        let projection = self.registry.projection().await;

        for channel in candidates {
            if let Some((x, route_text)) =
                self.try_channel_across_segments(&segments, &channel, request.bi, &projection).await?
            {
                return Ok(Some(RouteResult { channel, x, route_text }));
            }
        }
        Ok(None)
    }

    fn find_port(&self, display_name: &str) -> Option<&Port> {
        self.topo.ports.iter().find(|p| p.display_name == display_name)
    }

    fn candidate_channels(&self, request: &ConnectionRequest) -> Vec<String> {
        if request.wdmsa {
            let base = if request.ch.is_empty() { self.all_channels_in_table_order() } else { request.ch.clone() };
            self.registry.next_wdmsa_channel(&base).map(|c| vec![c.to_string()]).unwrap_or_default()
        } else if !request.ch.is_empty() {
            request.ch.clone()
        } else {
            self.all_channels_in_table_order()
        }
    }

    /// All channels of all optical tables, in `(table, no)` declaration
    /// order — the default trial order when `-ch` is absent. `skeleton.
    /// all_channels` is sorted lexically instead, which would put `opt_10`
    /// before `opt_2`, so this reads straight from the topology.
    fn all_channels_in_table_order(&self) -> Vec<String> {
        self.topo
            .channel_tables
            .iter()
            .flat_map(|t| t.channels.iter().map(move |c| format!("{}_{}", t.id, c.no)))
            .collect()
    }

    async fn try_channel_across_segments(
        &self,
        segments: &[EroSegment],
        channel: &str,
        bi: bool,
        projection: &InUseProjection,
    ) -> Result<Option<(HashSet<u32>, String)>, ReservationError> {
        let mut merged = HashSet::new();
        let mut lines = Vec::new();

        for segment in segments {
            if segment.src == segment.dst {
                lines.push(format!("{} == {} (zero-hop)", segment.src, segment.dst));
                continue;
            }

            let Some(fwd) = self
                .solve_one(&segment.src, &segment.dst, channel, &segment.forbidden_next_hops, bi, projection)
                .await?
            else {
                return Ok(None);
            };
            lines.extend(self.route_lines(&segment.src, &fwd, channel));
            merged.extend(fwd);

            if bi {
                let Some(rev) = self
                    .solve_one(&segment.dst, &segment.src, channel, &segment.forbidden_next_hops, true, projection)
                    .await?
                else {
                    return Ok(None);
                };
                lines.extend(self.route_lines(&segment.dst, &rev, channel));
                merged.extend(rev);
            }
        }

        Ok(Some((merged, lines.join("\n"))))
    }

    async fn solve_one(
        &self,
        src: &str,
        dst: &str,
        channel: &str,
        forbidden_next_hops: &[String],
        bidi_allowed: bool,
        projection: &InUseProjection,
    ) -> Result<Option<HashSet<u32>>, ReservationError> {
        let request = InstanceRequest { src, dst, trial_channel: channel, forbidden_next_hops, bidi_allowed };
        let data = render_instance_data(&self.skeleton, projection, &request);

        let outcome =
            self.solve_blocking(self.global_model_path.clone(), data, self.tmp_dir.clone(), Uuid::new_v4()).await?;

        match outcome {
            SolverOutcome::Optimal(solution) => Ok(Some(solution.x)),
            SolverOutcome::Infeasible => Ok(None),
            SolverOutcome::Unbounded => {
                Err(ReservationError::UnboundedSolve { src: src.to_string(), dst: dst.to_string() })
            }
        }
    }

    async fn solve_blocking(
        &self,
        model_file: PathBuf,
        data_text: String,
        tmp_dir: PathBuf,
        work_id: Uuid,
    ) -> Result<SolverOutcome, ReservationError> {
        let driver = self.driver.clone();
        tokio::task::spawn_blocking(move || driver.solve(&model_file, &data_text, &tmp_dir, work_id))
            .await
            .expect("solver task panicked")
            .map_err(ReservationError::from)
    }

    /// Order the var ids selected for one segment along the path starting
    /// at `entry_display_name`'s owning component, and render one route
    /// line per hop.
    fn route_lines(&self, entry_display_name: &str, vars: &HashSet<u32>, channel: &str) -> Vec<String> {
        let Some(start) = self.find_port(entry_display_name) else { return Vec::new() };
        let start_component = self.topo.components[start.component].name.clone();

        let mut by_component: HashMap<&str, Vec<u32>> = HashMap::new();
        for &id in vars {
            if let Some((component, ..)) = self.skeleton.vt.lookup(id) {
                by_component.entry(component.as_str()).or_default().push(id);
            }
        }
        for ids in by_component.values_mut() {
            ids.sort_unstable();
        }

        let mut lines = Vec::new();
        let mut current = start_component;
        loop {
            let Some(ids) = by_component.get_mut(current.as_str()) else { break };
            let Some(var_id) = ids.pop() else { break };
            let Some(key) = self.skeleton.vt.lookup(var_id) else { break };
            let (in_display, out_display) =
                self.skeleton.var_ports.get(&var_id).cloned().unwrap_or_default();
            lines.push(format!("{}[{channel}] {in_display}(IN) -> {out_display}(OUT)", key.0));

            if key.2.starts_with("PORT:") {
                break;
            }
            current = key.2.clone();
        }
        lines
    }

    /// The distinct solvec-eligible components a solution's `x` set
    /// actually traverses, sorted for deterministic chunking.
    fn activated_solvec_components(&self, vars: &HashSet<u32>) -> Vec<String> {
        let mut set = HashSet::new();
        for &id in vars {
            if let Some((component, ..)) = self.skeleton.vt.lookup(id) {
                if self.topo.component(component).map(|c| c.is_solvec_eligible()).unwrap_or(false) {
                    set.insert(component.clone());
                }
            }
        }
        let mut out: Vec<String> = set.into_iter().collect();
        out.sort();
        out
    }

    /// Fan out one decomposition subproblem per activated device, bounded
    /// to `num_threads` concurrent solves ("bounded-parallel
    /// decomposition"). If any device's chunks don't all solve optimal,
    /// the whole reservation fails and every partial result is discarded.
    async fn decompose(
        &self,
        activated: &[String],
        projection: &InUseProjection,
    ) -> Result<HashMap<String, HashSet<u32>>, ReservationError> {
        let devices = pathcompiler::compile_solvec(&self.topo, activated, self.num_comps());
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.num_threads));

        let mut tasks = JoinSet::new();
        for device in devices {
            let permit = semaphore.clone();
            let driver = self.driver.clone();
            let tmp_dir = self.tmp_dir.clone();
            let inuse_c = projection.c_counts_for(&device.device);
            tasks.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore closed");
                solve_device(driver, tmp_dir, device, inuse_c).await
            });
        }

        let mut result = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined.expect("decomposition task panicked") {
                Ok((device, vars)) => {
                    result.insert(device, vars);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(result)
    }
}

async fn solve_device(
    driver: Arc<dyn SolverDriver>,
    tmp_dir: PathBuf,
    device: DeviceSkeleton,
    inuse_c: HashMap<u32, u32>,
) -> Result<(String, HashSet<u32>), ReservationError> {
    std::fs::create_dir_all(&tmp_dir).map_err(|source| ReservationError::Persistence { path: tmp_dir.clone(), source })?;
    let model_path = tmp_dir.join(format!("solvec_{}.model", device.device));
    std::fs::write(&model_path, &device.model_text)
        .map_err(|source| ReservationError::Persistence { path: model_path.clone(), source })?;

    let mut c_vars = HashSet::new();
    for chunk in &device.chunks {
        let data = pathcompiler::render_device_data(&device, chunk, &inuse_c);
        let model_path = model_path.clone();
        let chunk_tmp_dir = tmp_dir.clone();
        let driver = driver.clone();
        let work_id = Uuid::new_v4();
        let outcome = tokio::task::spawn_blocking(move || driver.solve(&model_path, &data, &chunk_tmp_dir, work_id))
            .await
            .expect("solver task panicked")?;

        match outcome {
            SolverOutcome::Optimal(solution) => c_vars.extend(solution.c),
            SolverOutcome::Infeasible | SolverOutcome::Unbounded => {
                return Err(ReservationError::DecompositionInfeasible { device: device.device.clone() });
            }
        }
    }
    Ok((device.device.clone(), c_vars))
}

fn query_line(reservation: &Reservation) -> String {
    format!(
        "{} {} : {}",
        reservation.short_id,
        reservation.global_id,
        reservation.route_text.replace('\n', "; ")
    )
}

/// Prefix a reservation's short id onto the first line of its route text,
/// leaving any further hop lines untouched (a multi-hop `reserve` response
/// is the route text verbatim with the id only on the first line).
pub fn format_reserve_ack(short_id: u32, route_text: &str) -> String {
    let mut lines = route_text.lines();
    match lines.next() {
        Some(first) => {
            let mut out = format!("{short_id} {first}");
            for rest in lines {
                out.push('\n');
                out.push_str(rest);
            }
            out
        }
        None => short_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathcompiler::compile_global;
    use solver::{FakeSolverDriver, Solution as SolverSolution};

    const LINE_TOPOLOGY: &str = r#"
    <topology>
      <channelTables><channelTable id="opt" type="optical"><channel no="1"/><channel no="2"/></channelTable></channelTables>
      <components>
        <component ref="A" cost="1.0">
          <model>m</model>
          <port number="1" name="A_IN" io="input"><supPortChannel ref="opt"/></port>
          <port number="2" name="A_OUT" io="output"><supPortChannel ref="opt"/></port>
        </component>
        <component ref="C" cost="1.0">
          <model>m</model>
          <port number="1" name="C_IN" io="input"><supPortChannel ref="opt"/></port>
        </component>
      </components>
      <portPairs>
        <net code="AC" pair="AC-link" cost="0.5"><end port="A_2"/><end port="C_1"/></net>
      </portPairs>
    </topology>
    "#;

    fn sample_connections() -> HashMap<String, Vec<acbuild::AvailableConnection>> {
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
        connections
    }

    /// The var id the skeleton assigns to the one available A -> C
    /// transition, computed standalone so tests can pre-arm a fake driver
    /// with it before an `Engine` exists.
    fn ac_var_id() -> u32 {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        compile_global(&topo, &sample_connections()).unwrap().vt.get(&("A".to_string(), 1, "C".to_string(), 1))
    }

    fn sample_engine(driver: FakeSolverDriver) -> (Engine, tempfile::TempDir) {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let skeleton = compile_global(&topo, &sample_connections()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let engine = Engine::new(
            Arc::new(topo),
            Arc::new(skeleton),
            Vec::new(),
            Arc::new(driver),
            Arc::new(ReservationRegistry::new()),
            dir.path().join("global.model"),
            dir.path().to_path_buf(),
            2,
        )
        .unwrap();
        (engine, dir)
    }

    fn request(src: &str, dst: &str) -> ConnectionRequest {
        ConnectionRequest { src: src.into(), dst: dst.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn pathfind_reports_a_route_without_committing_anything() {
        let driver = FakeSolverDriver::always(solver::SolverOutcome::Optimal(SolverSolution {
            x: HashSet::from([ac_var_id()]),
            c: HashSet::new(),
        }));
        let (engine, _dir) = sample_engine(driver);

        match engine.pathfind(&request("A_IN", "C_IN")).await.unwrap() {
            ConnectOutcome::Route(text) => assert!(text.contains("A[")),
            _ => panic!("expected a route"),
        }
        assert!(engine.query(None).await.is_empty());
    }

    #[tokio::test]
    async fn reserve_commits_and_terminate_removes_it() {
        let driver = FakeSolverDriver::always(solver::SolverOutcome::Optimal(SolverSolution {
            x: HashSet::from([ac_var_id()]),
            c: HashSet::new(),
        }));
        let (engine, _dir) = sample_engine(driver);

        let reservation = match engine.reserve(&request("A_IN", "C_IN")).await.unwrap() {
            ConnectOutcome::Reserved(r) => r,
            _ => panic!("expected a reservation"),
        };
        assert_eq!(reservation.short_id, 1);

        let queried = engine.query(None).await;
        assert_eq!(queried.len(), 1);

        let removed = engine.terminate(ReservationRef::Short(1)).await.unwrap();
        assert_eq!(removed.global_id, reservation.global_id);
        assert!(engine.query(None).await.is_empty());
    }

    #[tokio::test]
    async fn infeasible_solve_reports_no_route() {
        let driver = FakeSolverDriver::always(solver::SolverOutcome::Infeasible);
        let (engine, _dir) = sample_engine(driver);

        match engine.pathfind(&request("A_IN", "C_IN")).await.unwrap() {
            ConnectOutcome::NoRoute => {}
            _ => panic!("expected no route"),
        }
    }

    #[tokio::test]
    async fn unknown_port_is_rejected_before_any_solve() {
        let driver = FakeSolverDriver::always(solver::SolverOutcome::Infeasible);
        let (engine, _dir) = sample_engine(driver);

        let result = engine.pathfind(&request("GHOST", "C_IN")).await;
        assert!(matches!(result, Err(ReservationError::UnknownPort(_))));
    }

    const SOLVEC_TOPOLOGY: &str = r#"
    <topology>
      <channelTables><channelTable id="opt" type="optical"><channel no="1"/><channel no="2"/></channelTable></channelTables>
      <components>
        <component ref="X" cost="1.0">
          <model>m</model>
          <attribute name="Controller" value="true"/>
          <attribute name="Socket" value="true"/>
          <port number="1" name="X_IN" io="input"><supPortChannel ref="opt"/></port>
          <port number="2" name="X_OUT" io="output"><supPortChannel ref="opt"/></port>
        </component>
      </components>
      <portPairs></portPairs>
    </topology>
    "#;

    /// A `reserve` that activates a solvec-eligible device feeds the live
    /// registry's `inuse_C` count for that device's concentrator ids into
    /// the *next* reservation's decomposition data, encouraging reuse of an
    /// already-activated concentrator (spec.md §3 "In-Use Projection").
    #[tokio::test]
    async fn second_reservations_decompose_sees_first_reservations_inuse_c() {
        let (topo, _) = topology::from_xml_str(SOLVEC_TOPOLOGY).unwrap();
        let mut connections = HashMap::new();
        connections.insert(
            "X".to_string(),
            vec![acbuild::AvailableConnection { in_port: "X_1".into(), in_channel: 1, out_port: "X_2".into(), out_channel: 1 }],
        );
        let skeleton = compile_global(&topo, &connections).unwrap();
        let x_var = skeleton.vt.get(&("X".to_string(), 1, "PORT:X_OUT".to_string(), 1));

        let driver = Arc::new(FakeSolverDriver::new([
            Ok(solver::SolverOutcome::Optimal(SolverSolution { x: HashSet::from([x_var]), c: HashSet::new() })),
            Ok(solver::SolverOutcome::Optimal(SolverSolution { x: HashSet::new(), c: HashSet::from([17]) })),
            Ok(solver::SolverOutcome::Optimal(SolverSolution { x: HashSet::from([x_var]), c: HashSet::new() })),
            Ok(solver::SolverOutcome::Optimal(SolverSolution { x: HashSet::new(), c: HashSet::from([17]) })),
        ]));

        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(
            Arc::new(topo),
            Arc::new(skeleton),
            vec![DeviceSkeleton { device: "X".to_string(), model_text: String::new(), chunks: Vec::new() }],
            driver.clone(),
            Arc::new(ReservationRegistry::new()),
            dir.path().join("global.model"),
            dir.path().to_path_buf(),
            1,
        )
        .unwrap();

        let first = engine.reserve(&request("X_IN", "X_OUT")).await.unwrap();
        assert!(matches!(first, ConnectOutcome::Reserved(_)));

        let second = engine.reserve(&request("X_IN", "X_OUT")).await.unwrap();
        assert!(matches!(second, ConnectOutcome::Reserved(_)));

        let calls = driver.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[3].data_text.contains("  17 1\n"), "{}", calls[3].data_text);
    }

    #[test]
    fn format_reserve_ack_prefixes_only_the_first_line() {
        assert_eq!(format_reserve_ack(7, "A[opt_1] x -> y\nB[opt_1] y -> z"), "7 A[opt_1] x -> y\nB[opt_1] y -> z");
        assert_eq!(format_reserve_ack(3, ""), "3");
    }

    #[test]
    fn unknown_solvec_device_is_rejected_at_construction() {
        let (topo, _) = topology::from_xml_str(LINE_TOPOLOGY).unwrap();
        let skeleton = compile_global(&topo, &HashMap::new()).unwrap();
        let bogus = DeviceSkeleton { device: "A".to_string(), model_text: String::new(), chunks: Vec::new() };
        let dir = tempfile::tempdir().unwrap();

        let result = Engine::new(
            Arc::new(topo),
            Arc::new(skeleton),
            vec![bogus],
            Arc::new(FakeSolverDriver::always(solver::SolverOutcome::Infeasible)),
            Arc::new(ReservationRegistry::new()),
            dir.path().join("global.model"),
            dir.path().to_path_buf(),
            1,
        );
        // "A" has no Controller/Socket attributes, so it isn't solvec-eligible.
        assert!(matches!(result, Err(ReservationError::UnknownSolvecDevice(_))));
    }
}
