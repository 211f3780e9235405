//! End-to-end exercise of the wire protocol over a real TCP socket (spec.md
//! §6 "Wire protocol", §8 end-to-end scenarios), built directly on
//! `nrm_server::serve` against a `FakeSolverDriver` so no `glpsol` binary
//! is required to run this test.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use pathcompiler::compile_global;
use reservation::{Engine, ReservationRegistry};
use solver::{FakeSolverDriver, Solution as SolverSolution, SolverOutcome};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

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

async fn spawn_server() -> (std::net::SocketAddr, tempfile::TempDir) {
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
    let skeleton = compile_global(&topo, &connections).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let driver = FakeSolverDriver::always(SolverOutcome::Optimal(SolverSolution {
        x: HashSet::from([skeleton.vt.get(&("A".to_string(), 1, "C".to_string(), 1))]),
        c: HashSet::new(),
    }));

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

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db_path = dir.path().join("reserved.json");

    tokio::spawn(async move {
        let _ = nrm_server::serve(listener, Arc::new(engine), db_path).await;
    });

    (addr, dir)
}

async fn send(stream: &mut TcpStream, line: &str) -> Vec<String> {
    stream.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    stream.flush().await.unwrap();

    let (read_half, _) = stream.split();
    let mut reader = BufReader::new(read_half);
    let mut lines = Vec::new();
    loop {
        let mut buf = String::new();
        reader.read_line(&mut buf).await.unwrap();
        if buf == "\n" || buf.is_empty() {
            break;
        }
        lines.push(buf.trim_end().to_string());
    }
    lines
}

#[tokio::test]
async fn pathfind_then_reserve_then_query_then_terminate() {
    let (addr, _dir) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let route = send(&mut stream, "pathfind -s A_IN -d C_IN").await;
    assert_eq!(route.len(), 1);
    assert!(route[0].contains("A["));

    let reserved = send(&mut stream, "reserve -s A_IN -d C_IN").await;
    assert_eq!(reserved.len(), 1);
    assert!(reserved[0].starts_with('1'));

    let queried = send(&mut stream, "query").await;
    assert_eq!(queried.len(), 1);

    let terminated = send(&mut stream, "terminate -g 1").await;
    assert_eq!(terminated, vec!["terminated 1".to_string()]);

    let queried_again = send(&mut stream, "query").await;
    assert!(queried_again.is_empty());
}

#[tokio::test]
async fn unknown_subcommand_returns_an_error_line() {
    let (addr, _dir) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let lines = send(&mut stream, "frobnicate").await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("ERROR"));
}

#[tokio::test]
async fn terminate_all_clears_every_reservation_atomically() {
    let (addr, _dir) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    send(&mut stream, "reserve -s A_IN -d C_IN -ch opt_1").await;
    send(&mut stream, "reserve -s A_IN -d C_IN -ch opt_2").await;
    assert_eq!(send(&mut stream, "query").await.len(), 2);

    let ack = send(&mut stream, "TERMINATEALL").await;
    assert_eq!(ack, vec!["terminated 2 reservations".to_string()]);
    assert!(send(&mut stream, "query").await.is_empty());
}
