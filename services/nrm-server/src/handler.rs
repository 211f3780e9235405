//! Maps one parsed `nrm_proto::Request` onto the corresponding `Engine`
//! call and renders the result as a `nrm_proto::Response`.

use std::path::Path;

use nrm_proto::{Request, Response};
use reservation::{format_reserve_ack, ConnectOutcome, Engine};

pub async fn handle(engine: &Engine, db_path: &Path, request: Request) -> Response {
    match request {
        Request::Pathfind(req) => match engine.pathfind(&req).await {
            Ok(ConnectOutcome::Route(text)) => Response::Route(text),
            Ok(ConnectOutcome::NoRoute) => Response::NoRoute,
            Ok(ConnectOutcome::Reserved(_)) => Response::Error("pathfind unexpectedly committed a reservation".into()),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::Reserve(req) => match engine.reserve(&req).await {
            Ok(ConnectOutcome::Reserved(r)) => Response::Ack(format_reserve_ack(r.short_id, &r.route_text)),
            Ok(ConnectOutcome::NoRoute) => Response::NoRoute,
            Ok(ConnectOutcome::Route(_)) => Response::Error("reserve unexpectedly returned a bare route".into()),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::Query(reference) => Response::QueryResult(engine.query(reference).await),
        Request::Terminate(reference) => match engine.terminate(reference).await {
            Ok(r) => Response::Ack(format!("terminated {}", r.short_id)),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::TerminateAll => {
            let n = engine.terminate_all().await;
            Response::Ack(format!("terminated {n} reservations"))
        }
        Request::WriteDb => match engine.write_db(db_path).await {
            Ok(()) => Response::Ack("OK".to_string()),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::Deltmp(set) => {
            if let Some(enabled) = set {
                engine.set_deltmp(enabled);
            }
            Response::Ack(format!("deltmp {}", if engine.deltmp() { "on" } else { "off" }))
        }
        Request::DumpGlpsol(set) => {
            if let Some(enabled) = set {
                engine.set_dump_glpsol(enabled);
            }
            Response::Ack(format!("dumpglpsol {}", if engine.dump_glpsol() { "on" } else { "off" }))
        }
    }
}
