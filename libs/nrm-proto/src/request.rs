//! The line-oriented request grammar (spec.md §6 "Wire protocol"): one
//! subcommand token followed by `-flag value` pairs, parsed without any
//! help from `clap` (which parses process argv, not a line read off a
//! socket — spec.md explicitly scopes out only "the CLI argument parser").

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtoError;

/// Addresses a reservation either by its per-process short id or its
/// globally unique id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationRef {
    Short(u32),
    Global(Uuid),
}

impl ReservationRef {
    pub fn parse(text: &str) -> Result<Self, ProtoError> {
        if let Ok(short) = text.parse::<u32>() {
            return Ok(ReservationRef::Short(short));
        }
        if let Ok(global) = text.parse::<Uuid>() {
            return Ok(ReservationRef::Global(global));
        }
        Err(ProtoError::InvalidValue(text.to_string()))
    }
}

/// The parameters common to `pathfind` and `reserve`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub src: String,
    pub dst: String,
    #[serde(default)]
    pub ero: Vec<String>,
    #[serde(default)]
    pub ch: Vec<String>,
    #[serde(default)]
    pub bi: bool,
    #[serde(default)]
    pub wdmsa: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Pathfind(ConnectionRequest),
    Reserve(ConnectionRequest),
    Query(Option<ReservationRef>),
    Terminate(ReservationRef),
    TerminateAll,
    WriteDb,
    Deltmp(Option<bool>),
    DumpGlpsol(Option<bool>),
}

/// Parse one request line. Tokens are split on whitespace; flag values
/// that need embedded spaces aren't supported (no port display name in
/// this protocol's vocabulary contains one).
pub fn parse_line(line: &str) -> Result<Request, ProtoError> {
    let mut tokens = line.split_whitespace();
    let subcommand = tokens.next().ok_or(ProtoError::Empty)?;
    let rest: Vec<&str> = tokens.collect();

    match subcommand {
        "pathfind" => Ok(Request::Pathfind(parse_connection_request(&rest)?)),
        "reserve" => Ok(Request::Reserve(parse_connection_request(&rest)?)),
        "query" => Ok(Request::Query(parse_optional_ref(&rest)?)),
        "terminate" => {
            let reference = value_after(&rest, "-g").ok_or(ProtoError::MissingFlag("-g"))?;
            Ok(Request::Terminate(ReservationRef::parse(reference)?))
        }
        "TERMINATEALL" => Ok(Request::TerminateAll),
        "writeDB" => Ok(Request::WriteDb),
        "deltmp" => Ok(Request::Deltmp(parse_optional_bool(&rest)?)),
        "dumpglpsol" => Ok(Request::DumpGlpsol(parse_optional_bool(&rest)?)),
        other => Err(ProtoError::UnknownSubcommand(other.to_string())),
    }
}

fn parse_connection_request(tokens: &[&str]) -> Result<ConnectionRequest, ProtoError> {
    let src = value_after(tokens, "-s").ok_or(ProtoError::MissingFlag("-s"))?.to_string();
    let dst = value_after(tokens, "-d").ok_or(ProtoError::MissingFlag("-d"))?.to_string();
    let ero = collect_values(tokens, "-ero");
    let ch = collect_values(tokens, "-ch");
    let bi = has_flag(tokens, "-bi");
    let wdmsa = has_flag(tokens, "-wdmsa") || has_flag(tokens, "--wdmsa");

    check_known_flags(tokens, &["-s", "-d", "-ero", "-ch", "-bi", "-wdmsa", "--wdmsa"])?;

    Ok(ConnectionRequest { src, dst, ero, ch, bi, wdmsa })
}

fn parse_optional_ref(tokens: &[&str]) -> Result<Option<ReservationRef>, ProtoError> {
    check_known_flags(tokens, &["-g"])?;
    match value_after(tokens, "-g") {
        Some(text) => Ok(Some(ReservationRef::parse(text)?)),
        None => Ok(None),
    }
}

fn parse_optional_bool(tokens: &[&str]) -> Result<Option<bool>, ProtoError> {
    check_known_flags(tokens, &["-on", "-off"])?;
    if has_flag(tokens, "-off") {
        return Ok(Some(false));
    }
    if has_flag(tokens, "-on") {
        return Ok(Some(true));
    }
    Ok(None)
}

fn value_after<'a>(tokens: &[&'a str], flag: &str) -> Option<&'a str> {
    tokens.iter().position(|&t| t == flag).and_then(|idx| tokens.get(idx + 1)).copied()
}

/// Every value following an occurrence of `flag`, consuming a whole run of
/// non-flag tokens after it rather than just the one immediately after —
/// `-ch opt_1 opt_2` and `-ch opt_1 -ch opt_2` both yield two values.
fn collect_values(tokens: &[&str], flag: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == flag {
            i += 1;
            while i < tokens.len() && !tokens[i].starts_with('-') {
                values.push(tokens[i].to_string());
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    values
}

fn has_flag(tokens: &[&str], flag: &str) -> bool {
    tokens.iter().any(|&t| t == flag)
}

fn check_known_flags(tokens: &[&str], known: &[&str]) -> Result<(), ProtoError> {
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if token.starts_with('-') {
            if !known.contains(&token) {
                return Err(ProtoError::UnknownFlag(token.to_string()));
            }
            i += if token == "-bi" || token == "-wdmsa" || token == "--wdmsa" || token == "-on" || token == "-off" {
                1
            } else {
                2
            };
        } else {
            i += 1;
        }
    }
    Ok(())
}
