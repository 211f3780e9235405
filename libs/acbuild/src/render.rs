//! Deterministic `.data` and `.model` rendering for the per-component
//! enumeration ILP ("stable key ordering", §4.3 "Channels token
//! rewritten").
//!
//! The per-component model this crate emits encodes a transition `(inChan,
//! outChan)` as a single flat variable `x[inChan * CHANNEL_ENCODING_BASE +
//! outChan]`, with a trailing `printf` block (not shown here — it lives in
//! the solvec template the component's model fragment is appended to) that
//! prints each set `x[idx]` in the `x[<idx>] <value>` form `solver::glpsol`
//! parses. Keeping the encoding fixed here is what lets this crate decode a
//! `Solution` back into `(inChan, outChan)` without re-deriving GLPK's own
//! variable ordering.

use topology::{Channel, ChannelTable, Component, Port, Topology};

pub const CHANNEL_ENCODING_BASE: u32 = 100_000;

pub fn encode_var(in_channel: u32, out_channel: u32) -> u32 {
    in_channel * CHANNEL_ENCODING_BASE + out_channel
}

pub fn decode_var(var: u32) -> (u32, u32) {
    (var / CHANNEL_ENCODING_BASE, var % CHANNEL_ENCODING_BASE)
}

/// Rewrite a component's model fragment, replacing the `Channels` token
/// with `Channels_<tableId>` for the channel table its first port supports
/// (step 3).
pub fn rewrite_model_template(component: &Component, topo: &Topology) -> String {
    let table_id = component
        .ports
        .iter()
        .find_map(|&idx| topo.ports[idx].sup_port_channel.first().cloned());

    match table_id {
        Some(id) => component.model_template.replace("Channels", &format!("Channels_{id}")),
        None => component.model_template.clone(),
    }
}

/// Render the `.data` text for one (inPort, outPort) candidate pair, with
/// the accumulated `forbidden` tuples from prior solves cut out (spec
/// §4.3 step 2).
pub fn render_cut_data(
    in_port: &Port,
    out_port: &Port,
    table: &ChannelTable,
    forbidden: &[(u32, u32)],
) -> String {
    use std::fmt::Write as _;

    let mut channels: Vec<&Channel> = table.channels.iter().collect();
    channels.sort_by_key(|c| c.no);

    let mut out = String::new();
    let _ = writeln!(out, "param inPort := \"{}\";", in_port.name);
    let _ = writeln!(out, "param outPort := \"{}\";", out_port.name);
    let _ = write!(out, "set Channels_{} :=", table.id);
    for c in &channels {
        let _ = write!(out, " {}", c.no);
    }
    let _ = writeln!(out, ";");

    if !forbidden.is_empty() {
        let _ = writeln!(out, "set Forbidden :=");
        for (in_chan, out_chan) in forbidden {
            let _ = writeln!(out, "  {}", encode_var(*in_chan, *out_chan));
        }
        let _ = writeln!(out, ";");
    }

    out
}
