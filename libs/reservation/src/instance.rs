//! Renders one pathfinding attempt's `.data` text: the compiled skeleton's
//! baked tables (`pathcompiler::render_global_model`) plus this attempt's
//! trial channel, src/dst endpoints, ERO restriction, live in-use
//! projection, and bidi-pair override.

use std::fmt::Write as _;

use pathcompiler::{render_global_model, GlobalSkeleton};

use crate::projection::InUseProjection;

/// One attempt at solving a single `src -> dst` leg over one trial channel.
pub struct InstanceRequest<'a> {
    pub src: &'a str,
    pub dst: &'a str,
    pub trial_channel: &'a str,
    pub forbidden_next_hops: &'a [String],
    pub bidi_allowed: bool,
}

/// Assemble the full `.data` text glpsol needs for one attempt: the
/// skeleton's static `V`/`vt`/`cost`/`pair` tables followed by this
/// attempt's endpoints, channel mask, and exclusions.
pub fn render_instance_data(
    skeleton: &GlobalSkeleton,
    projection: &InUseProjection,
    request: &InstanceRequest<'_>,
) -> String {
    let mut out = render_global_model(skeleton);

    let _ = writeln!(out, "param src := \"{}\";", request.src);
    let _ = writeln!(out, "param dst := \"{}\";", request.dst);
    let _ = writeln!(out, "param bidiAllowed := {};", if request.bidi_allowed { 1 } else { 0 });

    let _ = writeln!(out, "param trialChannel := \"{}\";", request.trial_channel);
    let _ = writeln!(out, "param widthOK :=");
    for channel in &skeleton.all_channels {
        let ok = if channel == request.trial_channel { 1 } else { 0 };
        let _ = writeln!(out, "  \"{channel}\" {ok}");
    }
    let _ = writeln!(out, ";");
    let _ = writeln!(out, "set ChannelRange[\"{0}\"] := \"{0}\";", request.trial_channel);

    let _ = writeln!(out, "param inuseX default 0 :=");
    let mut inuse_x: Vec<u32> = projection.inuse_x.iter().copied().collect();
    inuse_x.sort_unstable();
    for var_id in inuse_x {
        let _ = writeln!(out, "  {var_id} 1");
    }
    let _ = writeln!(out, ";");

    let _ = writeln!(out, "param inuseC default 0 :=");
    let mut inuse_c: Vec<(&(String, u32), &u32)> = projection.inuse_c.iter().collect();
    inuse_c.sort_by(|a, b| a.0.cmp(b.0));
    for ((device, c_id), count) in inuse_c {
        let _ = writeln!(out, "  \"{device}\" {c_id} {count}");
    }
    let _ = writeln!(out, ";");

    let _ = writeln!(out, "set OUT_OF_SERVICES :=");
    for var_id in out_of_service_vars(skeleton, request.forbidden_next_hops) {
        let _ = writeln!(out, "  {var_id}");
    }
    let _ = writeln!(out, ";");

    let _ = writeln!(out, "set NextEroPorts :=");
    for port in request.forbidden_next_hops {
        let _ = writeln!(out, "  \"{port}\"");
    }
    let _ = writeln!(out, ";");

    out
}

/// `OUT_OF_SERVICES`: the skeleton's sentinel-derived forbidden var ids
/// (static per topology) plus, for this attempt, every var whose in-port or
/// out-port is among `forbidden_next_hops` ("ERO-enforced exclusions for
/// 'next hop' ports").
fn out_of_service_vars(skeleton: &GlobalSkeleton, forbidden_next_hops: &[String]) -> Vec<u32> {
    let mut ids: Vec<u32> = skeleton.out_of_service.iter().copied().collect();
    for (&var_id, (in_port, out_port)) in &skeleton.var_ports {
        if forbidden_next_hops.contains(in_port) || forbidden_next_hops.contains(out_port) {
            ids.push(var_id);
        }
    }
    ids.sort_unstable();
    ids.dedup();
    ids
}
