//! Deterministic emission of the global and per-device pathfinding files
//! ("Emission modes").

use std::fmt::Write as _;
use std::path::Path;

use crate::error::PathcompilerError;
use crate::skeleton::{DeviceChunk, DeviceSkeleton, GlobalSkeleton};

pub fn render_global_model(skeleton: &GlobalSkeleton) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "set V :=");
    for name in &skeleton.v {
        let _ = writeln!(out, "  \"{name}\"");
    }
    let _ = writeln!(out, ";");
    let _ = writeln!(out, "param NUM_VARS := {};", skeleton.num_vars());

    let mut vt_entries: Vec<(u32, &(String, u32, String, u32))> = (1..=skeleton.num_vars())
        .filter_map(|id| skeleton.vt.lookup(id).map(|key| (id, key)))
        .collect();
    vt_entries.sort_by_key(|(id, _)| *id);

    let _ = writeln!(out, "param vt :=");
    for (id, (v, j, k, l)) in &vt_entries {
        let _ = writeln!(out, "  [\"{v}\", {j}, \"{k}\", {l}] {id}");
    }
    let _ = writeln!(out, ";");

    let _ = writeln!(out, "param cost :=");
    for (id, key) in &vt_entries {
        if let Some(c) = skeleton.cost.get(*key) {
            let _ = writeln!(out, "  {id} {c}");
        }
    }
    let _ = writeln!(out, ";");

    let _ = writeln!(out, "param pair :=");
    for (id, key) in &vt_entries {
        let p = skeleton.pair.get(*key).copied().unwrap_or(0);
        let _ = writeln!(out, "  {id} {p}");
    }
    let _ = writeln!(out, ";");

    out
}

pub fn render_global_data(skeleton: &GlobalSkeleton, trial_channel: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "param trialChannel := \"{trial_channel}\";");

    let _ = writeln!(out, "param widthOK :=");
    for channel in &skeleton.all_channels {
        let ok = if channel == trial_channel { 1 } else { 0 };
        let _ = writeln!(out, "  \"{channel}\" {ok}");
    }
    let _ = writeln!(out, ";");

    let _ = writeln!(out, "set ChannelRange[\"{trial_channel}\"] := \"{trial_channel}\";");
    let _ = writeln!(out, "set OUT_OF_SERVICES := ;");
    let _ = writeln!(out, "set NextEroPorts := ;");

    out
}

pub fn render_device_model(device: &DeviceSkeleton) -> String {
    format!("# per-device decomposition model for {}\n{}\n", device.device, device.model_text)
}

/// `inuse_c` is the live registry's per-`c_id` reservation count for this
/// device ("In-Use Projection" §3: `inuse_C` divided by the model's
/// `c_divider` encourages reusing an already-activated concentrator).
pub fn render_device_data(
    device: &DeviceSkeleton,
    chunk: &DeviceChunk,
    inuse_c: &std::collections::HashMap<u32, u32>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "param device := \"{}\";", device.device);
    let _ = writeln!(out, "param chunkNo := {};", chunk.chunk_no);
    let _ = writeln!(out, "set Components :=");
    for name in &chunk.components {
        let _ = writeln!(out, "  \"{name}\"");
    }
    let _ = writeln!(out, ";");

    let _ = writeln!(out, "param inuseC default 0 :=");
    let mut counts: Vec<(&u32, &u32)> = inuse_c.iter().collect();
    counts.sort_by_key(|(c_id, _)| **c_id);
    for (c_id, count) in counts {
        let _ = writeln!(out, "  {c_id} {count}");
    }
    let _ = writeln!(out, ";");
    out
}

/// Write the global-mode outputs: one model plus one data file per global
/// channel ("Global: one model `pf_<key>.model` plus one data per
/// channel `pf_<key>_<channelName>.data`").
pub fn emit_global(skeleton: &GlobalSkeleton, key: &str, out_dir: &Path) -> Result<(), PathcompilerError> {
    std::fs::create_dir_all(out_dir)?;
    std::fs::write(out_dir.join(format!("pf_{key}.model")), render_global_model(skeleton))?;
    for channel in &skeleton.all_channels {
        let data = render_global_data(skeleton, channel);
        std::fs::write(out_dir.join(format!("pf_{key}_{channel}.data")), data)?;
    }
    Ok(())
}

/// Write the solvec-mode outputs: one model plus one data file per chunk,
/// per solvec-eligible device ("With solvec").
pub fn emit_solvec(devices: &[DeviceSkeleton], key: &str, out_dir: &Path) -> Result<(), PathcompilerError> {
    std::fs::create_dir_all(out_dir)?;
    for device in devices {
        std::fs::write(
            out_dir.join(format!("solvec_{key}_{}.model", device.device)),
            render_device_model(device),
        )?;
        for chunk in &device.chunks {
            let data = render_device_data(device, chunk, &std::collections::HashMap::new());
            std::fs::write(
                out_dir.join(format!("solvec_{key}_{}_{}.data", device.device, chunk.chunk_no)),
                data,
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_global;
    use std::collections::HashMap;

    const ONE_COMPONENT_TOPOLOGY: &str = r#"
    <topology>
      <channelTables><channelTable id="opt" type="optical"><channel no="1"/></channelTable></channelTables>
      <components>
        <component ref="A" cost="0">
          <model>m</model>
          <port number="1" name="A_IN" io="input"><supPortChannel ref="opt"/></port>
          <port number="2" name="A_OUT" io="output"><supPortChannel ref="opt"/></port>
        </component>
      </components>
      <portPairs></portPairs>
    </topology>
    "#;

    #[test]
    fn device_data_renders_inuse_c_counts_sorted_by_id() {
        let device = DeviceSkeleton { device: "B".to_string(), model_text: String::new(), chunks: Vec::new() };
        let chunk = DeviceChunk { chunk_no: 0, components: vec!["B".to_string()] };
        let inuse_c = HashMap::from([(3u32, 1u32), (1u32, 2u32)]);

        let data = render_device_data(&device, &chunk, &inuse_c);
        let inuse_section = data.split("param inuseC default 0 :=\n").nth(1).unwrap();
        assert!(inuse_section.starts_with("  1 2\n  3 1\n"));
    }

    #[test]
    fn emits_one_data_file_per_global_channel() {
        let (topo, _) = topology::from_xml_str(ONE_COMPONENT_TOPOLOGY).unwrap();
        let skeleton = compile_global(&topo, &HashMap::new()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        emit_global(&skeleton, "test", dir.path()).unwrap();

        assert!(dir.path().join("pf_test.model").exists());
        assert!(dir.path().join("pf_test_opt_1.data").exists());
    }
}
