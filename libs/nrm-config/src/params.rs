use serde::{Deserialize, Serialize};

fn default_logger() -> String {
    "info".to_string()
}

fn default_topo_xml() -> String {
    "topology.xml".to_string()
}

fn default_glpk_dir() -> String {
    "glpk".to_string()
}

fn default_db_dir() -> String {
    "db".to_string()
}

fn default_nrm_host() -> String {
    "127.0.0.1".to_string()
}

fn default_nrm_port() -> u16 {
    6700
}

fn default_pf_tmp_model() -> String {
    "pf-template.model".to_string()
}

fn default_solvec_tmp_model() -> String {
    // Typo carried over from the original param.json key; kept verbatim so
    // existing deployments' config files keep parsing.
    "solvec-templae.model".to_string()
}

/// The contents of `param.json`. Every field has a default so a deployment
/// only needs to override what differs from the stock layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    #[serde(default = "default_logger")]
    pub logger: String,

    #[serde(default)]
    pub log_config: Option<String>,

    #[serde(default = "default_topo_xml")]
    pub topo_xml: String,

    #[serde(default = "default_glpk_dir")]
    pub glpk_dir: String,

    #[serde(default = "default_db_dir")]
    pub db_dir: String,

    #[serde(default = "default_nrm_host")]
    pub nrm_host: String,

    #[serde(rename = "nrm_Port", alias = "nrm_port", default = "default_nrm_port")]
    pub nrm_port: u16,

    #[serde(default = "default_pf_tmp_model")]
    pub pf_tmp_model: String,

    #[serde(default = "default_solvec_tmp_model")]
    pub solvec_tmp_model: String,

    #[serde(default)]
    pub num_comps: usize,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            logger: default_logger(),
            log_config: None,
            topo_xml: default_topo_xml(),
            glpk_dir: default_glpk_dir(),
            db_dir: default_db_dir(),
            nrm_host: default_nrm_host(),
            nrm_port: default_nrm_port(),
            pf_tmp_model: default_pf_tmp_model(),
            solvec_tmp_model: default_solvec_tmp_model(),
            num_comps: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_every_field_from_an_empty_object() {
        let params: Params = serde_json::from_str("{}").unwrap();
        assert_eq!(params.logger, "info");
        assert_eq!(params.nrm_port, 6700);
        assert_eq!(params.solvec_tmp_model, "solvec-templae.model");
        assert_eq!(params.num_comps, 0);
    }

    #[test]
    fn nrm_port_accepts_the_lowercase_alias() {
        let params: Params = serde_json::from_str(r#"{"nrm_port": 7000}"#).unwrap();
        assert_eq!(params.nrm_port, 7000);
    }

    #[test]
    fn nrm_port_accepts_the_canonical_mixed_case_key() {
        let params: Params = serde_json::from_str(r#"{"nrm_Port": 7001}"#).unwrap();
        assert_eq!(params.nrm_port, 7001);
    }
}
