//! syslog-ng backend resources.
//!
//! Same shape as the fluentd set, except that flows never carried the
//! deprecated `outputRefs` list.

use serde::{Deserialize, Serialize};

use crate::secret::Secret;
use crate::traverse::{FlowRefs, Targets};
use crate::{inspect_fields, output_targets, FlowStatus, Object, OutputStatus, ResourceSpec};

pub type SyslogNGOutput = Object<SyslogNGOutputSpec, OutputStatus>;
pub type SyslogNGClusterOutput = Object<SyslogNGClusterOutputSpec, OutputStatus>;
pub type SyslogNGFlow = Object<SyslogNGFlowSpec, FlowStatus>;
pub type SyslogNGClusterFlow = Object<SyslogNGClusterFlowSpec, FlowStatus>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGOutputSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog: Option<SyslogOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<SyslogNGHttpOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loki: Option<SyslogNGLokiOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch: Option<SyslogNGElasticsearchOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<SyslogNGFileOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mongodb: Option<MongoDbOutput>,
}

output_targets!(SyslogNGOutputSpec {
    syslog => "syslog",
    http => "http",
    loki => "loki",
    elasticsearch => "elasticsearch",
    file => "file",
    mongodb => "mongodb",
});

impl ResourceSpec for SyslogNGOutputSpec {
    const KIND: &'static str = "SyslogNGOutput";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGClusterOutputSpec {
    #[serde(flatten)]
    pub output: SyslogNGOutputSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_namespaces: Vec<String>,
}

impl Targets for SyslogNGClusterOutputSpec {
    fn fields(&self) -> crate::traverse::Fields<'_> {
        self.output.fields()
    }
}

impl ResourceSpec for SyslogNGClusterOutputSpec {
    const KIND: &'static str = "SyslogNGClusterOutput";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogOutput {
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<SyslogTls>,
}

inspect_fields!(SyslogOutput { host, port, transport, tls });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogTls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_verify: Option<bool>,
}

inspect_fields!(SyslogTls { ca_file, cert_file, key_file, peer_verify });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGHttpOutput {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<SyslogTls>,
}

inspect_fields!(SyslogNGHttpOutput { url, user, password, headers, tls });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGLokiOutput {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<SyslogTls>,
}

inspect_fields!(SyslogNGLokiOutput { url, tenant, auth });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGElasticsearchOutput {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
}

inspect_fields!(SyslogNGElasticsearchOutput { url, index, user, password });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGFileOutput {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_dirs: Option<bool>,
}

inspect_fields!(SyslogNGFileOutput { path, create_dirs });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoDbOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<Secret>,
    #[serde(default)]
    pub collection: String,
}

inspect_fields!(MongoDbOutput { uri, collection });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGFlowSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_output_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_output_refs: Vec<String>,
}

impl FlowRefs for SyslogNGFlowSpec {
    fn global_refs(&self) -> &[String] {
        &self.global_output_refs
    }

    fn local_refs(&self) -> Option<&[String]> {
        Some(&self.local_output_refs)
    }
}

impl ResourceSpec for SyslogNGFlowSpec {
    const KIND: &'static str = "SyslogNGFlow";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGClusterFlowSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_output_refs: Vec<String>,
}

impl FlowRefs for SyslogNGClusterFlowSpec {
    fn global_refs(&self) -> &[String] {
        &self.global_output_refs
    }
}

impl ResourceSpec for SyslogNGClusterFlowSpec {
    const KIND: &'static str = "SyslogNGClusterFlow";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyslogNGResources {
    #[serde(default)]
    pub cluster_outputs: Vec<SyslogNGClusterOutput>,
    #[serde(default)]
    pub outputs: Vec<SyslogNGOutput>,
    #[serde(default)]
    pub cluster_flows: Vec<SyslogNGClusterFlow>,
    #[serde(default)]
    pub flows: Vec<SyslogNGFlow>,
}
