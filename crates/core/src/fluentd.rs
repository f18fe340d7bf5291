//! Fluentd backend resources: outputs, cluster outputs, flows, cluster flows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::secret::Secret;
use crate::traverse::{FlowRefs, Targets};
use crate::{inspect_fields, output_targets, FlowStatus, Object, OutputStatus, ResourceSpec, ResourceStatus};

pub type Output = Object<OutputSpec, OutputStatus>;
pub type ClusterOutput = Object<ClusterOutputSpec, OutputStatus>;
pub type Flow = Object<FlowSpec, FlowStatus>;
pub type ClusterFlow = Object<ClusterFlowSpec, FlowStatus>;
pub type FluentdConfig = Object<FluentdConfigSpec, ResourceStatus>;

/// Output destination; exactly one target is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Output>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch: Option<ElasticsearchOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loki: Option<LokiOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<ForwardOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splunk_hec: Option<SplunkHecOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullout: Option<NullOutput>,
}

output_targets!(OutputSpec {
    s3 => "s3",
    elasticsearch => "elasticsearch",
    http => "http",
    loki => "loki",
    kafka => "kafka",
    forward => "forward",
    file => "file",
    splunk_hec => "splunkHec",
    nullout => "nullout",
});

impl ResourceSpec for OutputSpec {
    const KIND: &'static str = "Output";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOutputSpec {
    #[serde(flatten)]
    pub output: OutputSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_namespaces: Vec<String>,
}

impl Targets for ClusterOutputSpec {
    fn fields(&self) -> crate::traverse::Fields<'_> {
        self.output.fields()
    }
}

impl ResourceSpec for ClusterOutputSpec {
    const KIND: &'static str = "ClusterOutput";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_key_id: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_sec_key: Option<Secret>,
    #[serde(default)]
    pub s3_bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

inspect_fields!(S3Output { aws_key_id, aws_sec_key, s3_bucket, s3_region, path });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchOutput {
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

inspect_fields!(ElasticsearchOutput { host, port, scheme, user, password, index_name });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOutput {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<HttpAuth>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<String>,
}

inspect_fields!(HttpOutput { endpoint, auth, headers, compress });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
}

inspect_fields!(HttpAuth { username, password });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LokiOutput {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

inspect_fields!(LokiOutput { url, username, password, tenant, labels });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaOutput {
    #[serde(default)]
    pub brokers: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_over_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
}

inspect_fields!(KafkaOutput { brokers, default_topic, sasl_over_ssl, username, password });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardOutput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<FluentdServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert_path: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
}

inspect_fields!(ForwardOutput { servers, tls_cert_path, transport });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluentdServer {
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_key: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
}

inspect_fields!(FluentdServer { host, port, shared_key, username, password });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutput {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
}

inspect_fields!(FileOutput { path, append });

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplunkHecOutput {
    #[serde(default)]
    pub hec_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hec_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hec_token: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

inspect_fields!(SplunkHecOutput { hec_host, hec_port, hec_token, index });

/// Discards everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NullOutput {}

inspect_fields!(NullOutput {});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    /// Deprecated: superseded by `globalOutputRefs` and `localOutputRefs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_output_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_output_refs: Vec<String>,
}

impl FlowRefs for FlowSpec {
    fn legacy_refs(&self) -> &[String] {
        &self.output_refs
    }

    fn global_refs(&self) -> &[String] {
        &self.global_output_refs
    }

    fn local_refs(&self) -> Option<&[String]> {
        Some(&self.local_output_refs)
    }
}

impl ResourceSpec for FlowSpec {
    const KIND: &'static str = "Flow";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterFlowSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    /// Deprecated: superseded by `globalOutputRefs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_output_refs: Vec<String>,
}

impl FlowRefs for ClusterFlowSpec {
    fn legacy_refs(&self) -> &[String] {
        &self.output_refs
    }

    fn global_refs(&self) -> &[String] {
        &self.global_output_refs
    }
}

impl ResourceSpec for ClusterFlowSpec {
    const KIND: &'static str = "ClusterFlow";
}

/// Standalone fluentd configuration, referenced instead of an inline `fluentd` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FluentdConfigSpec(pub serde_json::Value);

impl ResourceSpec for FluentdConfigSpec {
    const KIND: &'static str = "FluentdConfig";
}

/// Every fluentd resource of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluentdResources {
    #[serde(default)]
    pub cluster_outputs: Vec<ClusterOutput>,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub cluster_flows: Vec<ClusterFlow>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<FluentdConfig>,
}
