//! helmsman-helm
//!
//! `ReleaseEngine` backed by the `helm` CLI.
//!
//! - upgrade: `helm upgrade {name} {chart} --namespace {ns} --output json --values -`
//! - install: `helm install {name} {chart} --namespace {ns} --output json --values -`
//!
//! values はネストした JSON ドキュメントとして stdin に流す（`--set` の
//! 文字列解釈を通らないので値はそのまま chart に届く）。
//! 存在しない release への upgrade は helm が
//! `has no deployed releases` で失敗するので、それを `NotExists` とみなす。

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use helmsman_core::config::ReleaseConfig;
use helmsman_core::domain::{ReleaseHandle, ReleaseKey, UpgradeResult, ValueMapping};
use helmsman_core::ports::{EngineError, ReleaseEngine};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const NO_DEPLOYED_RELEASES: &str = "has no deployed releases";

#[derive(Debug, thiserror::Error)]
pub enum HelmError {
    #[error("failed to run {bin}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("helm exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("failed to decode helm output")]
    Decode(#[from] serde_json::Error),
}

impl HelmError {
    /// helm の stderr から「release が無い」を判定
    pub fn is_missing_release(&self) -> bool {
        matches!(self, HelmError::Exit { stderr, .. } if stderr.contains(NO_DEPLOYED_RELEASES))
    }

    fn into_engine_error(self, key: &ReleaseKey) -> EngineError {
        match self {
            HelmError::Spawn { .. } => EngineError::Unavailable(self.to_string()),
            HelmError::Exit { stderr, .. } => EngineError::Failed {
                key: key.clone(),
                reason: stderr,
            },
            HelmError::Decode(_) => EngineError::Failed {
                key: key.clone(),
                reason: self.to_string(),
            },
        }
    }
}

/// Subset of `helm ... --output json`.
#[derive(Debug, Deserialize)]
struct HelmRelease {
    name: String,
    namespace: String,
    version: u32,
}

#[derive(Debug, Clone)]
pub struct HelmCliEngine {
    helm_bin: String,
    chart: String,
    timeout: Option<Duration>,
}

impl HelmCliEngine {
    pub fn new(chart: impl Into<String>) -> Self {
        Self {
            helm_bin: "helm".to_string(),
            chart: chart.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ReleaseConfig) -> Self {
        let engine = Self::new(config.chart.clone()).with_helm_bin(config.helm_bin.clone());
        match config.timeout_secs {
            Some(secs) => engine.with_timeout(Duration::from_secs(secs)),
            None => engine,
        }
    }

    pub fn with_helm_bin(mut self, helm_bin: impl Into<String>) -> Self {
        self.helm_bin = helm_bin.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn chart(&self) -> &str {
        &self.chart
    }

    /// Arguments for `helm {command} ...` (without the binary).
    pub fn args(&self, command: &str, key: &ReleaseKey) -> Vec<String> {
        let mut args = vec![
            command.to_string(),
            key.name.clone(),
            self.chart.clone(),
            "--namespace".to_string(),
            key.namespace.clone(),
            "--output".to_string(),
            "json".to_string(),
            "--values".to_string(),
            "-".to_string(),
        ];
        if let Some(timeout) = self.timeout {
            args.push("--timeout".to_string());
            args.push(format!("{}s", timeout.as_secs()));
        }
        args
    }

    async fn run(
        &self,
        command: &str,
        key: &ReleaseKey,
        values: &ValueMapping,
    ) -> Result<ReleaseHandle, HelmError> {
        let args = self.args(command, key);
        let document = values_document(values)?;
        debug!(%key, bin = %self.helm_bin, ?args, "running helm");

        // 呼び出し側（shutdown guard）が future を drop したら子プロセスも止める
        let mut child = Command::new(&self.helm_bin)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HelmError::Spawn {
                bin: self.helm_bin.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // helm が values を読む前に終了した場合は exit code で判定する
            if let Err(err) = stdin.write_all(&document).await {
                debug!(%key, error = %err, "helm closed stdin early");
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| HelmError::Spawn {
                bin: self.helm_bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HelmError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let revision = parse_revision(&output.stdout)?;
        Ok(ReleaseHandle::new(key.clone(), revision))
    }
}

/// Values file handed to `--values -` (JSON is valid YAML).
pub fn values_document(values: &ValueMapping) -> Result<Vec<u8>, HelmError> {
    Ok(serde_json::to_vec(&values.to_nested())?)
}

fn parse_revision(stdout: &[u8]) -> Result<u32, HelmError> {
    let release: HelmRelease = serde_json::from_slice(stdout)?;
    debug!(
        name = %release.name,
        namespace = %release.namespace,
        revision = release.version,
        "helm release"
    );
    Ok(release.version)
}

#[async_trait]
impl ReleaseEngine for HelmCliEngine {
    async fn install(
        &self,
        key: &ReleaseKey,
        values: &ValueMapping,
    ) -> Result<ReleaseHandle, EngineError> {
        self.run("install", key, values)
            .await
            .map_err(|err| err.into_engine_error(key))
    }

    async fn upgrade(&self, key: &ReleaseKey, values: &ValueMapping) -> UpgradeResult {
        match self.run("upgrade", key, values).await {
            Ok(handle) => UpgradeResult::Upgraded(handle),
            Err(err) if err.is_missing_release() => UpgradeResult::NotExists,
            Err(err) => {
                warn!(%key, error = %err, "helm upgrade failed");
                UpgradeResult::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmsman_core::domain::{AssistantSpec, map_values};
    use rstest::rstest;

    fn key() -> ReleaseKey {
        ReleaseKey::new("ns1", "demo")
    }

    #[test]
    fn test_upgrade_args() {
        let engine = HelmCliEngine::new("oci://charts/assistant");
        let args = engine.args("upgrade", &key());

        assert_eq!(
            args,
            vec![
                "upgrade",
                "demo",
                "oci://charts/assistant",
                "--namespace",
                "ns1",
                "--output",
                "json",
                "--values",
                "-",
            ]
        );
    }

    #[test]
    fn test_timeout_is_passed_through() {
        let engine = HelmCliEngine::new("chart").with_timeout(Duration::from_secs(90));
        let args = engine.args("install", &key());
        assert!(args.windows(2).any(|w| w == ["--timeout", "90s"]));
    }

    #[test]
    fn test_from_config() {
        let config = ReleaseConfig {
            chart: "my-chart".to_string(),
            helm_bin: "/usr/local/bin/helm".to_string(),
            timeout_secs: Some(30),
        };
        let engine = HelmCliEngine::from_config(&config);
        assert_eq!(engine.chart(), "my-chart");
        assert_eq!(engine.helm_bin, "/usr/local/bin/helm");
        assert_eq!(engine.timeout, Some(Duration::from_secs(30)));
    }

    #[rstest]
    #[case("{abc}")]
    #[case("[a,b]")]
    #[case("c:\\tmp,x=y")]
    #[case("1.10")]
    #[case("")]
    fn test_values_document_keeps_strings_verbatim(#[case] secret: &str) {
        let values = map_values(&AssistantSpec::new("1.10", secret).with_replicas(2, 3));

        let document: serde_json::Value =
            serde_json::from_slice(&values_document(&values).unwrap()).unwrap();

        assert_eq!(
            document,
            serde_json::json!({
                "image": {"tag": "1.10"},
                "secret": {"apiKey": secret},
                "replicas": {"frontend": 2, "backend": 3}
            })
        );
        assert!(document["replicas"]["frontend"].is_i64());
    }

    #[test]
    fn test_missing_release_classification() {
        let missing = HelmError::Exit {
            code: Some(1),
            stderr: "Error: UPGRADE FAILED: \"demo\" has no deployed releases".to_string(),
        };
        let other = HelmError::Exit {
            code: Some(1),
            stderr: "Error: UPGRADE FAILED: timed out waiting for the condition".to_string(),
        };
        assert!(missing.is_missing_release());
        assert!(!other.is_missing_release());
    }

    #[test]
    fn test_parse_revision() {
        let stdout = br#"{"name":"demo","namespace":"ns1","version":4,"info":{"status":"deployed"}}"#;
        assert_eq!(parse_revision(stdout).unwrap(), 4);
        assert!(matches!(parse_revision(b"not json"), Err(HelmError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let engine = HelmCliEngine::new("chart").with_helm_bin("/nonexistent/helm-binary");
        let values = ValueMapping::new();

        let upgrade = engine.upgrade(&key(), &values).await;
        assert!(matches!(upgrade, UpgradeResult::Failed(_)));

        let install = engine.install(&key(), &values).await;
        assert!(matches!(install, Err(EngineError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        // `false` ignores its arguments and exits 1
        let engine = HelmCliEngine::new("chart").with_helm_bin("false");
        let values = ValueMapping::new();

        assert!(matches!(
            engine.upgrade(&key(), &values).await,
            UpgradeResult::Failed(_)
        ));
        assert!(matches!(
            engine.install(&key(), &values).await,
            Err(EngineError::Failed { .. })
        ));
    }
}
