//! Marathon REST endpoints and the payload shapes the CLI reads.
//!
//! Every call returns the raw JSON document so `--json` can echo it
//! unchanged; typed views are decoded from it where text output needs them.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::CliError;

/// Normalise an application id to a single leading `/`.
pub fn normalize_app_id(app_id: &str) -> String {
    format!("/{}", app_id.trim_matches('/'))
}

/// Path segment for an application id.
fn app_path(app_id: &str) -> String {
    format!("/v2/apps{}", normalize_app_id(app_id))
}

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "true"
    } else {
        "false"
    }
}

/// Typed endpoint layer over [`ApiClient`].
#[derive(Debug, Clone)]
pub struct MarathonClient {
    api: ApiClient,
}

impl MarathonClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get_app(&self, app_id: &str) -> Result<Value, CliError> {
        let response: Value = self.api.get(&app_path(app_id), &[]).await?;
        Ok(response.get("app").cloned().unwrap_or(response))
    }

    pub async fn get_apps(&self) -> Result<Vec<Value>, CliError> {
        let response: AppsResponse = self.api.get("/v2/apps", &[]).await?;
        Ok(response.apps)
    }

    pub async fn add_app(&self, app: &Value, force: bool) -> Result<Value, CliError> {
        let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };
        self.api.post("/v2/apps", query, app).await
    }

    /// Partially update an app; the service merges the document onto the stored app.
    pub async fn update_app(&self, app_id: &str, payload: &Value, force: bool) -> Result<Value, CliError> {
        let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };
        self.api.put(&app_path(app_id), query, payload).await
    }

    pub async fn scale_app(&self, app_id: &str, instances: i64, force: bool) -> Result<Value, CliError> {
        self.update_app(app_id, &json!({ "instances": instances }), force)
            .await
    }

    pub async fn restart_app(&self, app_id: &str, force: bool) -> Result<Value, CliError> {
        let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };
        self.api
            .post(&format!("{}/restart", app_path(app_id)), query, &json!({}))
            .await
    }

    pub async fn remove_app(&self, app_id: &str, force: bool) -> Result<Value, CliError> {
        let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };
        self.api.delete(&app_path(app_id), query).await
    }

    /// Kill the tasks of an app, optionally restricted to one host.
    pub async fn kill_app_tasks(
        &self,
        app_id: &str,
        scale: bool,
        host: Option<&str>,
    ) -> Result<Value, CliError> {
        let path = format!("{}/tasks", app_path(app_id));
        let mut query = vec![("scale", flag(scale))];
        if let Some(host) = host {
            query.push(("host", host));
        }
        self.api.delete(&path, &query).await
    }

    /// Version timestamps of an app, newest first.
    pub async fn get_app_versions(&self, app_id: &str) -> Result<Vec<String>, CliError> {
        let response: VersionsResponse = self
            .api
            .get(&format!("{}/versions", app_path(app_id)), &[])
            .await?;
        let mut versions = response.versions;
        sort_versions_desc(&mut versions);
        Ok(versions)
    }

    pub async fn get_app_version(&self, app_id: &str, version: &str) -> Result<Value, CliError> {
        self.api
            .get(&format!("{}/versions/{}", app_path(app_id), version), &[])
            .await
    }

    pub async fn get_tasks(&self) -> Result<Vec<Value>, CliError> {
        let response: TasksResponse = self.api.get("/v2/tasks", &[]).await?;
        Ok(response.tasks)
    }

    /// Kill tasks by id through the bulk endpoint.
    pub async fn kill_tasks(&self, task_ids: &[String], scale: bool, wipe: bool) -> Result<Value, CliError> {
        let query = [("scale", flag(scale)), ("wipe", flag(wipe))];
        self.api
            .post("/v2/tasks/delete", &query, &json!({ "ids": task_ids }))
            .await
    }

    pub async fn get_deployments(&self) -> Result<Vec<Value>, CliError> {
        self.api.get("/v2/deployments", &[]).await
    }

    /// Roll back a deployment, which starts a new deployment reverting it.
    pub async fn rollback_deployment(&self, deployment_id: &str) -> Result<Value, CliError> {
        self.api
            .delete(&format!("/v2/deployments/{}", deployment_id), &[])
            .await
    }

    /// Stop a deployment in place without reverting.
    pub async fn stop_deployment(&self, deployment_id: &str) -> Result<Value, CliError> {
        self.api
            .delete(
                &format!("/v2/deployments/{}", deployment_id),
                &[("force", "true")],
            )
            .await
    }

    pub async fn get_leader(&self) -> Result<Value, CliError> {
        self.api.get("/v2/leader", &[]).await
    }

    pub async fn delete_leader(&self) -> Result<Value, CliError> {
        self.api.delete("/v2/leader", &[]).await
    }

    pub async fn ping(&self) -> Result<String, CliError> {
        self.api.get_text("/ping").await
    }

    pub async fn about(&self) -> Result<Value, CliError> {
        self.api.get("/v2/info", &[]).await
    }
}

#[derive(Debug, Deserialize)]
struct AppsResponse {
    apps: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    tasks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    versions: Vec<String>,
}

/// Sort version timestamps newest first. Unparseable entries go last.
pub fn sort_versions_desc(versions: &mut [String]) {
    let parse = |v: &str| DateTime::<FixedOffset>::parse_from_rfc3339(v).ok();
    versions.sort_by(|a, b| parse(b.as_str()).cmp(&parse(a.as_str())));
}

/// Fields of an application used for text output and state checks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppView {
    pub id: String,
    pub instances: i64,
    pub cpus: f64,
    pub mem: f64,
    pub cmd: Option<String>,
    pub tasks_running: i64,
    pub tasks_healthy: i64,
    pub tasks_unhealthy: i64,
    pub health_checks: Vec<Value>,
    pub deployments: Vec<DeploymentRef>,
    pub container: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeploymentRef {
    pub id: String,
}

/// Result of a change that started a deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub deployment_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskView {
    pub id: String,
    pub app_id: String,
    pub host: String,
    pub started_at: Option<String>,
    pub health_check_results: Vec<HealthCheckResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HealthCheckResult {
    pub alive: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentView {
    pub id: String,
    pub affected_apps: Vec<String>,
    pub current_actions: Vec<CurrentAction>,
    pub current_step: i64,
    pub total_steps: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentAction {
    pub action: String,
    pub app: Option<String>,
}

/// Decode a typed view out of a raw payload.
pub fn view<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, CliError> {
    T::deserialize(value)
        .map_err(|e| CliError::Other(anyhow::anyhow!("Unexpected response from Marathon: {}", e)))
}
