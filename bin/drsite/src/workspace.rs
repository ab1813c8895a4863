//! Terraform workspace selection and action dispatch

use crate::confirm::Confirmer;
use async_trait::async_trait;
use clap::ValueEnum;
use drsite_api::SiteContext;
use drsite_core::{DocumentPaths, SiteSettings};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Terraform is not available: {0}")]
    TerraformUnavailable(String),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace {workspace}: {message}")]
    Workspace { workspace: String, message: String },

    #[error("Variable file not found: {0} (run with --refresh-resource-vars to generate it)")]
    MissingVarFile(PathBuf),

    #[error("{0} needs confirmation but the session is not interactive; pass --auto-approve")]
    NonInteractive(Action),

    #[error("{0} cancelled")]
    Cancelled(Action),

    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("terraform {action} exited with status {status}: {stderr}")]
    ActionFailed {
        action: Action,
        status: i32,
        stderr: String,
    },
}

/// Terraform action requested on a workspace
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Init,
    Plan,
    Apply,
    Destroy,
    Output,
    Show,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::Plan => "plan",
            Action::Apply => "apply",
            Action::Destroy => "destroy",
            Action::Output => "output",
            Action::Show => "show",
        }
    }

    /// Changes infrastructure and needs confirmation
    pub fn is_destructive(&self) -> bool {
        matches!(self, Action::Apply | Action::Destroy)
    }

    pub fn uses_var_file(&self) -> bool {
        matches!(self, Action::Plan | Action::Apply | Action::Destroy)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub auto_approve: bool,
    pub force_reinit: bool,
    pub detailed_output: bool,
}

/// Workspace, variables and var file of one site
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub context: SiteContext,
    pub project: String,
    pub region: String,
    pub var_file: PathBuf,
}

impl Target {
    pub fn new(settings: &SiteSettings, paths: &DocumentPaths) -> Self {
        Self {
            context: settings.context.clone(),
            project: settings.project_id.clone(),
            region: settings.region.clone(),
            var_file: paths.for_site(settings.context.site).to_path_buf(),
        }
    }

    pub fn workspace(&self) -> String {
        self.context.workspace_name()
    }

    /// `TF_VAR_*` variables passed to every invocation
    pub fn variables(&self) -> BTreeMap<String, String> {
        [
            ("TF_VAR_project", self.project.as_str()),
            ("TF_VAR_region", self.region.as_str()),
            ("TF_VAR_environment", self.context.environment.as_str()),
            ("TF_VAR_cluster", self.context.cluster.as_str()),
            ("TF_VAR_target_site", self.context.site.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
}

/// One Terraform command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Attach to the terminal instead of capturing output
    pub stream: bool,
}

impl Invocation {
    fn captured(args: &[&str], env: &BTreeMap<String, String>) -> Self {
        Self {
            args: args.iter().map(|a| a.to_string()).collect(),
            env: env.clone(),
            stream: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs provisioning commands
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<EngineOutput>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// `plan -detailed-exitcode` reported no changes
    NoChanges,
    /// `plan -detailed-exitcode` reported pending changes
    ChangesPending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionReport {
    pub action: Action,
    pub workspace: String,
    pub outcome: Outcome,
    /// Captured output of plan, output and show
    pub stdout: String,
}

pub struct Orchestrator {
    engine: Arc<dyn ProvisioningEngine>,
    confirmer: Arc<dyn Confirmer>,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn ProvisioningEngine>, confirmer: Arc<dyn Confirmer>) -> Self {
        Self { engine, confirmer }
    }

    /// Run an action in the target's workspace.
    ///
    /// Confirmation and the var file check happen before Terraform is
    /// invoked at all.
    pub async fn run(
        &self,
        target: &Target,
        action: Action,
        options: &RunOptions,
    ) -> Result<ActionReport> {
        let workspace = target.workspace();
        info!("Running {} in workspace {}", action, workspace);

        if action.uses_var_file() && !target.var_file.exists() {
            return Err(OrchestratorError::MissingVarFile(target.var_file.clone()));
        }

        if action.is_destructive() && !options.auto_approve {
            self.confirm(action, &workspace)?;
        }

        let env = target.variables();
        self.check_terraform(&env).await?;
        self.ensure_workspace(&workspace, &env).await?;

        let invocation = Self::action_invocation(target, action, options, env);
        let output = self.engine.execute(&invocation).await?;

        let outcome = match (action, output.status) {
            (_, 0) if action == Action::Plan && options.detailed_output => Outcome::NoChanges,
            (_, 0) => Outcome::Completed,
            (Action::Plan, 2) if options.detailed_output => Outcome::ChangesPending,
            (_, status) => {
                return Err(OrchestratorError::ActionFailed {
                    action,
                    status,
                    stderr: output.stderr.trim().to_string(),
                })
            }
        };

        info!("terraform {} finished in {}: {:?}", action, workspace, outcome);
        Ok(ActionReport {
            action,
            workspace,
            outcome,
            stdout: output.stdout,
        })
    }

    fn confirm(&self, action: Action, workspace: &str) -> Result<()> {
        if !self.confirmer.is_interactive() {
            return Err(OrchestratorError::NonInteractive(action));
        }
        let prompt = format!("Do you want to proceed with terraform {} in {}?", action, workspace);
        match self.confirmer.confirm(&prompt) {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("terraform {} cancelled by user", action);
                Err(OrchestratorError::Cancelled(action))
            }
            Err(e) => Err(OrchestratorError::Prompt(e)),
        }
    }

    async fn check_terraform(&self, env: &BTreeMap<String, String>) -> Result<()> {
        let output = self
            .engine
            .execute(&Invocation::captured(&["version"], env))
            .await
            .map_err(|e| OrchestratorError::TerraformUnavailable(e.to_string()))?;
        if !output.success() {
            return Err(OrchestratorError::TerraformUnavailable(
                output.stderr.trim().to_string(),
            ));
        }
        debug!("{}", output.stdout.lines().next().unwrap_or_default());
        Ok(())
    }

    /// Select the workspace, creating it when it does not exist
    async fn ensure_workspace(&self, workspace: &str, env: &BTreeMap<String, String>) -> Result<()> {
        let current = self
            .workspace_command(&["workspace", "show"], workspace, env)
            .await?;
        if current.trim() == workspace {
            debug!("Already in workspace {}", workspace);
            return Ok(());
        }

        let listing = self
            .workspace_command(&["workspace", "list"], workspace, env)
            .await?;
        if parse_workspace_list(&listing).iter().any(|w| w == workspace) {
            info!("Switching to workspace {}", workspace);
            self.workspace_command(&["workspace", "select", workspace], workspace, env)
                .await?;
        } else {
            info!("Creating workspace {}", workspace);
            self.workspace_command(&["workspace", "new", workspace], workspace, env)
                .await?;
        }
        Ok(())
    }

    async fn workspace_command(
        &self,
        args: &[&str],
        workspace: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<String> {
        let output = self.engine.execute(&Invocation::captured(args, env)).await?;
        if !output.success() {
            return Err(OrchestratorError::Workspace {
                workspace: workspace.to_string(),
                message: format!("terraform {} failed: {}", args.join(" "), output.stderr.trim()),
            });
        }
        Ok(output.stdout)
    }

    fn action_invocation(
        target: &Target,
        action: Action,
        options: &RunOptions,
        env: BTreeMap<String, String>,
    ) -> Invocation {
        let mut args = vec![action.as_str().to_string()];
        if action.uses_var_file() {
            args.push("-var-file".to_string());
            args.push(target.var_file.display().to_string());
        }
        match action {
            Action::Init if options.force_reinit => args.push("-reconfigure".to_string()),
            Action::Plan if options.detailed_output => args.push("-detailed-exitcode".to_string()),
            Action::Apply | Action::Destroy if options.auto_approve => {
                args.push("-auto-approve".to_string())
            }
            _ => {}
        }
        Invocation {
            args,
            env,
            stream: action.is_destructive(),
        }
    }
}

/// Workspace names from `terraform workspace list` (current one marked with `*`)
pub fn parse_workspace_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use drsite_api::Site;
    use std::io;
    use std::sync::Mutex;

    /// Records invocations and answers workspace commands from a fixed listing
    struct FakeEngine {
        current: String,
        workspaces: Vec<String>,
        action_status: i32,
        version_status: i32,
        calls: Mutex<Vec<Invocation>>,
    }

    impl FakeEngine {
        fn new(current: &str, workspaces: &[&str]) -> Self {
            Self {
                current: current.to_string(),
                workspaces: workspaces.iter().map(|w| w.to_string()).collect(),
                action_status: 0,
                version_status: 0,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn commands(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|i| i.args.join(" "))
                .collect()
        }
    }

    #[async_trait]
    impl ProvisioningEngine for FakeEngine {
        async fn execute(&self, invocation: &Invocation) -> Result<EngineOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
            let output = match args.as_slice() {
                ["version"] => EngineOutput {
                    status: self.version_status,
                    stdout: "Terraform v1.7.5".to_string(),
                    stderr: String::new(),
                },
                ["workspace", "show"] => EngineOutput {
                    stdout: format!("{}\n", self.current),
                    ..Default::default()
                },
                ["workspace", "list"] => EngineOutput {
                    stdout: self
                        .workspaces
                        .iter()
                        .map(|w| {
                            let marker = if *w == self.current { "* " } else { "  " };
                            format!("{}{}\n", marker, w)
                        })
                        .collect(),
                    ..Default::default()
                },
                ["workspace", ..] => EngineOutput::default(),
                _ => EngineOutput {
                    status: self.action_status,
                    stdout: "action output".to_string(),
                    stderr: if self.action_status == 1 {
                        "Error: boom".to_string()
                    } else {
                        String::new()
                    },
                },
            };
            Ok(output)
        }
    }

    struct FakeConfirmer {
        interactive: bool,
        answer: bool,
        asked: Mutex<u32>,
    }

    impl FakeConfirmer {
        fn new(interactive: bool, answer: bool) -> Self {
            Self {
                interactive,
                answer,
                asked: Mutex::new(0),
            }
        }
    }

    impl Confirmer for FakeConfirmer {
        fn is_interactive(&self) -> bool {
            self.interactive
        }

        fn confirm(&self, _prompt: &str) -> io::Result<bool> {
            *self.asked.lock().unwrap() += 1;
            Ok(self.answer)
        }
    }

    fn target(dir: &std::path::Path, site: Site) -> Target {
        let var_file = dir.join("r1-rai-dr.tfvars.json");
        std::fs::write(&var_file, "{}").unwrap();
        Target {
            context: SiteContext::new("prod-us", "r1-rai", site),
            project: "rai-prod-dr".to_string(),
            region: "us-east1".to_string(),
            var_file,
        }
    }

    fn orchestrator(engine: &Arc<FakeEngine>, confirmer: &Arc<FakeConfirmer>) -> Orchestrator {
        Orchestrator::new(engine.clone(), confirmer.clone())
    }

    #[test]
    fn test_parse_workspace_list() {
        let listing = "  default\n* prod-us-r1-rai-primary\n  prod-us-r1-rai-dr\n\n";
        assert_eq!(
            parse_workspace_list(listing),
            vec!["default", "prod-us-r1-rai-primary", "prod-us-r1-rai-dr"]
        );
    }

    #[test]
    fn test_target_variables() {
        let dir = tempfile::tempdir().unwrap();
        let vars = target(dir.path(), Site::Dr).variables();
        assert_eq!(vars["TF_VAR_project"], "rai-prod-dr");
        assert_eq!(vars["TF_VAR_region"], "us-east1");
        assert_eq!(vars["TF_VAR_environment"], "prod-us");
        assert_eq!(vars["TF_VAR_cluster"], "r1-rai");
        assert_eq!(vars["TF_VAR_target_site"], "dr");
    }

    #[tokio::test]
    async fn test_creates_missing_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new("default", &["default"]));
        let confirmer = Arc::new(FakeConfirmer::new(true, true));

        let report = orchestrator(&engine, &confirmer)
            .run(&target(dir.path(), Site::Dr), Action::Init, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.workspace, "prod-us-r1-rai-dr");
        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(
            engine.commands(),
            vec![
                "version",
                "workspace show",
                "workspace list",
                "workspace new prod-us-r1-rai-dr",
                "init"
            ]
        );
    }

    #[tokio::test]
    async fn test_selects_existing_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new("default", &["default", "prod-us-r1-rai-dr"]));
        let confirmer = Arc::new(FakeConfirmer::new(true, true));

        let options = RunOptions {
            force_reinit: true,
            ..Default::default()
        };
        orchestrator(&engine, &confirmer)
            .run(&target(dir.path(), Site::Dr), Action::Init, &options)
            .await
            .unwrap();

        let commands = engine.commands();
        assert!(commands.contains(&"workspace select prod-us-r1-rai-dr".to_string()));
        assert_eq!(commands.last().unwrap(), "init -reconfigure");
    }

    #[tokio::test]
    async fn test_plan_detailed_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path(), Site::Dr);
        let options = RunOptions {
            detailed_output: true,
            ..Default::default()
        };
        let confirmer = Arc::new(FakeConfirmer::new(true, true));

        for (status, expected) in [(0, Outcome::NoChanges), (2, Outcome::ChangesPending)] {
            let mut engine = FakeEngine::new("prod-us-r1-rai-dr", &["prod-us-r1-rai-dr"]);
            engine.action_status = status;
            let engine = Arc::new(engine);
            let report = orchestrator(&engine, &confirmer)
                .run(&target, Action::Plan, &options)
                .await
                .unwrap();
            assert_eq!(report.outcome, expected);
            let plan = engine.commands().pop().unwrap();
            assert!(plan.starts_with("plan -var-file "));
            assert!(plan.ends_with(" -detailed-exitcode"));
        }

        let mut engine = FakeEngine::new("prod-us-r1-rai-dr", &["prod-us-r1-rai-dr"]);
        engine.action_status = 1;
        let engine = Arc::new(engine);
        let err = orchestrator(&engine, &confirmer)
            .run(&target, Action::Plan, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ActionFailed { status: 1, .. }));
    }

    #[tokio::test]
    async fn test_plain_plan_status_two_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new("prod-us-r1-rai-dr", &["prod-us-r1-rai-dr"]);
        engine.action_status = 2;
        let engine = Arc::new(engine);
        let confirmer = Arc::new(FakeConfirmer::new(true, true));
        let err = orchestrator(&engine, &confirmer)
            .run(&target(dir.path(), Site::Dr), Action::Plan, &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ActionFailed { status: 2, .. }));
    }

    #[tokio::test]
    async fn test_destroy_refused_without_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new("default", &["default"]));
        let confirmer = Arc::new(FakeConfirmer::new(false, true));

        let err = orchestrator(&engine, &confirmer)
            .run(&target(dir.path(), Site::Dr), Action::Destroy, &RunOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::NonInteractive(Action::Destroy)));
        assert!(engine.commands().is_empty());
        assert_eq!(*confirmer.asked.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_apply_declined() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new("default", &["default"]));
        let confirmer = Arc::new(FakeConfirmer::new(true, false));

        let err = orchestrator(&engine, &confirmer)
            .run(&target(dir.path(), Site::Dr), Action::Apply, &RunOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Cancelled(Action::Apply)));
        assert!(engine.commands().is_empty());
    }

    #[tokio::test]
    async fn test_auto_approve_skips_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new("prod-us-r1-rai-dr", &["prod-us-r1-rai-dr"]));
        let confirmer = Arc::new(FakeConfirmer::new(false, false));
        let options = RunOptions {
            auto_approve: true,
            ..Default::default()
        };

        orchestrator(&engine, &confirmer)
            .run(&target(dir.path(), Site::Dr), Action::Destroy, &options)
            .await
            .unwrap();

        let calls = engine.calls.lock().unwrap();
        let destroy = calls.last().unwrap();
        assert_eq!(destroy.args.first().map(String::as_str), Some("destroy"));
        assert_eq!(destroy.args.last().map(String::as_str), Some("-auto-approve"));
        assert!(destroy.stream);
        assert_eq!(destroy.env["TF_VAR_target_site"], "dr");
        assert_eq!(*confirmer.asked.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_var_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = target(dir.path(), Site::Primary);
        target.var_file = dir.path().join("absent.tfvars.json");
        let engine = Arc::new(FakeEngine::new("default", &["default"]));
        let confirmer = Arc::new(FakeConfirmer::new(true, true));

        let err = orchestrator(&engine, &confirmer)
            .run(&target, Action::Plan, &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingVarFile(_)));
        assert!(engine.commands().is_empty());

        // show does not read the var file
        orchestrator(&engine, &confirmer)
            .run(&target, Action::Show, &RunOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_terraform_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new("default", &["default"]);
        engine.version_status = 127;
        let engine = Arc::new(engine);
        let confirmer = Arc::new(FakeConfirmer::new(true, true));

        let err = orchestrator(&engine, &confirmer)
            .run(&target(dir.path(), Site::Primary), Action::Output, &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::TerraformUnavailable(_)));
        assert_eq!(engine.commands(), vec!["version"]);
    }
}
