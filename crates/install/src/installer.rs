//! Main installer implementation

use crate::journal::Journal;
use crate::maintenance::MaintenanceTool;
use crate::metadata::{fetch_metadata, FetchedMetadata};
use crate::offline::EmbeddedRepository;
use crate::run::RunTracker;
use crate::transaction::{undo_all, ApplyFailure, Transaction};
use crate::{InstallConfig, InstallContext, UninstallContext, UpdateContext};
use chrono::Utc;
use ifw_errors::{AuthorizationError, Error, InstallError, Stage};
use ifw_events::{
    AppEvent, ContainerEvent, EventEmitter, EventSender, FailureContext, LifecycleEvent,
    ResolverEvent,
};
use ifw_metadata::{archive_url, PackageInfo, PackagesInfo};
use ifw_net::{DownloadRequest, Downloader};
use ifw_operations::{
    Operation, OperationRegistry, RunContext, ScriptRegistry, APPLICATION_NAME_KEY,
};
use ifw_platform::filesystem::{atomic_write, remove_path};
use ifw_platform::ElevationProvider;
use ifw_resolver::{resolve, Plan, ResolveRequest};
use ifw_types::{
    Component, ComponentChange, OperationDescriptor, RunMode, RunReport, RunState, Version,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of undoing a leftover journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Operations found in the journal
    pub operations: usize,
    pub undone: usize,
}

/// Components selected for installation together with their operations
struct ComponentBatch {
    component: Component,
    replaces: Option<Version>,
    operations: Vec<Operation>,
}

/// Main installer
#[derive(Clone)]
pub struct Installer {
    config: InstallConfig,
    downloader: Downloader,
    registry: Arc<OperationRegistry>,
    scripts: Arc<ScriptRegistry>,
    elevation: Option<Arc<dyn ElevationProvider>>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("config", &self.config)
            .field("elevation", &self.elevation.is_some())
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Create new installer
    ///
    /// # Errors
    ///
    /// Returns an error if the configured embedded repository cannot be
    /// opened.
    pub fn new(config: InstallConfig, downloader: Downloader) -> Result<Self, Error> {
        let downloader = match &config.embedded {
            Some(path) => downloader.with_resources(Arc::new(EmbeddedRepository::open(path)?)),
            None => downloader,
        };
        Ok(Self {
            config,
            downloader,
            registry: Arc::new(OperationRegistry::new()),
            scripts: Arc::new(ScriptRegistry::new()),
            elevation: None,
        })
    }

    /// Use a registry with custom operations
    #[must_use]
    pub fn with_registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: ScriptRegistry) -> Self {
        self.scripts = Arc::new(scripts);
        self
    }

    #[must_use]
    pub fn with_elevation_provider(mut self, provider: Arc<dyn ElevationProvider>) -> Self {
        self.elevation = Some(provider);
        self
    }

    #[must_use]
    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// Install components
    ///
    /// Failures after the run started are reported through the returned
    /// report rather than as `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if crash recovery fails or the run hits an
    /// internal state error.
    pub async fn install(&self, context: InstallContext) -> Result<RunReport, Error> {
        self.run(
            RunMode::Install,
            &context.components,
            &context.cancel,
            context.event_sender,
        )
        .await
    }

    /// Replace installed components that have a newer version available
    ///
    /// # Errors
    ///
    /// See [`Self::install`].
    pub async fn update(&self, context: UpdateContext) -> Result<RunReport, Error> {
        self.run(
            RunMode::Update,
            &context.components,
            &context.cancel,
            context.event_sender,
        )
        .await
    }

    /// Uninstall components by undoing their recorded operations
    ///
    /// # Errors
    ///
    /// See [`Self::install`].
    pub async fn uninstall(&self, context: UninstallContext) -> Result<RunReport, Error> {
        self.recover(context.event_sender.clone()).await?;
        let events = context.event_sender;
        let mut tracker = RunTracker::new(RunMode::Uninstall, events.clone());

        tracker.advance(RunState::MetadataFetching)?;
        let (mut state, mut tool) = match self.load_installed().await {
            Ok((Some(state), tool)) => (state, tool),
            Ok((None, tool)) => (self.empty_state(), tool),
            Err(e) => return tracker.fail(Stage::Fetch, None, None, &e),
        };

        tracker.advance(RunState::Resolving)?;
        let components: Vec<Component> = state.packages.iter().map(installed_component).collect();
        let request = ResolveRequest::uninstall(context.components.clone())
            .with_installed(installed_versions(&state));
        let plan = match self.resolve_plan(&components, &request, &events) {
            Ok(plan) => plan,
            Err(e) => return tracker.fail(Stage::Resolve, None, None, &e),
        };

        tracker.advance(RunState::ReadyToApply)?;
        let mut ctx = self.run_context(events.clone(), context.cancel.clone(), None);
        if let Err(e) = self.acquire_elevation(tool.operations(), &mut ctx).await {
            return tracker.fail(Stage::Apply, None, None, &e);
        }

        tracker.advance(RunState::Applying)?;
        let mut aborted = false;
        for name in &plan.remove {
            if ctx.is_cancelled() {
                aborted = true;
                break;
            }
            let mut operations = tool.take_component(name);
            undo_all(&self.registry, &mut operations, &mut ctx, None).await;
            let from = state.find(name).map(|p| p.version.clone());
            state.remove_package(name);
            if let Err(e) = self.save_state(&state).await {
                return tracker.fail(Stage::Apply, Some(name.clone()), None, &e);
            }
            ctx.emit_lifecycle(LifecycleEvent::ComponentRemoved { name: name.clone() });
            tracker.report_mut().removed.push(ComponentChange {
                name: name.clone(),
                from_version: from,
                to_version: None,
            });
        }
        ctx.elevation.revoke();

        if let Err(e) = self.finish_maintenance(tool, &events).await {
            return tracker.fail(Stage::Commit, None, None, &e);
        }
        if aborted {
            return tracker.fail(Stage::Apply, None, None, &InstallError::Aborted.into());
        }
        tracker.finish()
    }

    /// Undo the operations of a run that died half way
    ///
    /// Returns `None` when there was nothing to recover.
    ///
    /// # Errors
    ///
    /// `RecoveryFailed` if the journal cannot be read or the installed state
    /// cannot be restored.
    pub async fn recover(&self, events: Option<EventSender>) -> Result<Option<RecoveryReport>, Error> {
        let recovery_failed = |e: Error| InstallError::RecoveryFailed {
            message: e.to_string(),
        };
        let Some(mut journal) = Journal::load(&self.config.journal_file())
            .await
            .map_err(recovery_failed)?
        else {
            return Ok(None);
        };

        let operations = journal.operations.len();
        tracing::warn!(run_id = %journal.run_id, operations, "recovering interrupted run");
        events.emit_lifecycle(LifecycleEvent::RecoveryStarted { operations });

        let mut ctx = self.run_context(events.clone(), CancellationToken::new(), None);
        self.acquire_elevation(&journal.operations, &mut ctx)
            .await
            .map_err(recovery_failed)?;
        let undone = undo_all(&self.registry, &mut journal.operations, &mut ctx, None).await;
        ctx.elevation.revoke();

        journal.restore_tool().await;
        restore_state(&self.config.components_file(), journal.packages.as_deref())
            .await
            .map_err(recovery_failed)?;
        self.remove_backups().await;
        journal.remove().await.map_err(recovery_failed)?;

        events.emit_lifecycle(LifecycleEvent::RecoveryCompleted { undone });
        Ok(Some(RecoveryReport { operations, undone }))
    }

    /// Read the metadata of every configured repository
    ///
    /// Components that are installed carry their installed version.
    ///
    /// # Errors
    ///
    /// See [`fetch_metadata`].
    pub async fn available_components(
        &self,
        cancel: &CancellationToken,
        events: Option<EventSender>,
    ) -> Result<FetchedMetadata, Error> {
        let downloader = self.downloader_for(events.clone());
        let mut fetched = fetch_metadata(
            &downloader,
            &self.config.repositories(),
            self.config.fetch_policy,
            cancel,
            &events,
        )
        .await?;
        if let Some(state) = PackagesInfo::load(&self.config.components_file()).await? {
            mark_installed(&mut fetched.components, &state);
        }
        Ok(fetched)
    }

    /// Installed-state record of the target directory
    ///
    /// # Errors
    ///
    /// Read or parse failures of `components.xml`.
    pub async fn installed_components(&self) -> Result<Option<PackagesInfo>, Error> {
        PackagesInfo::load(&self.config.components_file()).await
    }

    async fn run(
        &self,
        mode: RunMode,
        selected: &[String],
        cancel: &CancellationToken,
        events: Option<EventSender>,
    ) -> Result<RunReport, Error> {
        self.recover(events.clone()).await?;
        let mut tracker = RunTracker::new(mode, events.clone());

        tracker.advance(RunState::MetadataFetching)?;
        let (installed, mut tool) = match self.load_installed().await {
            Ok(loaded) => loaded,
            Err(e) => return tracker.fail(Stage::Fetch, None, None, &e),
        };
        let downloader = self.downloader_for(events.clone());
        let fetched = match fetch_metadata(
            &downloader,
            &self.config.repositories(),
            self.config.fetch_policy,
            cancel,
            &events,
        )
        .await
        {
            Ok(fetched) => fetched,
            Err(e) => return tracker.fail(Stage::Fetch, None, None, &e),
        };

        tracker.advance(RunState::Resolving)?;
        let had_state = installed.is_some();
        let mut state = installed.unwrap_or_else(|| self.empty_state());
        let mut components = fetched.components.clone();
        mark_installed(&mut components, &state);
        let request = match mode {
            RunMode::Update => ResolveRequest::update(selected.to_vec()),
            _ => ResolveRequest::install(selected.to_vec()),
        }
        .with_installed(installed_versions(&state));
        let plan = match self.resolve_plan(&components, &request, &events) {
            Ok(plan) => plan,
            Err(e) => return tracker.fail(Stage::Resolve, None, None, &e),
        };

        tracker.advance(RunState::ReadyToApply)?;
        if plan.is_empty() {
            tracing::info!("nothing to do");
            tracker.advance(RunState::Applying)?;
            return tracker.finish();
        }

        let staging = match self.staging_dir().await {
            Ok(dir) => dir,
            Err(e) => return tracker.fail(Stage::Fetch, None, None, &e),
        };
        let planned: Vec<&Component> = plan
            .install
            .iter()
            .filter_map(|entry| components.iter().find(|c| c.name == entry.name))
            .collect();
        let archives = match download_archives(&downloader, &planned, staging.path(), cancel).await {
            Ok(archives) => archives,
            Err(e) => return tracker.fail(Stage::Fetch, None, None, &e),
        };

        let application_name = if self.config.application_name.is_empty() {
            fetched.application_name.clone()
        } else {
            Some(self.config.application_name.clone())
        };
        let mut ctx = self.run_context(events.clone(), cancel.clone(), application_name);
        let batches = match self.collect_batches(&plan, &planned, &archives, &mut ctx).await {
            Ok(batches) => batches,
            Err((component, e)) => return tracker.fail(Stage::Apply, component, None, &e),
        };
        let pending = batches.iter().flat_map(|b| b.operations.iter());
        if let Err(e) = self
            .acquire_elevation_for(pending.chain(removed_operations(&tool, &plan)), &mut ctx)
            .await
        {
            return tracker.fail(Stage::Apply, None, None, &e);
        }

        tracker.advance(RunState::Applying)?;

        // Replaced versions go first; their recorded operations are undone
        // outside the transaction
        for name in &plan.remove {
            let mut operations = tool.take_component(name);
            undo_all(&self.registry, &mut operations, &mut ctx, None).await;
            state.remove_package(name);
            ctx.emit_lifecycle(LifecycleEvent::ComponentRemoved { name: name.clone() });
        }
        let baseline = (had_state || !plan.remove.is_empty()).then(|| state.to_xml());
        if !plan.remove.is_empty() {
            if let Err(e) = self.save_state(&state).await {
                return tracker.fail(Stage::Apply, None, None, &e);
            }
        }

        let journal = Journal::new(
            self.config.journal_file(),
            tracker.run_id(),
            mode,
            baseline.clone(),
        );
        let mut transaction = Transaction::new(&self.registry, journal);
        if let Err(e) = transaction.begin().await {
            return tracker.fail(Stage::Apply, None, None, &e);
        }

        let today = Utc::now().date_naive();
        let mut changes = Vec::new();
        for batch in batches {
            let ComponentBatch {
                component,
                replaces,
                operations,
            } = batch;
            ctx.emit_lifecycle(LifecycleEvent::ComponentInstalling {
                name: component.name.clone(),
                version: component.version.clone(),
            });
            for op in operations {
                if let Err(failure) = transaction.execute(op, &mut ctx).await {
                    return self
                        .abandon(tracker, transaction, &mut ctx, baseline.as_deref(), failure, Stage::Apply)
                        .await;
                }
            }

            state.install_package(PackageInfo::from_component(&component, today));
            if let Err(e) = self.save_state(&state).await {
                let failure = ApplyFailure {
                    component: Some(component.name.clone()),
                    operation: None,
                    error: e,
                };
                return self
                    .abandon(tracker, transaction, &mut ctx, baseline.as_deref(), failure, Stage::Apply)
                    .await;
            }
            ctx.emit_lifecycle(LifecycleEvent::ComponentInstalled {
                name: component.name.clone(),
                version: component.version.clone(),
            });
            changes.push(ComponentChange {
                name: component.name,
                from_version: replaces,
                to_version: Some(component.version),
            });
        }

        tool.record(transaction.executed().to_vec());
        let written = match transaction
            .snapshot_tool(tool.path(), &self.config.backup_dir())
            .await
        {
            Ok(()) => self.write_maintenance(&tool, &events).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let failure = ApplyFailure {
                component: None,
                operation: None,
                error: e,
            };
            return self
                .abandon(tracker, transaction, &mut ctx, baseline.as_deref(), failure, Stage::Commit)
                .await;
        }

        let committed = match transaction.commit(&ctx).await {
            Ok(committed) => committed.len(),
            Err(e) => {
                tracing::warn!(error = %e, "journal could not be removed after commit");
                tool.operations().len()
            }
        };
        ctx.elevation.revoke();
        self.remove_backups().await;

        let report = tracker.report_mut();
        report.operations = committed;
        for change in changes {
            if change.from_version.is_some() {
                report.updated.push(change);
            } else {
                report.installed.push(change);
            }
        }
        drop(staging);
        tracker.finish()
    }

    /// Unwind the transaction, put the installed state back and end the run
    async fn abandon(
        &self,
        tracker: RunTracker,
        transaction: Transaction<'_>,
        ctx: &mut RunContext,
        baseline: Option<&str>,
        failure: ApplyFailure,
        stage: Stage,
    ) -> Result<RunReport, Error> {
        let undone = transaction.rollback(ctx).await;
        tracing::info!(undone, "transaction rolled back");
        if let Err(e) = restore_state(&self.config.components_file(), baseline).await {
            tracing::warn!(error = %e, "could not restore installed state");
        }
        ctx.elevation.revoke();
        self.remove_backups().await;
        tracker.fail(stage, failure.component, failure.operation, &failure.error)
    }

    fn resolve_plan(
        &self,
        components: &[Component],
        request: &ResolveRequest,
        events: &Option<EventSender>,
    ) -> Result<Plan, Error> {
        events.emit(AppEvent::Resolver(ResolverEvent::Started {
            requested: request.selected.clone(),
            mode: request.mode.to_string(),
        }));
        match resolve(components, request) {
            Ok(plan) => {
                events.emit(AppEvent::Resolver(ResolverEvent::Completed {
                    install: plan.install.iter().map(|e| e.name.clone()).collect(),
                    remove: plan.remove.clone(),
                }));
                Ok(plan)
            }
            Err(e) => {
                events.emit(AppEvent::Resolver(ResolverEvent::Failed {
                    failure: FailureContext::from_error(&e),
                }));
                Err(e)
            }
        }
    }

    /// Operations of every planned component: one `ExtractArchive` per
    /// downloaded archive, then the declared and scripted ones
    async fn collect_batches(
        &self,
        plan: &Plan,
        planned: &[&Component],
        archives: &HashMap<(String, String), PathBuf>,
        ctx: &mut RunContext,
    ) -> Result<Vec<ComponentBatch>, (Option<String>, Error)> {
        let mut batches = Vec::with_capacity(planned.len());
        for component in planned {
            let tag = |e: Error| (Some(component.name.clone()), e);
            let mut operations = Vec::new();
            for archive in &component.archives {
                let path = archives
                    .get(&(component.name.clone(), archive.name.clone()))
                    .ok_or_else(|| {
                        tag(InstallError::MissingArchive {
                            component: component.name.clone(),
                            archive: archive.name.clone(),
                        }
                        .into())
                    })?;
                let descriptor = OperationDescriptor::new(
                    "ExtractArchive",
                    [path.display().to_string(), "@TargetDir@".to_string()],
                );
                operations.push(
                    self.registry
                        .create(&descriptor, Some(&component.name))
                        .map_err(tag)?,
                );
            }
            operations.extend(
                self.scripts
                    .collect_operations(component, &self.registry, ctx)
                    .await
                    .map_err(tag)?,
            );
            batches.push(ComponentBatch {
                component: (*component).clone(),
                replaces: plan.entry(&component.name).and_then(|e| e.replaces.clone()),
                operations,
            });
        }
        Ok(batches)
    }

    async fn acquire_elevation(&self, operations: &[Operation], ctx: &mut RunContext) -> Result<(), Error> {
        self.acquire_elevation_for(operations.iter(), ctx).await
    }

    /// Acquire the run's elevation token if any operation needs it
    async fn acquire_elevation_for<'a, I>(&self, mut operations: I, ctx: &mut RunContext) -> Result<(), Error>
    where
        I: Iterator<Item = &'a Operation>,
    {
        let Some(op) = operations.find(|op| op.requires_elevation) else {
            return Ok(());
        };
        let provider = self.elevation.as_ref().ok_or_else(|| AuthorizationError::NotElevated {
            operation: op.to_string(),
        })?;
        tracing::info!(operation = %op, "acquiring elevation");
        ctx.elevation = provider.acquire().await?;
        Ok(())
    }

    async fn load_installed(&self) -> Result<(Option<PackagesInfo>, MaintenanceTool), Error> {
        let state = PackagesInfo::load(&self.config.components_file()).await?;
        let tool = MaintenanceTool::open_or_empty(&self.config.maintenance_tool).await?;
        Ok((state, tool))
    }

    fn empty_state(&self) -> PackagesInfo {
        PackagesInfo::new(
            self.config.application_name.clone(),
            self.config.application_version.clone(),
        )
    }

    async fn save_state(&self, state: &PackagesInfo) -> Result<(), Error> {
        let path = self.config.components_file();
        if state.packages.is_empty() {
            remove_path(&path).await
        } else {
            state.save(&path).await
        }
    }

    async fn write_maintenance(&self, tool: &MaintenanceTool, events: &Option<EventSender>) -> Result<(), Error> {
        let bytes = tool.write(self.config.stub.as_deref()).await?;
        let path = tool.path().display().to_string();
        events.emit(AppEvent::Container(ContainerEvent::Written {
            path: path.clone(),
            bytes,
        }));
        events.emit_lifecycle(LifecycleEvent::UninstallerWritten { path });
        Ok(())
    }

    /// Rewrite the tool with what is left, or delete it with the state file
    /// and backups once nothing is installed
    async fn finish_maintenance(&self, tool: MaintenanceTool, events: &Option<EventSender>) -> Result<(), Error> {
        if tool.is_empty() {
            tracing::info!(path = %tool.path().display(), "removing maintenance tool");
            tool.remove().await?;
            remove_path(&self.config.components_file()).await?;
            self.remove_backups().await;
            Ok(())
        } else {
            self.write_maintenance(&tool, events).await
        }
    }

    async fn remove_backups(&self) {
        let dir = self.config.backup_dir();
        if let Err(e) = remove_path(&dir).await {
            tracing::warn!(path = %dir.display(), error = %e, "could not remove backup directory");
        }
    }

    async fn staging_dir(&self) -> Result<tempfile::TempDir, Error> {
        tokio::fs::create_dir_all(&self.config.temp_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &self.config.temp_dir))?;
        tempfile::Builder::new()
            .prefix("ifw-download-")
            .tempdir_in(&self.config.temp_dir)
            .map_err(|e| Error::io_with_path(&e, &self.config.temp_dir))
    }

    fn downloader_for(&self, events: Option<EventSender>) -> Downloader {
        match events {
            Some(events) => self.downloader.clone().with_events(events),
            None => self.downloader.clone(),
        }
    }

    fn run_context(
        &self,
        events: Option<EventSender>,
        cancel: CancellationToken,
        application_name: Option<String>,
    ) -> RunContext {
        let mut ctx = RunContext::new(&self.config.target_dir, self.config.backup_dir()).with_cancel(cancel);
        if let Some(events) = events {
            ctx = ctx.with_events(events);
        }
        if let Some(provider) = &self.elevation {
            ctx = ctx.with_elevation_provider(Arc::clone(provider));
        }
        if let Some(dirs) = &self.config.user_dirs {
            ctx = ctx.with_user_dirs(dirs.clone());
        }
        if let Some(dir) = &self.config.system_dir {
            ctx = ctx.with_system_dir(dir);
        }
        ctx.set_value(
            APPLICATION_NAME_KEY,
            application_name.unwrap_or_else(|| self.config.application_name.clone()),
        );
        ctx
    }
}

/// Download every archive of `components` into `dir`
async fn download_archives(
    downloader: &Downloader,
    components: &[&Component],
    dir: &Path,
    cancel: &CancellationToken,
) -> Result<HashMap<(String, String), PathBuf>, Error> {
    let mut keys = Vec::new();
    let mut requests = Vec::new();
    for component in components {
        if component.archives.is_empty() {
            continue;
        }
        let base = component
            .repository
            .as_deref()
            .ok_or_else(|| InstallError::ComponentNotFound(component.name.clone()))?;
        let component_dir = dir.join(&component.name);
        tokio::fs::create_dir_all(&component_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &component_dir))?;
        for archive in &component.archives {
            let url = archive_url(base, &component.name, component.version.as_str(), &archive.name);
            let destination = component_dir.join(format!("{}{}", component.version, archive.name));
            let mut request = DownloadRequest::new(url, destination).for_component(&component.name);
            if let Some(hash) = &archive.hash {
                request = request.with_hash(hash.clone());
            }
            keys.push((component.name.clone(), archive.name.clone()));
            requests.push(request);
        }
    }
    if requests.is_empty() {
        return Ok(HashMap::new());
    }

    tracing::info!(archives = requests.len(), "downloading archives");
    let results = downloader.download_all(requests, cancel).await?;
    Ok(keys
        .into_iter()
        .zip(results.into_iter().map(|r| r.path))
        .collect())
}

/// Operations the removal phase of an update will undo
fn removed_operations<'a>(tool: &'a MaintenanceTool, plan: &'a Plan) -> impl Iterator<Item = &'a Operation> {
    tool.operations().iter().filter(move |op| {
        op.component
            .as_ref()
            .is_some_and(|c| plan.remove.contains(c))
    })
}

fn installed_versions(state: &PackagesInfo) -> BTreeMap<String, Version> {
    state
        .packages
        .iter()
        .map(|p| (p.name.clone(), p.version.clone()))
        .collect()
}

fn mark_installed(components: &mut [Component], state: &PackagesInfo) {
    for component in components {
        component.installed_version = state.find(&component.name).map(|p| p.version.clone());
    }
}

/// Resolver view of an installed package
fn installed_component(package: &PackageInfo) -> Component {
    let mut component = Component::new(&package.name, package.version.clone(), package.release_date);
    component.display_name.clone_from(&package.title);
    component.dependencies.clone_from(&package.dependencies);
    component.auto_depend_on.clone_from(&package.auto_depend_on);
    component.forced_install = package.forced_install;
    component.virtual_component = package.virtual_component;
    component.installed_version = Some(package.version.clone());
    component
}

/// Put `components.xml` back to a snapshot; `None` means there was none
async fn restore_state(path: &Path, snapshot: Option<&str>) -> Result<(), Error> {
    match snapshot {
        Some(xml) => atomic_write(path, xml.as_bytes()).await,
        None => remove_path(path).await,
    }
}
