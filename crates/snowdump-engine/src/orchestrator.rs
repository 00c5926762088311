//! Concurrent database → schema → object traversal for one target
//!
//! Databases are listed once, then one task per database lists its schemas
//! and spawns one task per schema. Schema tasks walk their objects in catalog
//! order. Every task is joined before [`DumpOrchestrator::dump_target`]
//! returns.
//!
//! A shared semaphore bounds concurrent warehouse work. Database tasks hold a
//! permit only while listing schemas; they release it before waiting on their
//! children so a limit of one cannot deadlock. Schema tasks hold a permit for
//! their whole object loop.

use snowdump_catalog::{queries, CatalogEnumerator, DdlRetriever, WarehouseConnection};
use snowdump_core::{
    DumpError, DumpFailure, DumpSettings, FailureLocation, FailurePolicy, ObjectStage,
    SchemaObject, Target, TargetSummary,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::paths::PathAllocator;

/// Result of dumping one target
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub summary: TargetSummary,

    /// Failures recorded under [`FailurePolicy::BestEffort`]; always empty
    /// for a fail-fast run that returned `Ok`
    pub failures: Vec<DumpFailure>,
}

/// Dumps every object of a target over one shared connection
pub struct DumpOrchestrator {
    connection: Arc<dyn WarehouseConnection>,
    paths: Arc<PathAllocator>,
    semaphore: Arc<Semaphore>,
    policy: FailurePolicy,
}

impl DumpOrchestrator {
    pub fn new(
        connection: Arc<dyn WarehouseConnection>,
        paths: Arc<PathAllocator>,
        settings: &DumpSettings,
    ) -> Self {
        Self {
            connection,
            paths,
            semaphore: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
            policy: settings.failure_policy,
        }
    }

    /// Dump `target` under the allocator's root.
    ///
    /// Fail-fast: the first error aborts every in-flight task and is
    /// returned. Best-effort: failures are collected in the outcome and only
    /// [`DumpError::FolderAlreadyExists`] is returned.
    pub async fn dump_target(&self, target: &Target) -> Result<TargetOutcome, DumpError> {
        let ddl_folder = target.ddl_folder();
        info!(target = %target.name, policy = ?self.policy, "Dumping target");

        let output_folder = self.paths.create_sub_folder(&ddl_folder, &[])?;

        let ctx = Arc::new(TargetContext {
            target: target.name.clone(),
            ddl_folder,
            enumerator: CatalogEnumerator::new(Arc::clone(&self.connection)),
            retriever: DdlRetriever::new(Arc::clone(&self.connection)),
            paths: Arc::clone(&self.paths),
            semaphore: Arc::clone(&self.semaphore),
            policy: self.policy,
            tally: Tally::default(),
        });

        let location = FailureLocation::target(&target.name);
        match ctx.enumerator.list_databases().await {
            Ok(databases) => {
                info!(target = %target.name, "Found {} databases", databases.len());

                let mut tasks = JoinSet::new();
                for database in databases {
                    tasks.spawn(dump_database(Arc::clone(&ctx), database));
                }
                join_all(&ctx, tasks, &location).await?;
            }
            Err(e) => ctx.recover(location, None, e)?,
        }

        let outcome = ctx.outcome(output_folder);
        info!(
            target = %target.name,
            databases = outcome.summary.databases,
            schemas = outcome.summary.schemas,
            objects = outcome.summary.objects_written,
            failures = outcome.failures.len(),
            "Target complete"
        );

        Ok(outcome)
    }
}

/// State shared by every task dumping one target
struct TargetContext {
    target: String,
    ddl_folder: String,
    enumerator: CatalogEnumerator,
    retriever: DdlRetriever,
    paths: Arc<PathAllocator>,
    semaphore: Arc<Semaphore>,
    policy: FailurePolicy,
    tally: Tally,
}

#[derive(Default)]
struct Tally {
    databases: AtomicUsize,
    schemas: AtomicUsize,
    objects_written: AtomicUsize,
    duplicates: AtomicUsize,
    failures: Mutex<Vec<DumpFailure>>,
}

impl TargetContext {
    /// Apply the failure policy: propagate the error (fail-fast, or a folder
    /// clash under any policy) or record it and carry on.
    fn recover(
        &self,
        location: FailureLocation,
        stage: Option<ObjectStage>,
        err: DumpError,
    ) -> Result<(), DumpError> {
        let fatal = matches!(err, DumpError::FolderAlreadyExists(_));
        if self.policy == FailurePolicy::FailFast || fatal {
            error!(location = %location, "{}", err);
            return Err(err);
        }

        warn!(location = %location, "{}", err);
        self.failures_lock().push(DumpFailure::new(location, stage, &err));
        Ok(())
    }

    /// Still usable after a panicking task poisoned the lock
    fn failures_lock(&self) -> MutexGuard<'_, Vec<DumpFailure>> {
        self.tally
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn permit(&self) -> Result<OwnedSemaphorePermit, DumpError> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| DumpError::Task(e.to_string()))
    }

    fn outcome(&self, output_folder: std::path::PathBuf) -> TargetOutcome {
        let failures = self.failures_lock().clone();
        let summary = TargetSummary {
            databases: self.tally.databases.load(Ordering::SeqCst),
            schemas: self.tally.schemas.load(Ordering::SeqCst),
            objects_written: self.tally.objects_written.load(Ordering::SeqCst),
            duplicates: self.tally.duplicates.load(Ordering::SeqCst),
            failures: failures.len(),
            ..TargetSummary::new(&self.target, output_folder)
        };

        TargetOutcome { summary, failures }
    }
}

/// Wait for every task. The first propagated error returns immediately;
/// dropping the set aborts the remaining tasks.
async fn join_all(
    ctx: &TargetContext,
    mut tasks: JoinSet<Result<(), DumpError>>,
    location: &FailureLocation,
) -> Result<(), DumpError> {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tasks.abort_all();
                return Err(e);
            }
            Err(join_err) => {
                let err = DumpError::Task(join_err.to_string());
                if let Err(e) = ctx.recover(location.clone(), None, err) {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

async fn dump_database(ctx: Arc<TargetContext>, database: String) -> Result<(), DumpError> {
    let location = FailureLocation::target(&ctx.target).database(&database);

    let schemas = {
        let _permit = ctx.permit().await?;

        if let Err(e) = ctx.paths.create_sub_folder(&ctx.ddl_folder, &[&database]) {
            return ctx.recover(location, None, e);
        }

        match ctx.enumerator.list_schemas(&database).await {
            Ok(schemas) => schemas,
            Err(e) => return ctx.recover(location, None, e),
        }
    };

    ctx.tally.databases.fetch_add(1, Ordering::SeqCst);
    debug!(target = %ctx.target, database = %database, "Found {} schemas", schemas.len());

    let mut tasks = JoinSet::new();
    for schema in schemas {
        if schema == queries::SYSTEM_SCHEMA {
            debug!(database = %database, "Skipping {}", schema);
            continue;
        }
        tasks.spawn(dump_schema(Arc::clone(&ctx), database.clone(), schema));
    }

    join_all(&ctx, tasks, &location).await
}

async fn dump_schema(ctx: Arc<TargetContext>, database: String, schema: String) -> Result<(), DumpError> {
    let _permit = ctx.permit().await?;
    let location = FailureLocation::target(&ctx.target)
        .database(&database)
        .schema(&schema);

    if let Err(e) = ctx
        .paths
        .create_sub_folder(&ctx.ddl_folder, &[&database, &schema])
    {
        return ctx.recover(location, None, e);
    }

    let objects = match ctx.enumerator.list_objects(&database, &schema).await {
        Ok(objects) => objects,
        Err(e) => return ctx.recover(location, None, e),
    };

    ctx.tally.schemas.fetch_add(1, Ordering::SeqCst);
    info!(
        target = %ctx.target,
        database = %database,
        schema = %schema,
        "Dumping {} objects",
        objects.len()
    );

    for object in &objects {
        if let Err((stage, e)) = dump_object(&ctx, &database, &schema, object).await {
            let object_location = location.clone().object(object.file_stem(), object.kind);
            ctx.recover(object_location, Some(stage), e)?;
        }
    }

    Ok(())
}

/// Drive one object to `Written`. On failure, returns the last stage reached.
async fn dump_object(
    ctx: &TargetContext,
    database: &str,
    schema: &str,
    object: &SchemaObject,
) -> Result<(), (ObjectStage, DumpError)> {
    let name = object.file_stem();
    debug!(object = %name, kind = %object.kind, stage = %ObjectStage::Discovered);
    debug!(
        object = %name,
        signature = %object.original_signature,
        stage = %ObjectStage::SignatureNormalized
    );

    let ddl = ctx
        .retriever
        .fetch_definition(database, schema, object)
        .await
        .map_err(|e| (ObjectStage::SignatureNormalized, e))?;
    debug!(object = %name, bytes = ddl.len(), stage = %ObjectStage::DdlFetched);

    let allocated = ctx
        .paths
        .file_path(&ctx.ddl_folder, database, schema, object)
        .map_err(|e| (ObjectStage::DdlFetched, e))?;
    if allocated.duplicate {
        warn!(object = %name, path = %allocated.path.display(), "File already present, writing duplicate");
        ctx.tally.duplicates.fetch_add(1, Ordering::SeqCst);
    }
    debug!(object = %name, path = %allocated.path.display(), stage = %ObjectStage::PathResolved);

    ctx.paths
        .write_definition(&allocated.path, &ddl)
        .map_err(|e| (ObjectStage::PathResolved, e))?;
    ctx.tally.objects_written.fetch_add(1, Ordering::SeqCst);
    debug!(object = %name, stage = %ObjectStage::Written);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowdump_catalog::MockConnection;
    use std::path::PathBuf;

    fn context(policy: FailurePolicy) -> TargetContext {
        let connection: Arc<dyn WarehouseConnection> = Arc::new(MockConnection::new());
        TargetContext {
            target: "prod".to_string(),
            ddl_folder: "prod".to_string(),
            enumerator: CatalogEnumerator::new(Arc::clone(&connection)),
            retriever: DdlRetriever::new(connection),
            paths: Arc::new(PathAllocator::new("/tmp/snowdump-unused")),
            semaphore: Arc::new(Semaphore::new(1)),
            policy,
            tally: Tally::default(),
        }
    }

    #[test]
    fn fail_fast_propagates() {
        let ctx = context(FailurePolicy::FailFast);
        let result = ctx.recover(FailureLocation::target("prod"), None, DumpError::Task("boom".to_string()));
        assert!(result.is_err());
        assert!(ctx.outcome(PathBuf::from("prod")).failures.is_empty());
    }

    #[test]
    fn folder_clash_is_fatal_under_best_effort() {
        let ctx = context(FailurePolicy::BestEffort);
        let err = DumpError::FolderAlreadyExists(PathBuf::from("prod/db"));
        assert!(ctx.recover(FailureLocation::target("prod"), None, err).is_err());
    }

    #[test]
    fn failures_survive_a_poisoned_list() {
        let ctx = Arc::new(context(FailurePolicy::BestEffort));

        let holder = Arc::clone(&ctx);
        let _ = std::thread::spawn(move || {
            let _guard = holder.tally.failures.lock().unwrap();
            panic!("task panicked while recording");
        })
        .join();
        assert!(ctx.tally.failures.is_poisoned());

        ctx.recover(
            FailureLocation::target("prod").database("DB"),
            None,
            DumpError::Task("boom".to_string()),
        )
        .unwrap();

        let outcome = ctx.outcome(PathBuf::from("prod"));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.summary.failures, 1);
        assert_eq!(outcome.failures[0].category, "task");
    }
}
