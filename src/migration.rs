use crate::model::Models;
use crate::stage::Stage;

/// Upgrades documents produced by older releases.
///
/// Invoked exactly once per load attempt, after the surface is ready.
/// Answering `done(true)` demands one full reload cycle; the load pipeline
/// owns that loop and its iteration ceiling, so implementations must not
/// recurse internally. The answer may be delivered synchronously or from a
/// deferred task.
pub trait Migration {
    fn process(&self, stage: &Stage, models: &Models, done: Box<dyn FnOnce(bool)>);
}

/// Used when a build ships with no pending migrations.
pub struct NoMigration;

impl Migration for NoMigration {
    fn process(&self, _stage: &Stage, _models: &Models, done: Box<dyn FnOnce(bool)>) {
        done(false);
    }
}
