//! Mutation routing: classifies the target of a user action and routes it
//! to the correct write path.
//!
//! Every mutation follows the same shape: the in-memory working set is
//! patched first (so presentation reflects the change immediately), the
//! store write is issued afterwards, and a failed write reverts the
//! optimistic patch. The pre-state is captured by an explicit command
//! object so the revert logic lives in one place. A failed write is
//! logged and reported as an outcome; it is never re-thrown as a blocking
//! error, and a partially applied remote sequence is not undone.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::CoreError;
use crate::expand::{default_end, expand_template};
use crate::ident::{RecordId, TaskId};
use crate::materialize::materialize;
use crate::models::{NewTaskData, Task, TaskKind, TaskPatch, TaskRow};
use crate::reconcile;
use crate::store::{RecordStore, RowFilter, RowPatch};
use crate::working_set::WorkingSet;

/// How an optimistic mutation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The store accepted the write; the optimistic patch stands.
    Committed,
    /// The store rejected a write; the optimistic patch was reverted.
    RolledBack,
    /// The action had nothing to do (empty patch, toggling a template).
    Ignored,
}

/// In-memory pre-state of one mutation, reverted in reverse order.
#[derive(Debug, Default)]
struct Command {
    undo: Vec<Edit>,
}

#[derive(Debug)]
enum Edit {
    Inserted(TaskId),
    Removed(Task),
    Replaced(Task),
}

impl Command {
    fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, working: &mut WorkingSet, task: Task) {
        let id = task.id;
        match working.insert(task) {
            Some(previous) => self.undo.push(Edit::Replaced(previous)),
            None => self.undo.push(Edit::Inserted(id)),
        }
    }

    fn remove(&mut self, working: &mut WorkingSet, id: TaskId) {
        if let Some(task) = working.remove(&id) {
            self.undo.push(Edit::Removed(task));
        }
    }

    fn revert(self, working: &mut WorkingSet) {
        for edit in self.undo.into_iter().rev() {
            match edit {
                Edit::Inserted(id) => {
                    working.remove(&id);
                }
                Edit::Removed(task) | Edit::Replaced(task) => {
                    working.insert(task);
                }
            }
        }
    }
}

/// Owns the working set and a record-store handle; all reads and
/// mutations go through it. `&mut self` per operation serializes the
/// read-modify-write on template date sets within this process.
pub struct Coordinator<S> {
    store: S,
    working: WorkingSet,
    user_id: Uuid,
}

impl<S: RecordStore> Coordinator<S> {
    pub fn new(store: S, user_id: Uuid) -> Self {
        Self {
            store,
            working: WorkingSet::new(),
            user_id,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds the working set from every row of the user. A read
    /// failure keeps the previous collection intact; there is no partial
    /// load.
    pub async fn load(&mut self) {
        let filter = RowFilter::All {
            user_id: self.user_id,
        };
        match self.store.select(&filter).await {
            Ok(rows) => self.working.rebuild(reconcile::unify(rows)),
            Err(error) => {
                tracing::warn!(%error, "load failed; keeping previous working set");
            }
        }
    }

    /// Rebuilds the working set for a bounded date range: plain rows by
    /// due date, templates overlapping the range (open-ended when
    /// `end_date` is null), and every override of those templates.
    /// Out-of-range occurrences are discarded only after reconciliation.
    pub async fn load_range(&mut self, start: NaiveDate, end: NaiveDate) {
        let user_id = self.user_id;
        let result = async {
            let mut rows_by_id: HashMap<RecordId, TaskRow> = HashMap::new();
            let plain = self
                .store
                .select(&RowFilter::DueBetween {
                    user_id,
                    start,
                    end,
                })
                .await?;
            let templates = self
                .store
                .select(&RowFilter::TemplatesOverlapping {
                    user_id,
                    start,
                    end,
                })
                .await?;
            let mut overrides = Vec::new();
            for template in &templates {
                overrides.extend(self.store.select(&RowFilter::OverridesOf(template.id)).await?);
            }
            for row in plain.into_iter().chain(templates).chain(overrides) {
                rows_by_id.insert(row.id, row);
            }
            Ok::<Vec<TaskRow>, CoreError>(rows_by_id.into_values().collect())
        }
        .await;

        match result {
            Ok(rows) => self
                .working
                .rebuild(reconcile::unify_bounded(rows, start, end)),
            Err(error) => {
                tracing::warn!(%error, "range load failed; keeping previous working set");
            }
        }
    }

    /// Creates a new plain task or template. A new template immediately
    /// materializes its virtual instances into the working set.
    pub async fn create(
        &mut self,
        data: NewTaskData,
    ) -> Result<(Task, MutationOutcome), CoreError> {
        let row = TaskRow::from_new(data, self.user_id)?;
        let task = Task::from(row.clone());

        let mut command = Command::new();
        command.put(&mut self.working, task.clone());
        if row.is_template {
            let dates = expand_template(&row);
            for instance in materialize(&row, &dates) {
                command.put(&mut self.working, instance);
            }
        }

        let result = self.store.insert(&row).await;
        let outcome = self.settle(command, result, "create");
        Ok((task, outcome))
    }

    /// Flips a task's completed flag. Plain tasks and overrides write
    /// their own row; a virtual instance rewrites the owning template's
    /// `completed_dates` set (no per-instance row exists). Templates have
    /// no done state and are ignored.
    pub async fn toggle(&mut self, id: TaskId) -> Result<MutationOutcome, CoreError> {
        let task = self.require(id)?;
        match task.kind() {
            TaskKind::Template => Ok(MutationOutcome::Ignored),
            TaskKind::Plain | TaskKind::PersistedOverride => {
                let record_id = self.record_id_of(&task)?;
                let completed = !task.completed;

                let mut updated = task;
                updated.completed = completed;
                let mut command = Command::new();
                command.put(&mut self.working, updated);

                let patch = RowPatch {
                    completed: Some(completed),
                    ..Default::default()
                };
                let result = self.store.update(&RowFilter::ById(record_id), &patch).await;
                Ok(self.settle(command, result, "toggle"))
            }
            TaskKind::VirtualInstance => {
                let instance = task
                    .instance_ref()
                    .ok_or_else(|| CoreError::MalformedId(id.to_string()))?;
                let template = self.require_template(instance.template_id, id)?;

                let completed = !task.completed;
                let mut dates = template.completed_dates.clone().unwrap_or_default();
                if completed {
                    dates.insert(instance.date);
                } else {
                    dates.remove(instance.date);
                }

                let mut updated_instance = task;
                updated_instance.completed = completed;
                let mut updated_template = template;
                updated_template.completed_dates = Some(dates.clone());

                let mut command = Command::new();
                command.put(&mut self.working, updated_instance);
                command.put(&mut self.working, updated_template);

                let patch = RowPatch {
                    completed_dates: Some(Some(dates)),
                    ..Default::default()
                };
                let result = self
                    .store
                    .update(&RowFilter::ById(instance.template_id), &patch)
                    .await;
                Ok(self.settle(command, result, "toggle"))
            }
        }
    }

    /// Applies a field edit. Virtual instances are promoted into durable
    /// override rows; template schedule edits re-materialize.
    pub async fn update(
        &mut self,
        id: TaskId,
        patch: TaskPatch,
    ) -> Result<MutationOutcome, CoreError> {
        if patch.is_empty() {
            return Ok(MutationOutcome::Ignored);
        }
        let task = self.require(id)?;
        match task.kind() {
            TaskKind::Plain | TaskKind::PersistedOverride => {
                if patch.touches_schedule() {
                    return Err(CoreError::InvalidInput(
                        "Cannot change recurrence on a non-recurring task; edit the template instead"
                            .to_string(),
                    ));
                }
                let record_id = self.record_id_of(&task)?;
                let mut updated = task;
                patch.apply_to(&mut updated);

                let mut command = Command::new();
                command.put(&mut self.working, updated);

                let row_patch = RowPatch::from_task_patch(&patch);
                let result = self
                    .store
                    .update(&RowFilter::ById(record_id), &row_patch)
                    .await;
                Ok(self.settle(command, result, "update"))
            }
            TaskKind::VirtualInstance => self.promote(task, patch).await,
            TaskKind::Template => self.update_template(task, patch).await,
        }
    }

    /// Promotion: editing a virtual instance inserts a brand-new
    /// persisted row under a fresh id and replaces the instance in the
    /// working set. The occurrence stays anchored: due date and
    /// `parent_task_id` survive unchanged; only the id changes. From here
    /// on reconciliation surfaces this row instead of regenerating the
    /// virtual instance.
    async fn promote(
        &mut self,
        instance: Task,
        patch: TaskPatch,
    ) -> Result<MutationOutcome, CoreError> {
        let instance_ref = instance
            .instance_ref()
            .ok_or_else(|| CoreError::MalformedId(instance.id.to_string()))?;

        let mut promoted = instance.clone();
        patch.apply_to(&mut promoted);
        promoted.due_date = instance.due_date;
        promoted.parent_task_id = Some(instance_ref.template_id);

        let row = promoted.into_row_with_id(RecordId::generate());

        let mut command = Command::new();
        command.remove(&mut self.working, instance.id);
        command.put(&mut self.working, Task::from(row.clone()));

        let result = self.store.insert(&row).await;
        Ok(self.settle(command, result, "promote"))
    }

    async fn update_template(
        &mut self,
        template: Task,
        patch: TaskPatch,
    ) -> Result<MutationOutcome, CoreError> {
        let record_id = self.record_id_of(&template)?;
        let mut updated = template.clone();
        patch.apply_to(&mut updated);

        let mut command = Command::new();
        let mut orphaned: Vec<TaskRow> = Vec::new();

        if patch.touches_schedule() {
            // The schedule changed: every currently-materialized virtual
            // instance is stale. Drop them, then re-run expansion,
            // materialization and reconciliation against the surviving
            // overrides.
            for instance_id in self.working.virtual_instances_of(record_id) {
                command.remove(&mut self.working, instance_id);
            }

            // Overrides whose date now falls outside the new range are
            // deleted rather than left as unreachable rows.
            let new_start = updated.start_date;
            let new_end = updated
                .end_date
                .or_else(|| new_start.map(default_end));
            for override_id in self.working.overrides_of(record_id) {
                let Some(row) = self.working.get(&override_id).and_then(Task::as_row) else {
                    continue;
                };
                let out_of_range = match (row.due_date, new_start, new_end) {
                    (Some(date), Some(start), Some(end)) => date < start || date > end,
                    (Some(_), None, _) => true,
                    _ => false,
                };
                if out_of_range {
                    command.remove(&mut self.working, override_id);
                    orphaned.push(row);
                }
            }

            command.put(&mut self.working, updated.clone());

            let row = updated
                .as_row()
                .ok_or_else(|| CoreError::MalformedId(updated.id.to_string()))?;
            let dates = expand_template(&row);
            for instance in materialize(&row, &dates) {
                let Some(date) = instance.due_date else {
                    continue;
                };
                if self.working.occurrence(record_id, date).is_none() {
                    command.put(&mut self.working, instance);
                }
            }
        } else {
            // Title/notes edits propagate to materialized virtual
            // instances in place. Overrides keep their own edited copy;
            // that is the point of having overridden them.
            command.put(&mut self.working, updated);
            if patch.title.is_some() || patch.notes.is_some() {
                for instance_id in self.working.virtual_instances_of(record_id) {
                    let Some(mut instance) = self.working.get(&instance_id).cloned() else {
                        continue;
                    };
                    if let Some(title) = &patch.title {
                        instance.title = title.clone();
                    }
                    if let Some(notes) = &patch.notes {
                        instance.notes = notes.clone();
                    }
                    command.put(&mut self.working, instance);
                }
            }
        }

        let row_patch = RowPatch::from_task_patch(&patch);
        let result = self
            .store
            .update(&RowFilter::ById(record_id), &row_patch)
            .await;
        if let Err(error) = result {
            tracing::warn!(%error, op = "update template", "store write failed; reverting optimistic change");
            command.revert(&mut self.working);
            return Ok(MutationOutcome::RolledBack);
        }

        for orphan in orphaned {
            if let Err(error) = self.store.delete(&RowFilter::ById(orphan.id)).await {
                tracing::warn!(%error, override_id = %orphan.id, "failed to delete orphaned override; restoring it in memory");
                self.working.insert(Task::from(orphan));
            }
        }

        Ok(MutationOutcome::Committed)
    }

    /// Deletes a task. Virtual instances and overrides record their date
    /// in the owning template's `excluded_dates` so expansion never
    /// regenerates the occurrence; deleting a template takes its
    /// overrides with it; `related` children of a deleted parent are
    /// unlinked, not deleted.
    pub async fn delete(&mut self, id: TaskId) -> Result<MutationOutcome, CoreError> {
        let task = self.require(id)?;
        match task.kind() {
            TaskKind::Plain => {
                let record_id = self.record_id_of(&task)?;
                let mut command = Command::new();
                command.remove(&mut self.working, id);
                self.unlink_related_in_memory(&mut command, record_id);

                let result = async {
                    self.store.delete(&RowFilter::ById(record_id)).await?;
                    let unlink = RowPatch {
                        parent_task_id: Some(None),
                        ..Default::default()
                    };
                    self.store
                        .update(&RowFilter::RelatedTo(record_id), &unlink)
                        .await?;
                    Ok::<_, CoreError>(())
                }
                .await;
                Ok(self.settle(command, result, "delete"))
            }
            TaskKind::Template => {
                let record_id = self.record_id_of(&task)?;
                let mut command = Command::new();
                command.remove(&mut self.working, id);
                for instance_id in self.working.virtual_instances_of(record_id) {
                    command.remove(&mut self.working, instance_id);
                }
                for override_id in self.working.overrides_of(record_id) {
                    command.remove(&mut self.working, override_id);
                }
                self.unlink_related_in_memory(&mut command, record_id);

                let result = async {
                    self.store.delete(&RowFilter::OverridesOf(record_id)).await?;
                    self.store.delete(&RowFilter::ById(record_id)).await?;
                    let unlink = RowPatch {
                        parent_task_id: Some(None),
                        ..Default::default()
                    };
                    self.store
                        .update(&RowFilter::RelatedTo(record_id), &unlink)
                        .await?;
                    Ok::<_, CoreError>(())
                }
                .await;
                Ok(self.settle(command, result, "delete template"))
            }
            TaskKind::PersistedOverride => {
                let record_id = self.record_id_of(&task)?;
                let parent = task
                    .parent_task_id
                    .ok_or_else(|| CoreError::MalformedId(id.to_string()))?;

                let mut command = Command::new();
                command.remove(&mut self.working, id);

                // A stale override whose template is no longer loaded is
                // just deleted; there is no date set left to maintain.
                let exclusion = match (
                    self.working.get(&TaskId::Record(parent)).cloned(),
                    task.due_date,
                ) {
                    (Some(template), Some(date)) => {
                        let mut excluded = template.excluded_dates.clone().unwrap_or_default();
                        excluded.insert(date);
                        let mut updated = template;
                        updated.excluded_dates = Some(excluded.clone());
                        command.put(&mut self.working, updated);
                        Some(excluded)
                    }
                    _ => None,
                };

                let result = async {
                    self.store.delete(&RowFilter::ById(record_id)).await?;
                    if let Some(excluded) = &exclusion {
                        let patch = RowPatch {
                            excluded_dates: Some(Some(excluded.clone())),
                            ..Default::default()
                        };
                        self.store.update(&RowFilter::ById(parent), &patch).await?;
                    }
                    Ok::<_, CoreError>(())
                }
                .await;
                Ok(self.settle(command, result, "delete override"))
            }
            TaskKind::VirtualInstance => {
                let instance = task
                    .instance_ref()
                    .ok_or_else(|| CoreError::MalformedId(id.to_string()))?;
                let template = self.require_template(instance.template_id, id)?;

                let mut excluded = template.excluded_dates.clone().unwrap_or_default();
                excluded.insert(instance.date);
                let mut updated = template;
                updated.excluded_dates = Some(excluded.clone());

                let mut command = Command::new();
                command.remove(&mut self.working, id);
                command.put(&mut self.working, updated);

                let patch = RowPatch {
                    excluded_dates: Some(Some(excluded)),
                    ..Default::default()
                };
                let result = self
                    .store
                    .update(&RowFilter::ById(instance.template_id), &patch)
                    .await;
                Ok(self.settle(command, result, "delete instance"))
            }
        }
    }

    fn unlink_related_in_memory(&mut self, command: &mut Command, parent: RecordId) {
        for child_id in self.working.related_children_of(parent) {
            let Some(mut child) = self.working.get(&child_id).cloned() else {
                continue;
            };
            child.parent_task_id = None;
            command.put(&mut self.working, child);
        }
    }

    fn settle<T>(
        &mut self,
        command: Command,
        result: Result<T, CoreError>,
        op: &'static str,
    ) -> MutationOutcome {
        match result {
            Ok(_) => MutationOutcome::Committed,
            Err(error) => {
                tracing::warn!(%error, op, "store write failed; reverting optimistic change");
                command.revert(&mut self.working);
                MutationOutcome::RolledBack
            }
        }
    }

    fn require(&self, id: TaskId) -> Result<Task, CoreError> {
        self.working
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// A synthetic id whose template is not loaded is an error, not
    /// undefined behavior.
    fn require_template(&self, template_id: RecordId, instance: TaskId) -> Result<Task, CoreError> {
        self.working
            .get(&TaskId::Record(template_id))
            .cloned()
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "No template {template_id} for instance {instance}"
                ))
            })
    }

    fn record_id_of(&self, task: &Task) -> Result<RecordId, CoreError> {
        task.record_id()
            .ok_or_else(|| CoreError::MalformedId(task.id.to_string()))
    }
}
