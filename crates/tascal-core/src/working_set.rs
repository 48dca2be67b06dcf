//! The in-memory working set: the unified task collection consumed by
//! presentation, indexed by id and by `(template, date)` occurrence slot.
//!
//! The set is an explicit store object handed to the mutation
//! coordinator, not an ambient global; reconciliation lookups are O(1)
//! through the occurrence index instead of linear scans.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::ident::{RecordId, TaskId};
use crate::models::{Task, TaskKind, TaskType};

/// The occurrence slot a task claims, if any. Overrides and virtual
/// instances occupy exactly one `(template, date)` slot each; plain
/// tasks, `related` tasks and templates claim none.
fn occurrence_key(task: &Task) -> Option<(RecordId, NaiveDate)> {
    match task.kind() {
        TaskKind::PersistedOverride | TaskKind::VirtualInstance => {
            Some((task.parent_task_id?, task.due_date?))
        }
        TaskKind::Plain | TaskKind::Template => None,
    }
}

#[derive(Debug, Default)]
pub struct WorkingSet {
    tasks: HashMap<TaskId, Task>,
    occurrences: HashMap<(RecordId, NaiveDate), TaskId>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole collection, e.g. after a (re)load.
    pub fn rebuild(&mut self, tasks: Vec<Task>) {
        self.tasks.clear();
        self.occurrences.clear();
        for task in tasks {
            self.insert(task);
        }
    }

    /// Inserts or replaces a task, returning the previous task under the
    /// same id. A task claiming an occurrence slot displaces whatever id
    /// held the slot before (an override suppresses the virtual
    /// instance); a task whose own slot moved releases the old slot.
    pub fn insert(&mut self, task: Task) -> Option<Task> {
        let id = task.id;
        let new_key = occurrence_key(&task);

        let previous = self.tasks.remove(&id);
        if let Some(old_key) = previous.as_ref().and_then(occurrence_key) {
            if Some(old_key) != new_key && self.occurrences.get(&old_key) == Some(&id) {
                self.occurrences.remove(&old_key);
            }
        }

        if let Some(key) = new_key {
            if let Some(displaced) = self.occurrences.insert(key, id) {
                if displaced != id {
                    self.tasks.remove(&displaced);
                }
            }
        }
        self.tasks.insert(id, task);
        previous
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let task = self.tasks.remove(id)?;
        if let Some(key) = occurrence_key(&task) {
            if self.occurrences.get(&key) == Some(id) {
                self.occurrences.remove(&key);
            }
        }
        Some(task)
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// The single occurrence surfaced for a template on a date, if any.
    pub fn occurrence(&self, template: RecordId, date: NaiveDate) -> Option<&Task> {
        let id = self.occurrences.get(&(template, date))?;
        self.tasks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Tasks in a stable presentation order: by due date (undated last),
    /// then by id.
    pub fn sorted(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by_key(|task| (task.due_date.is_none(), task.due_date, task.id));
        tasks
    }

    pub fn virtual_instances_of(&self, template: RecordId) -> Vec<TaskId> {
        self.ids_where(|task| {
            task.kind() == TaskKind::VirtualInstance && task.parent_task_id == Some(template)
        })
    }

    pub fn overrides_of(&self, template: RecordId) -> Vec<TaskId> {
        self.ids_where(|task| {
            task.kind() == TaskKind::PersistedOverride && task.parent_task_id == Some(template)
        })
    }

    pub fn related_children_of(&self, parent: RecordId) -> Vec<TaskId> {
        self.ids_where(|task| {
            task.task_type == TaskType::Related && task.parent_task_id == Some(parent)
        })
    }

    fn ids_where(&self, predicate: impl Fn(&Task) -> bool) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|task| predicate(task))
            .map(|task| task.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::InstanceRef;
    use crate::materialize::materialize_one;
    use crate::models::{TaskRow, TaskType};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn template_row() -> TaskRow {
        TaskRow {
            title: "Gym".to_string(),
            task_type: TaskType::Routine,
            is_template: true,
            start_date: Some(date(2026, 2, 1)),
            ..Default::default()
        }
    }

    #[test]
    fn override_insert_displaces_virtual_instance_in_its_slot() {
        let template = template_row();
        let mut set = WorkingSet::new();
        let virt = materialize_one(&template, date(2026, 2, 2));
        let virt_id = virt.id;
        set.insert(Task::from(template.clone()));
        set.insert(virt);

        let over = Task::from(TaskRow {
            title: "Rescheduled".to_string(),
            task_type: TaskType::Routine,
            due_date: Some(date(2026, 2, 2)),
            parent_task_id: Some(template.id),
            ..Default::default()
        });
        let over_id = over.id;
        set.insert(over);

        assert!(!set.contains(&virt_id));
        assert_eq!(set.occurrence(template.id, date(2026, 2, 2)).unwrap().id, over_id);
        // One template plus one occurrence.
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_clears_the_occurrence_slot() {
        let template = template_row();
        let mut set = WorkingSet::new();
        let virt = materialize_one(&template, date(2026, 2, 4));
        let id = virt.id;
        set.insert(virt);

        assert!(set.occurrence(template.id, date(2026, 2, 4)).is_some());
        set.remove(&id);
        assert!(set.occurrence(template.id, date(2026, 2, 4)).is_none());
    }

    #[test]
    fn related_children_are_not_occurrences() {
        let template = template_row();
        let related = Task::from(TaskRow {
            task_type: TaskType::Related,
            due_date: Some(date(2026, 2, 2)),
            parent_task_id: Some(template.id),
            ..Default::default()
        });
        let mut set = WorkingSet::new();
        set.insert(related);

        assert!(set.occurrence(template.id, date(2026, 2, 2)).is_none());
        assert_eq!(set.related_children_of(template.id).len(), 1);
        assert!(set.overrides_of(template.id).is_empty());
    }

    #[test]
    fn sorted_orders_by_due_date_with_undated_last() {
        let mut set = WorkingSet::new();
        set.insert(Task::from(TaskRow {
            title: "undated".to_string(),
            ..Default::default()
        }));
        set.insert(Task::from(TaskRow {
            title: "later".to_string(),
            due_date: Some(date(2026, 3, 1)),
            ..Default::default()
        }));
        set.insert(Task::from(TaskRow {
            title: "sooner".to_string(),
            due_date: Some(date(2026, 2, 1)),
            ..Default::default()
        }));

        let titles: Vec<&str> = set.sorted().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["sooner", "later", "undated"]);
    }

    #[test]
    fn virtual_instance_ids_look_up_after_reinsert() {
        let template = template_row();
        let mut set = WorkingSet::new();
        let instance = InstanceRef::new(template.id, date(2026, 2, 9));
        set.insert(materialize_one(&template, date(2026, 2, 9)));
        assert!(set.get(&TaskId::Instance(instance)).is_some());
    }
}
