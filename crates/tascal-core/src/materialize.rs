//! Instance materialization: expanded dates -> virtual occurrence records.

use chrono::NaiveDate;

use crate::ident::{InstanceRef, TaskId};
use crate::models::{Task, TaskRow};

/// Builds the virtual instance of `template` on `date`.
///
/// The instance copies the template's title/type/notes, takes the date as
/// its due date, and reads its `completed` flag out of the template's
/// `completed_dates` set. Its id is the synthetic instance form and is
/// recomputed identically on every materialization.
pub fn materialize_one(template: &TaskRow, date: NaiveDate) -> Task {
    Task {
        id: TaskId::Instance(InstanceRef::new(template.id, date)),
        user_id: template.user_id,
        title: template.title.clone(),
        task_type: template.task_type,
        due_date: Some(date),
        due_time: template.due_time,
        completed: template.completed_on(date),
        notes: template.notes.clone(),
        is_template: false,
        start_date: None,
        end_date: None,
        days_selected: None,
        recurrence_interval: None,
        completed_dates: None,
        excluded_dates: None,
        parent_task_id: Some(template.id),
        created_at: template.created_at,
        updated_at: template.updated_at,
    }
}

/// Materializes every expanded date that is not excluded. Dates present in
/// the template's `excluded_dates` never produce an instance, regardless
/// of the recurrence rule.
pub fn materialize(template: &TaskRow, dates: &[NaiveDate]) -> Vec<Task> {
    dates
        .iter()
        .copied()
        .filter(|date| !template.is_excluded(*date))
        .map(|date| materialize_one(template, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateSet, TaskKind, TaskType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gym_template() -> TaskRow {
        TaskRow {
            title: "Gym".to_string(),
            task_type: TaskType::Routine,
            is_template: true,
            start_date: Some(date(2026, 2, 1)),
            end_date: Some(date(2026, 2, 10)),
            notes: Some("leg day".to_string()),
            completed_dates: Some([date(2026, 2, 4)].into_iter().collect()),
            excluded_dates: Some(DateSet::new()),
            ..Default::default()
        }
    }

    #[test]
    fn instances_copy_template_fields_and_read_completed_dates() {
        let template = gym_template();
        let dates = [date(2026, 2, 2), date(2026, 2, 4), date(2026, 2, 9)];
        let instances = materialize(&template, &dates);

        assert_eq!(instances.len(), 3);
        for (instance, expected) in instances.iter().zip(dates) {
            assert_eq!(instance.kind(), TaskKind::VirtualInstance);
            assert_eq!(instance.title, "Gym");
            assert_eq!(instance.notes.as_deref(), Some("leg day"));
            assert_eq!(instance.due_date, Some(expected));
            assert_eq!(instance.parent_task_id, Some(template.id));
            assert!(!instance.is_template);
        }
        assert!(!instances[0].completed);
        assert!(instances[1].completed);
        assert!(!instances[2].completed);
    }

    #[test]
    fn excluded_dates_never_materialize() {
        let mut template = gym_template();
        template.excluded_dates = Some([date(2026, 2, 4)].into_iter().collect());
        let dates = [date(2026, 2, 2), date(2026, 2, 4), date(2026, 2, 9)];
        let instances = materialize(&template, &dates);
        assert_eq!(instances.len(), 2);
        assert!(instances.iter().all(|i| i.due_date != Some(date(2026, 2, 4))));
    }

    #[test]
    fn instance_ids_are_recomputed_identically() {
        let template = gym_template();
        let a = materialize_one(&template, date(2026, 2, 2));
        let b = materialize_one(&template, date(2026, 2, 2));
        assert_eq!(a.id, b.id);
        assert_eq!(
            a.id.to_string(),
            format!("{}_2026-02-02", template.id)
        );
    }
}
