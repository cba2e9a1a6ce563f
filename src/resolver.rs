//! 作业状态解析
//!
//! 根据教师的回复记录与截止时间推导教师可见状态，
//! 并据此汇总出作业的基础状态，管理端筛选与教师视图共用同一套规则。

use chrono::{DateTime, Utc};

use crate::models::assignments::entities::{
    Assignment, AssignmentResponse, AssignmentStatus, ResponsePatch, ResponseStatus,
    SubmissionStatus, TeacherStatus,
};

/// 由单条回复推导教师可见状态
pub fn resolve_response_status(
    response: Option<&AssignmentResponse>,
    due_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> TeacherStatus {
    let Some(response) = response else {
        return if now > due_date {
            TeacherStatus::NotDelivered
        } else {
            TeacherStatus::Pending
        };
    };

    match (response.submission_status, response.status) {
        (SubmissionStatus::OnTime, ResponseStatus::Submitted) => TeacherStatus::Completed,
        (SubmissionStatus::Late, ResponseStatus::Submitted) => TeacherStatus::CompletedLate,
        (SubmissionStatus::Closed, _) => TeacherStatus::NotDelivered,
        _ => TeacherStatus::Pending,
    }
}

/// 教师在作业上的可见状态
pub fn resolve_teacher_status(
    assignment: &Assignment,
    teacher_id: i64,
    now: DateTime<Utc>,
) -> TeacherStatus {
    resolve_response_status(
        assignment.response_for(teacher_id),
        assignment.due_date,
        now,
    )
}

/// 按可见状态归类的教师数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusBuckets {
    pub pending: usize,
    pub completed: usize,
    pub completed_late: usize,
    pub not_delivered: usize,
}

impl StatusBuckets {
    pub fn add(&mut self, status: TeacherStatus) {
        match status {
            TeacherStatus::Pending => self.pending += 1,
            TeacherStatus::Completed => self.completed += 1,
            TeacherStatus::CompletedLate => self.completed_late += 1,
            TeacherStatus::NotDelivered => self.not_delivered += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.completed + self.completed_late + self.not_delivered
    }

    pub fn all_resolved(&self) -> bool {
        self.pending == 0 && self.total() > 0
    }
}

/// 对所有被分配教师归类，重复的教师 ID 只计一次
pub fn classify_teachers(assignment: &Assignment, now: DateTime<Utc>) -> StatusBuckets {
    let mut seen = Vec::with_capacity(assignment.assigned_to.len());
    let mut buckets = StatusBuckets::default();
    for &teacher_id in &assignment.assigned_to {
        if seen.contains(&teacher_id) {
            continue;
        }
        seen.push(teacher_id);
        buckets.add(resolve_teacher_status(assignment, teacher_id, now));
    }
    buckets
}

/// 由归类结果得出基础状态
pub fn base_status_from_buckets(buckets: &StatusBuckets) -> AssignmentStatus {
    if !buckets.all_resolved() {
        return AssignmentStatus::Pending;
    }
    if buckets.not_delivered > 0 {
        AssignmentStatus::NotDelivered
    } else if buckets.completed_late > 0 {
        AssignmentStatus::CompletedLate
    } else {
        AssignmentStatus::Completed
    }
}

/// 汇总作业的基础状态
pub fn reconcile_base_status(assignment: &Assignment, now: DateTime<Utc>) -> AssignmentStatus {
    base_status_from_buckets(&classify_teachers(assignment, now))
}

/// 计算需要持久化的基础状态，冻结状态保持不变
pub fn next_base_status(
    current: AssignmentStatus,
    reconciled: AssignmentStatus,
) -> AssignmentStatus {
    if current.is_hold() {
        current
    } else {
        reconciled
    }
}

/// 提交时刻对应的时效状态
///
/// 超过关闭时间返回 `None`，调用方应拒绝提交。
pub fn submission_status_at(
    due_date: DateTime<Utc>,
    close_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<SubmissionStatus> {
    if now <= due_date {
        return Some(SubmissionStatus::OnTime);
    }
    match close_date {
        Some(close) if now > close => None,
        _ => Some(SubmissionStatus::Late),
    }
}

/// 管理员覆盖状态对应的回复内容，`pending` 对应删除回复
pub fn override_patch(status: TeacherStatus, now: DateTime<Utc>) -> Option<ResponsePatch> {
    let (submitted_at, submission_status, status) = match status {
        TeacherStatus::Pending => return None,
        TeacherStatus::Completed => (
            Some(now),
            SubmissionStatus::OnTime,
            ResponseStatus::Submitted,
        ),
        TeacherStatus::CompletedLate => {
            (Some(now), SubmissionStatus::Late, ResponseStatus::Submitted)
        }
        TeacherStatus::NotDelivered => (None, SubmissionStatus::Closed, ResponseStatus::Reviewed),
    };
    Some(ResponsePatch {
        submitted_at,
        submission_status,
        status,
        files: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn response(
        teacher_id: i64,
        submission_status: SubmissionStatus,
        status: ResponseStatus,
    ) -> AssignmentResponse {
        AssignmentResponse {
            id: teacher_id,
            teacher_id,
            submitted_at: None,
            submission_status,
            status,
            files: vec![],
            updated_at: at(2025, 7, 1),
        }
    }

    fn assignment(
        due: DateTime<Utc>,
        assigned_to: Vec<i64>,
        responses: Vec<AssignmentResponse>,
    ) -> Assignment {
        Assignment {
            id: 1,
            title: "Planeación semestral".into(),
            description: None,
            due_date: due,
            close_date: None,
            created_by: 99,
            is_general: false,
            assigned_to,
            status: AssignmentStatus::Pending,
            responses,
            created_at: at(2025, 7, 1),
            updated_at: at(2025, 7, 1),
        }
    }

    #[test]
    fn test_on_time_submission_completes() {
        let a = assignment(
            at(2025, 8, 10),
            vec![7],
            vec![response(7, SubmissionStatus::OnTime, ResponseStatus::Submitted)],
        );
        let now = at(2025, 8, 12);
        assert_eq!(resolve_teacher_status(&a, 7, now), TeacherStatus::Completed);
        assert_eq!(reconcile_base_status(&a, now), AssignmentStatus::Completed);
    }

    #[test]
    fn test_missing_response_after_due_is_not_delivered() {
        let a = assignment(at(2025, 8, 1), vec![7], vec![]);
        let now = at(2025, 8, 15);
        assert_eq!(
            resolve_teacher_status(&a, 7, now),
            TeacherStatus::NotDelivered
        );
        assert_eq!(reconcile_base_status(&a, now), AssignmentStatus::NotDelivered);
    }

    #[test]
    fn test_missing_response_before_due_is_pending() {
        let a = assignment(at(2025, 8, 10), vec![7], vec![]);
        assert_eq!(
            resolve_teacher_status(&a, 7, at(2025, 8, 10)),
            TeacherStatus::Pending
        );
    }

    #[test]
    fn test_partial_progress_stays_pending() {
        let a = assignment(
            at(2025, 9, 1),
            vec![7, 8],
            vec![response(7, SubmissionStatus::Late, ResponseStatus::Submitted)],
        );
        let now = at(2025, 8, 15);
        assert_eq!(
            resolve_teacher_status(&a, 7, now),
            TeacherStatus::CompletedLate
        );
        assert_eq!(resolve_teacher_status(&a, 8, now), TeacherStatus::Pending);
        assert_eq!(reconcile_base_status(&a, now), AssignmentStatus::Pending);
    }

    #[test]
    fn test_closed_is_not_delivered_regardless_of_internal_status() {
        for status in [
            ResponseStatus::Submitted,
            ResponseStatus::Reviewed,
            ResponseStatus::None,
        ] {
            let r = response(7, SubmissionStatus::Closed, status);
            assert_eq!(
                resolve_response_status(Some(&r), at(2025, 9, 1), at(2025, 8, 1)),
                TeacherStatus::NotDelivered
            );
        }
    }

    #[test]
    fn test_other_combinations_are_pending() {
        let due = at(2025, 8, 1);
        let now = at(2025, 9, 1);
        let cases = [
            (SubmissionStatus::Draft, ResponseStatus::None),
            (SubmissionStatus::None, ResponseStatus::None),
            (SubmissionStatus::OnTime, ResponseStatus::Reviewed),
            (SubmissionStatus::Late, ResponseStatus::None),
        ];
        for (submission, status) in cases {
            let r = response(7, submission, status);
            assert_eq!(
                resolve_response_status(Some(&r), due, now),
                TeacherStatus::Pending,
                "{submission} / {status}"
            );
        }
    }

    #[test]
    fn test_mixed_resolutions() {
        let now = at(2025, 8, 15);
        let a = assignment(
            at(2025, 8, 10),
            vec![1, 2],
            vec![
                response(1, SubmissionStatus::OnTime, ResponseStatus::Submitted),
                response(2, SubmissionStatus::Late, ResponseStatus::Submitted),
            ],
        );
        assert_eq!(reconcile_base_status(&a, now), AssignmentStatus::CompletedLate);

        let a = assignment(
            at(2025, 8, 10),
            vec![1, 2, 3],
            vec![
                response(1, SubmissionStatus::OnTime, ResponseStatus::Submitted),
                response(2, SubmissionStatus::Late, ResponseStatus::Submitted),
            ],
        );
        // 教师 3 没有回复且已过截止时间
        assert_eq!(reconcile_base_status(&a, now), AssignmentStatus::NotDelivered);
    }

    #[test]
    fn test_no_teachers_is_pending() {
        let a = assignment(at(2025, 8, 1), vec![], vec![]);
        assert_eq!(
            reconcile_base_status(&a, at(2025, 9, 1)),
            AssignmentStatus::Pending
        );
    }

    #[test]
    fn test_duplicate_assignees_counted_once() {
        let a = assignment(
            at(2025, 8, 10),
            vec![7, 7, 7],
            vec![response(7, SubmissionStatus::OnTime, ResponseStatus::Submitted)],
        );
        let buckets = classify_teachers(&a, at(2025, 8, 1));
        assert_eq!(buckets.total(), 1);
        assert_eq!(buckets.completed, 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let now = at(2025, 8, 15);
        let mut a = assignment(
            at(2025, 8, 10),
            vec![1, 2],
            vec![response(1, SubmissionStatus::OnTime, ResponseStatus::Submitted)],
        );
        let first = reconcile_base_status(&a, now);
        a.status = next_base_status(a.status, first);
        let second = reconcile_base_status(&a, now);
        assert_eq!(first, second);
        assert_eq!(next_base_status(a.status, second), a.status);
    }

    #[test]
    fn test_holds_survive_reconciliation() {
        for hold in [
            AssignmentStatus::Scheduled,
            AssignmentStatus::Cancelled,
            AssignmentStatus::PublicationError,
        ] {
            assert_eq!(next_base_status(hold, AssignmentStatus::Completed), hold);
        }
        assert_eq!(
            next_base_status(AssignmentStatus::Active, AssignmentStatus::Pending),
            AssignmentStatus::Pending
        );
        assert_eq!(
            next_base_status(AssignmentStatus::Completed, AssignmentStatus::NotDelivered),
            AssignmentStatus::NotDelivered
        );
    }

    #[test]
    fn test_resolved_status_is_always_visible_status() {
        let due = at(2025, 8, 10);
        let submissions = [
            SubmissionStatus::OnTime,
            SubmissionStatus::Late,
            SubmissionStatus::Closed,
            SubmissionStatus::Draft,
            SubmissionStatus::None,
        ];
        let statuses = [
            ResponseStatus::Submitted,
            ResponseStatus::Reviewed,
            ResponseStatus::None,
        ];
        for now in [at(2025, 8, 1), at(2025, 8, 20)] {
            for s in submissions {
                for st in statuses {
                    let r = response(1, s, st);
                    let status = resolve_response_status(Some(&r), due, now);
                    assert!(TeacherStatus::ALL.contains(&status));
                }
            }
        }
    }

    #[test]
    fn test_submission_timing() {
        let due = at(2025, 8, 10);
        let close = Some(at(2025, 8, 20));
        assert_eq!(
            submission_status_at(due, close, at(2025, 8, 9)),
            Some(SubmissionStatus::OnTime)
        );
        assert_eq!(
            submission_status_at(due, close, due),
            Some(SubmissionStatus::OnTime)
        );
        assert_eq!(
            submission_status_at(due, close, at(2025, 8, 15)),
            Some(SubmissionStatus::Late)
        );
        assert_eq!(submission_status_at(due, close, at(2025, 8, 21)), None);
        assert_eq!(
            submission_status_at(due, None, at(2026, 1, 1)),
            Some(SubmissionStatus::Late)
        );
    }

    #[test]
    fn test_override_patch_mapping() {
        let now = at(2025, 8, 15);
        let patch = override_patch(TeacherStatus::Completed, now).unwrap();
        assert_eq!(patch.submission_status, SubmissionStatus::OnTime);
        assert_eq!(patch.status, ResponseStatus::Submitted);
        assert_eq!(patch.submitted_at, Some(now));

        let patch = override_patch(TeacherStatus::CompletedLate, now).unwrap();
        assert_eq!(patch.submission_status, SubmissionStatus::Late);
        assert_eq!(patch.status, ResponseStatus::Submitted);

        let patch = override_patch(TeacherStatus::NotDelivered, now).unwrap();
        assert_eq!(patch.submission_status, SubmissionStatus::Closed);
        assert_eq!(patch.status, ResponseStatus::Reviewed);
        assert_eq!(patch.submitted_at, None);

        assert!(override_patch(TeacherStatus::Pending, now).is_none());
    }

    #[test]
    fn test_override_round_trips_through_resolver() {
        let now = at(2025, 8, 15);
        for status in [
            TeacherStatus::Completed,
            TeacherStatus::CompletedLate,
            TeacherStatus::NotDelivered,
        ] {
            let patch = override_patch(status, now).unwrap();
            let r = AssignmentResponse {
                id: 1,
                teacher_id: 1,
                submitted_at: patch.submitted_at,
                submission_status: patch.submission_status,
                status: patch.status,
                files: vec![],
                updated_at: now,
            };
            assert_eq!(resolve_response_status(Some(&r), at(2025, 9, 1), now), status);
        }
    }
}
