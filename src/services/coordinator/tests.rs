use std::sync::Arc;

use time::macros::datetime;
use time::{Duration, PrimitiveDateTime};

use super::*;
use crate::db::types::{AttemptStatus, ChoiceType, ExamStatus};
use crate::services::attempt_engine::ManualGrade;
use crate::services::question_bank::OptionDraft;
use crate::tasks::maintenance::expire_overdue_attempts;

const T: PrimitiveDateTime = datetime!(2025-03-01 9:00);

fn teacher() -> Actor {
    Actor { id: "teacher-1".to_string(), role: UserRole::Teacher }
}

fn other_teacher() -> Actor {
    Actor { id: "teacher-2".to_string(), role: UserRole::Teacher }
}

fn student(id: &str) -> Actor {
    Actor { id: id.to_string(), role: UserRole::Student }
}

fn coordinator() -> ExamCoordinator {
    ExamCoordinator::new(Store::in_memory())
}

struct Fixture {
    exam: Exam,
    choice_id: String,
    open_id: Option<String>,
}

async fn open_exam(coordinator: &ExamCoordinator, with_open_question: bool) -> Fixture {
    let author = teacher();
    let exam = coordinator
        .create_exam(&author, "Geography", None, T - Duration::hours(1))
        .await
        .expect("create");
    coordinator
        .schedule_exam(&author, &exam.id, T, T + Duration::minutes(120), 30, T - Duration::hours(1))
        .await
        .expect("schedule");

    let choice = coordinator
        .add_choice_question(
            &author,
            &exam.id,
            "Capital of France?",
            10.0,
            ChoiceType::Single,
            None,
            vec![
                OptionDraft { label: "Paris".into(), is_correct: true },
                OptionDraft { label: "Lyon".into(), is_correct: false },
            ],
            T - Duration::hours(1),
        )
        .await
        .expect("choice question");

    let open_id = if with_open_question {
        let open = coordinator
            .add_open_question(&author, &exam.id, "Describe the Seine", 5.0, T - Duration::hours(1))
            .await
            .expect("open question");
        Some(open.id)
    } else {
        None
    };

    coordinator
        .enroll(&author, &exam.id, "student-1", T - Duration::hours(1))
        .await
        .expect("enroll");
    let exam = coordinator.open_exam(&author, &exam.id, T).await.expect("open");

    Fixture { exam, choice_id: choice.id, open_id }
}

#[tokio::test]
async fn late_start_is_capped_by_window_end() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;

    let started = T + Duration::minutes(100);
    let attempt = coordinator
        .start_attempt(&student("student-1"), &fixture.exam.id, "student-1", started)
        .await
        .expect("start");

    assert_eq!(attempt.expires_at, T + Duration::minutes(120));
    let remaining = coordinator
        .remaining_time(&student("student-1"), &attempt.id, started)
        .await
        .expect("remaining");
    assert_eq!(remaining, 20 * 60);
}

#[tokio::test]
async fn start_is_idempotent_while_in_progress() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;
    let actor = student("student-1");

    let first = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T + Duration::minutes(1))
        .await
        .expect("start");
    let second = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T + Duration::minutes(2))
        .await
        .expect("resume");

    assert_eq!(first.id, second.id);
    let attempts = coordinator.list_attempts(&actor, &fixture.exam.id).await.expect("list");
    assert_eq!(attempts.len(), 1);
}

#[tokio::test]
async fn concurrent_starts_create_a_single_attempt() {
    let coordinator = Arc::new(coordinator());
    let fixture = open_exam(&coordinator, false).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coordinator = coordinator.clone();
        let exam_id = fixture.exam.id.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .start_attempt(&student("student-1"), &exam_id, "student-1", T + Duration::minutes(1))
                .await
                .expect("start")
                .id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.expect("join"));
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn start_requires_active_enrollment_and_availability() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;

    let err = coordinator
        .start_attempt(&student("student-2"), &fixture.exam.id, "student-2", T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = coordinator
        .start_attempt(&student("student-1"), &fixture.exam.id, "student-1", T - Duration::minutes(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let err = coordinator
        .start_attempt(&student("student-1"), &fixture.exam.id, "student-2", T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    coordinator
        .unenroll(&teacher(), &fixture.exam.id, "student-1", T)
        .await
        .expect("suspend");
    let err = coordinator
        .start_attempt(&student("student-1"), &fixture.exam.id, "student-1", T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}

#[tokio::test]
async fn single_choice_is_auto_graded_on_submit() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;
    let actor = student("student-1");

    let attempt = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");
    coordinator
        .save_answer(&actor, &attempt.id, &fixture.choice_id, "Paris", T + Duration::minutes(1))
        .await
        .expect("save");

    let submitted = coordinator
        .submit_attempt(&actor, &attempt.id, T + Duration::minutes(2))
        .await
        .expect("submit");
    assert_eq!(submitted.status, AttemptStatus::Submitted);
    assert_eq!(submitted.score, 10.0);
    assert!(submitted.fully_graded);

    let err = coordinator
        .save_answer(&actor, &attempt.id, &fixture.choice_id, "Lyon", T + Duration::minutes(3))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    let err = coordinator
        .submit_attempt(&actor, &attempt.id, T + Duration::minutes(3))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}

#[tokio::test]
async fn sweep_expires_overdue_attempt_and_grades_saved_answers() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;
    let actor = student("student-1");

    let attempt = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");
    coordinator
        .save_answer(&actor, &attempt.id, &fixture.choice_id, "Paris", T + Duration::minutes(5))
        .await
        .expect("save");

    let before_deadline = expire_overdue_attempts(&coordinator, T + Duration::minutes(10))
        .await
        .expect("sweep");
    assert_eq!(before_deadline.expired, 0);

    let report = expire_overdue_attempts(&coordinator, T + Duration::minutes(31))
        .await
        .expect("sweep");
    assert_eq!(report.expired, 1);
    assert_eq!(report.failed, 0);

    let stored = coordinator
        .store()
        .attempts
        .find_by_id(&attempt.id)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(stored.status, AttemptStatus::Expired);
    assert_eq!(stored.finished_at, Some(T + Duration::minutes(30)));
    assert_eq!(stored.score, 10.0);

    let again = expire_overdue_attempts(&coordinator, T + Duration::minutes(40))
        .await
        .expect("sweep");
    assert_eq!(again.expired, 0);
}

#[tokio::test]
async fn late_save_persists_expiry_and_rejects_write() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;
    let actor = student("student-1");

    let attempt = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");
    let err = coordinator
        .save_answer(&actor, &attempt.id, &fixture.choice_id, "Paris", T + Duration::minutes(30))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let stored = coordinator
        .store()
        .attempts
        .find_by_id(&attempt.id)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(stored.status, AttemptStatus::Expired);
    assert!(stored.answers.is_empty());
}

#[tokio::test]
async fn processes_sharing_a_store_cannot_overwrite_each_other() {
    let store = Store::in_memory();
    let api = ExamCoordinator::new(store.clone());
    let worker = ExamCoordinator::new(store.clone());
    let fixture = open_exam(&api, false).await;
    let actor = student("student-1");
    let attempt = api
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");
    let deadline = attempt.expires_at;

    // Sweep loaded the attempt, then the API saved an answer before the sweep wrote back.
    let mut swept = store.attempts.find_by_id(&attempt.id).await.expect("find").expect("present");
    api.save_answer(&actor, &attempt.id, &fixture.choice_id, "Paris", deadline - Duration::seconds(1))
        .await
        .expect("save before deadline");
    assert!(swept.expire_if_overdue(&fixture.exam, deadline + Duration::seconds(1)));
    let err = store.attempts.save(&mut swept).await.unwrap_err();
    assert!(matches!(err, crate::repositories::StoreError::RevisionConflict { .. }));

    let stored = store.attempts.find_by_id(&attempt.id).await.expect("find").expect("present");
    assert_eq!(stored.status, AttemptStatus::InProgress);
    assert_eq!(stored.answers.len(), 1);

    // The next sweep pass reloads and expires with the saved answer graded.
    let expired = worker
        .expire_if_overdue(&attempt.id, deadline + Duration::seconds(2))
        .await
        .expect("sweep");
    assert_eq!(expired.status, AttemptStatus::Expired);
    assert_eq!(expired.score, 10.0);

    // A stale in-progress copy can no longer resurrect the expired attempt.
    let mut stale = stored;
    stale
        .save_answer(&fixture.exam, &fixture.choice_id, "Lyon", deadline - Duration::seconds(1))
        .expect("domain accepts the stale copy");
    let err = DomainError::from(store.attempts.save(&mut stale).await.unwrap_err());
    assert!(matches!(err, DomainError::Conflict(_)));

    let stored = store.attempts.find_by_id(&attempt.id).await.expect("find").expect("present");
    assert_eq!(stored.status, AttemptStatus::Expired);
    assert_eq!(stored.score, 10.0);
}

#[tokio::test]
async fn save_racing_submit_never_mixes_state() {
    let coordinator = Arc::new(coordinator());
    let fixture = open_exam(&coordinator, false).await;
    let actor = student("student-1");
    let attempt = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");

    let saver = {
        let coordinator = coordinator.clone();
        let attempt_id = attempt.id.clone();
        let question_id = fixture.choice_id.clone();
        tokio::spawn(async move {
            coordinator
                .save_answer(&student("student-1"), &attempt_id, &question_id, "Paris", T)
                .await
                .is_ok()
        })
    };
    let submitter = {
        let coordinator = coordinator.clone();
        let attempt_id = attempt.id.clone();
        tokio::spawn(async move {
            coordinator
                .submit_attempt(&student("student-1"), &attempt_id, T)
                .await
                .expect("submit")
        })
    };

    let saved = saver.await.expect("join");
    submitter.await.expect("join");

    let stored = coordinator
        .store()
        .attempts
        .find_by_id(&attempt.id)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(stored.status, AttemptStatus::Submitted);
    if saved {
        assert_eq!(stored.score, 10.0);
        assert!(stored.answers.iter().all(|answer| answer.graded));
    } else {
        assert!(stored.answers.is_empty());
        assert_eq!(stored.score, 0.0);
    }
}

#[tokio::test]
async fn publication_waits_for_missing_open_answer_grade() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, true).await;
    let actor = student("student-1");
    let open_id = fixture.open_id.clone().expect("open question");

    let attempt = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");
    coordinator
        .submit_attempt(&actor, &attempt.id, T + Duration::minutes(1))
        .await
        .expect("submit");

    let err = coordinator
        .student_note_detail(&actor, &fixture.exam.id, "student-1")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let err = coordinator
        .publish_grades(&teacher(), &fixture.exam.id, None, T + Duration::hours(3))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UngradedAnswers(1)));

    let pending = coordinator.pending_grading(&teacher(), &fixture.exam.id).await.expect("queue");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].ungraded_question_ids, vec![open_id.clone()]);

    coordinator
        .manual_grade(
            &teacher(),
            &attempt.id,
            ManualGrade { question_id: open_id, points: 0.0, comment: Some("no answer".into()) },
            T + Duration::hours(3),
        )
        .await
        .expect("grade");

    let publication = coordinator
        .publish_grades(&teacher(), &fixture.exam.id, Some("Final".into()), T + Duration::hours(4))
        .await
        .expect("publish");
    assert!(publication.published);

    let grade = coordinator
        .student_note_detail(&actor, &fixture.exam.id, "student-1")
        .await
        .expect("detail");
    assert_eq!(grade.attempt.id, attempt.id);
    assert_eq!(grade.publication.message.as_deref(), Some("Final"));

    let err = coordinator
        .student_note_detail(&student("student-2"), &fixture.exam.id, "student-1")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    coordinator
        .unpublish_grades(&teacher(), &fixture.exam.id, T + Duration::hours(5))
        .await
        .expect("withdraw");
    assert!(coordinator
        .student_note_detail(&actor, &fixture.exam.id, "student-1")
        .await
        .is_err());
}

#[tokio::test]
async fn published_grades_stay_gated_on_later_submissions_and_grade_changes() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, true).await;
    let open_id = fixture.open_id.clone().expect("open question");
    coordinator
        .enroll(&teacher(), &fixture.exam.id, "student-2", T)
        .await
        .expect("enroll second student");

    let first = coordinator
        .start_attempt(&student("student-1"), &fixture.exam.id, "student-1", T)
        .await
        .expect("start first");
    coordinator
        .submit_attempt(&student("student-1"), &first.id, T + Duration::minutes(5))
        .await
        .expect("submit first");
    coordinator
        .manual_grade(
            &teacher(),
            &first.id,
            ManualGrade { question_id: open_id.clone(), points: 4.0, comment: None },
            T + Duration::minutes(10),
        )
        .await
        .expect("grade first");

    let second = coordinator
        .start_attempt(&student("student-2"), &fixture.exam.id, "student-2", T)
        .await
        .expect("start second");
    coordinator
        .publish_grades(&teacher(), &fixture.exam.id, None, T + Duration::minutes(15))
        .await
        .expect("publish while second attempt runs");

    coordinator
        .submit_attempt(&student("student-2"), &second.id, T + Duration::minutes(20))
        .await
        .expect("submit second");
    let err = coordinator
        .student_note_detail(&student("student-2"), &fixture.exam.id, "student-2")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let err = coordinator
        .revoke_grade(&teacher(), &first.id, &open_id, T + Duration::minutes(25))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    let err = coordinator
        .manual_grade(
            &teacher(),
            &second.id,
            ManualGrade { question_id: open_id.clone(), points: 1.0, comment: None },
            T + Duration::minutes(25),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let grade = coordinator
        .student_note_detail(&student("student-1"), &fixture.exam.id, "student-1")
        .await
        .expect("first student still sees the published grade");
    assert!(grade.attempt.fully_graded);
    assert_eq!(grade.attempt.score, 4.0);

    coordinator
        .unpublish_grades(&teacher(), &fixture.exam.id, T + Duration::minutes(30))
        .await
        .expect("withdraw");
    coordinator
        .manual_grade(
            &teacher(),
            &second.id,
            ManualGrade { question_id: open_id, points: 1.0, comment: None },
            T + Duration::minutes(35),
        )
        .await
        .expect("grade second after withdrawal");
    coordinator
        .publish_grades(&teacher(), &fixture.exam.id, None, T + Duration::minutes(40))
        .await
        .expect("republish");
    let grade = coordinator
        .student_note_detail(&student("student-2"), &fixture.exam.id, "student-2")
        .await
        .expect("second student sees the grade");
    assert_eq!(grade.attempt.score, 1.0);
}

#[tokio::test]
async fn grading_is_creator_only_and_requires_finished_attempt() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, true).await;
    let open_id = fixture.open_id.clone().expect("open question");
    let attempt = coordinator
        .start_attempt(&student("student-1"), &fixture.exam.id, "student-1", T)
        .await
        .expect("start");

    let grade = ManualGrade { question_id: open_id.clone(), points: 2.0, comment: None };
    let err = coordinator
        .manual_grade(&teacher(), &attempt.id, grade.clone(), T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let err = coordinator
        .attempt_for_grading(&teacher(), &attempt.id, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    coordinator
        .submit_attempt(&student("student-1"), &attempt.id, T)
        .await
        .expect("submit");

    let err = coordinator
        .manual_grade(&other_teacher(), &attempt.id, grade.clone(), T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let too_high = ManualGrade { question_id: open_id.clone(), points: 6.0, comment: None };
    let err = coordinator
        .manual_grade(&teacher(), &attempt.id, too_high, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));

    coordinator.manual_grade(&teacher(), &attempt.id, grade, T).await.expect("grade");
    let snapshot = coordinator
        .attempt_for_grading(&teacher(), &attempt.id, T)
        .await
        .expect("detail");
    assert_eq!(snapshot.attempt.score, 2.0);

    let revoked = coordinator
        .revoke_grade(&teacher(), &attempt.id, &open_id, T)
        .await
        .expect("revoke");
    assert_eq!(revoked.score, 0.0);
    assert!(!revoked.fully_graded);
}

#[tokio::test]
async fn bulk_grading_rejects_whole_batch_on_invalid_entry() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, true).await;
    let open_id = fixture.open_id.clone().expect("open question");
    let actor = student("student-1");
    let attempt = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");
    coordinator
        .save_answer(&actor, &attempt.id, &fixture.choice_id, "Paris", T)
        .await
        .expect("save");
    coordinator.submit_attempt(&actor, &attempt.id, T).await.expect("submit");

    let batch = vec![
        ManualGrade { question_id: open_id.clone(), points: 3.0, comment: None },
        ManualGrade { question_id: fixture.choice_id.clone(), points: 1.0, comment: None },
    ];
    assert!(coordinator.grade_all(&teacher(), &attempt.id, batch, T).await.is_err());

    let stored = coordinator
        .store()
        .attempts
        .find_by_id(&attempt.id)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(stored.score, 10.0);

    let batch = vec![ManualGrade { question_id: open_id, points: 3.0, comment: None }];
    let graded = coordinator.grade_all(&teacher(), &attempt.id, batch, T).await.expect("bulk");
    assert_eq!(graded.score, 13.0);

    let results = coordinator.exam_results(&teacher(), &fixture.exam.id).await.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score, 13.0);
    assert_eq!(results[0].total_points, 15.0);
    assert!(results[0].fully_graded);
}

#[tokio::test]
async fn attempt_limit_allows_retry_only_when_configured() {
    let coordinator = coordinator();
    let author = teacher();
    let exam = coordinator
        .create_exam(&author, "Retryable", None, T - Duration::hours(1))
        .await
        .expect("create");
    coordinator
        .update_exam(
            &author,
            &exam.id,
            ExamDetailsUpdate { max_attempts: Some(2), ..Default::default() },
            T - Duration::hours(1),
        )
        .await
        .expect("update");
    coordinator
        .schedule_exam(&author, &exam.id, T, T + Duration::hours(4), 30, T - Duration::hours(1))
        .await
        .expect("schedule");
    coordinator
        .add_open_question(&author, &exam.id, "Explain", 1.0, T - Duration::hours(1))
        .await
        .expect("question");
    coordinator.enroll(&author, &exam.id, "student-1", T).await.expect("enroll");
    coordinator.open_exam(&author, &exam.id, T).await.expect("open");

    let actor = student("student-1");
    let first = coordinator.start_attempt(&actor, &exam.id, "student-1", T).await.expect("first");
    coordinator.submit_attempt(&actor, &first.id, T).await.expect("submit");

    let second = coordinator
        .start_attempt(&actor, &exam.id, "student-1", T + Duration::minutes(5))
        .await
        .expect("second");
    assert_ne!(first.id, second.id);
    assert_eq!(second.attempt_number, 2);

    // Overdue second attempt is expired on the next start, then the limit applies.
    let err = coordinator
        .start_attempt(&actor, &exam.id, "student-1", T + Duration::minutes(50))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    let attempts = coordinator.list_attempts(&actor, &exam.id).await.expect("list");
    assert!(attempts.iter().all(|attempt| attempt.status.is_terminal()));
}

#[tokio::test]
async fn authoring_is_restricted_to_creator_and_draft() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;

    let err = coordinator
        .add_open_question(&teacher(), &fixture.exam.id, "Late", 1.0, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let err = coordinator
        .add_open_question(&teacher(), &fixture.exam.id, "", 0.0, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    let err = coordinator
        .add_choice_question(
            &teacher(),
            &fixture.exam.id,
            "Only one option",
            1.0,
            ChoiceType::Single,
            None,
            vec![OptionDraft { label: "Alone".into(), is_correct: true }],
            T,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let err = coordinator
        .close_exam(&other_teacher(), &fixture.exam.id, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = coordinator
        .create_exam(&student("student-1"), "Mine", None, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = coordinator.delete_exam(&teacher(), &fixture.exam.id).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let closed = coordinator.close_exam(&teacher(), &fixture.exam.id, T).await.expect("close");
    assert_eq!(closed.status, ExamStatus::Closed);
    let err = coordinator
        .revert_to_draft(&teacher(), &fixture.exam.id, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}

#[tokio::test]
async fn open_reports_readiness_violations() {
    let coordinator = coordinator();
    let exam = coordinator
        .create_exam(&teacher(), "Unscheduled", None, T)
        .await
        .expect("create");

    let violations = coordinator.readiness(&teacher(), &exam.id, T).await.expect("readiness");
    assert!(!violations.is_empty());

    let err = coordinator.open_exam(&teacher(), &exam.id, T).await.unwrap_err();
    assert!(matches!(err, DomainError::NotReady(_)));

    coordinator.delete_exam(&teacher(), &exam.id).await.expect("delete");
    assert!(matches!(
        coordinator.get_exam(&teacher(), &exam.id).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn duplicate_enrollment_conflicts_and_listing_scopes_by_role() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;

    let err = coordinator
        .enroll(&teacher(), &fixture.exam.id, "student-1", T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let admin = Actor { id: "admin".into(), role: UserRole::Admin };
    coordinator.enroll(&admin, &fixture.exam.id, "student-3", T).await.expect("admin enroll");
    let enrollments =
        coordinator.list_enrollments(&teacher(), &fixture.exam.id).await.expect("list");
    assert_eq!(enrollments.len(), 2);

    assert_eq!(coordinator.list_exams(&student("student-1")).await.expect("list").len(), 1);
    assert!(coordinator.list_exams(&student("student-9")).await.expect("list").is_empty());
    assert!(coordinator.list_exams(&other_teacher()).await.expect("list").is_empty());
    assert_eq!(coordinator.list_exams(&admin).await.expect("list").len(), 1);
}

#[tokio::test]
async fn resume_view_expires_overdue_attempt() {
    let coordinator = coordinator();
    let fixture = open_exam(&coordinator, false).await;
    let actor = student("student-1");
    let attempt = coordinator
        .start_attempt(&actor, &fixture.exam.id, "student-1", T)
        .await
        .expect("start");

    let live = coordinator
        .get_attempt(&actor, &attempt.id, T + Duration::minutes(10))
        .await
        .expect("view");
    assert_eq!(live.remaining_seconds, 20 * 60);
    assert_eq!(live.attempt.status, AttemptStatus::InProgress);

    let late = coordinator
        .get_attempt(&actor, &attempt.id, T + Duration::minutes(45))
        .await
        .expect("view");
    assert_eq!(late.remaining_seconds, 0);
    assert_eq!(late.attempt.status, AttemptStatus::Expired);

    let err = coordinator
        .get_attempt(&student("student-2"), &attempt.id, T)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
}

#[tokio::test]
async fn window_sync_opens_ready_and_closes_ended_exams() {
    let coordinator = coordinator();
    let author = teacher();
    let exam = coordinator
        .create_exam(&author, "Auto", None, T - Duration::hours(2))
        .await
        .expect("create");
    coordinator
        .schedule_exam(&author, &exam.id, T, T + Duration::hours(1), 30, T - Duration::hours(2))
        .await
        .expect("schedule");
    coordinator
        .add_open_question(&author, &exam.id, "Explain", 1.0, T - Duration::hours(2))
        .await
        .expect("question");
    coordinator.mark_ready(&author, &exam.id, T - Duration::hours(2)).await.expect("ready");

    let early = coordinator
        .sync_exam_window(&exam.id, T - Duration::minutes(1))
        .await
        .expect("sync");
    assert_eq!(early, WindowTransition::Unchanged);

    let opened = coordinator.sync_exam_window(&exam.id, T).await.expect("sync");
    assert_eq!(opened, WindowTransition::Opened);

    let closed = coordinator
        .sync_exam_window(&exam.id, T + Duration::hours(1) + Duration::seconds(1))
        .await
        .expect("sync");
    assert_eq!(closed, WindowTransition::Closed);
    let stored = coordinator.get_exam(&author, &exam.id).await.expect("exam");
    assert_eq!(stored.status, ExamStatus::Closed);
}
