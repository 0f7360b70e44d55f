mod create;
mod list;
mod manage;

pub(super) use create::{add_question, create_exam};
pub(super) use list::{
    exam_results, list_attempts, list_enrollments, list_exams, my_grade, pending_grading,
};
pub(super) use manage::{
    close_exam, delete_exam, enroll_student, get_exam, mark_ready, open_exam, publication_status,
    publish_grades, readiness, remove_question, revert_to_draft, schedule_exam, unenroll_student,
    unpublish_grades, update_exam,
};
