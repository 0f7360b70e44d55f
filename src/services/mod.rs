pub(crate) mod attempt_engine;
pub(crate) mod auto_grading;
pub(crate) mod coordinator;
pub(crate) mod errors;
pub(crate) mod exam_lifecycle;
pub(crate) mod locks;
pub(crate) mod publication;
pub(crate) mod question_bank;
pub(crate) mod work_timing;
