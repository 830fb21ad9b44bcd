//! Outcome learning: feedback, threshold recalibration and pattern folding.

pub mod feedback;
pub mod learner;
pub mod policy;
pub mod report;

pub use feedback::{Feedback, FeedbackMap};
pub use learner::{fold_execution, fold_rejection};
pub use policy::LearningPolicy;
pub use report::{LearningReport, ThresholdAdjustment};
