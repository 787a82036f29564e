pub mod resume;
pub mod run;
pub mod summarize;
pub mod target;
