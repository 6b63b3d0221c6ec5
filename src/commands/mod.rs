pub mod organize_commands;
pub mod organize_pipeline;
pub mod report_commands;
