pub mod completion;
pub mod content_sampler;
pub mod drive_client;
pub mod folder_resolver;
pub mod ownership_tree;
pub mod plan_executor;
pub mod prompt_builder;
pub mod storage;
pub mod suggestion_client;
