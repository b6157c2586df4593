//! Repository module - data access layer.

mod category_repository;
mod vk_repository;

pub use category_repository::CategoryRepository;
pub use vk_repository::{LinkOutcome, VkRepository};
