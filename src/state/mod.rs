/// State management module
///
/// This module handles all session state:
/// - Shared data structures (data.rs)
/// - Layout settings (edit.rs)
/// - The in-memory photo list, selection and arrange commands (library.rs)
/// - Per-photo async transform queues (editor.rs)
/// - Persisted preferences such as API keys (preferences.rs)

pub mod data;
pub mod edit;
pub mod editor;
pub mod library;
pub mod preferences;
