//! Database access for crp-server
//!
//! One module per entity family. All functions are plain async queries over
//! the shared pool; table layout is hidden behind these modules.

pub mod activity;
pub mod clusters;
pub mod courses;
pub mod departments;
pub mod mappings;
pub mod provenance;
pub mod semesters;
pub mod syllabus;
pub mod text_items;
