//! Integration tests for model composition and global fits

mod common;

// Composing catalog models and applying them to datasets
mod composition_tests;

// Fits over several datasets with links
mod global_fit_tests;

// Pre-solve rejections and solver failures
mod failure_tests;
