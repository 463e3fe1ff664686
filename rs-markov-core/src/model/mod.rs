//! Top-level module for the n-gram text model.
//!
//! This module provides:
//! - The prefix tree (`Tree`) and its nodes (`Node`)
//! - The model owning the tree and its bookkeeping (`Model`)
//! - Training from tokens, sentences or raw text
//! - Read-only probability and completion queries
//! - Sentence and token generation (`Generator`)

/// Settings of a model, with defaults and validation.
pub mod config;

/// Sequence and sentence sampling over a trained model.
///
/// Holds dead-end recovery, sentence validation and duplicate avoidance.
pub mod generator;

/// The model: tree policy, bookkeeping, merging and snapshots.
pub mod markov_model;

/// Prefix-tree node and node ids.
pub mod node;

/// Probability and completion lookups.
mod query;

/// Window insertion from token and sentence streams.
mod trainer;

/// Arena-backed prefix tree.
///
/// Handles create-or-increment insertion, lookups, weighted selection
/// and the textual dump.
pub mod tree;
