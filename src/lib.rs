//! Library definition for mergesplit.
pub mod buffers;
pub mod chain;
pub mod config;
pub mod constraints;
pub mod graph;
pub mod init;
pub mod partition;
pub mod spanning_tree;
pub mod stats;
