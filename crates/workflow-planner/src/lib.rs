#![doc = include_str!("../README.md")]

pub mod allocator;
pub mod audit;
pub mod cluster;
pub mod config;
pub mod cost_model;
pub mod dag;
pub mod error;
pub mod file_item;
pub mod plan_stats;
pub mod planner;
pub mod planner_resolver;
pub mod planners;
pub mod rank;
pub mod task;
pub mod timeline;
pub mod vm;
pub mod vm_selector;
