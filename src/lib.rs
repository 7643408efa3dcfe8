//! # ucp-analytics
//!
//! Commerce analytics for Universal Commerce Protocol traffic.
//!
//! Classifies observed request/response pairs (REST, MCP, A2A) into
//! semantic commerce events, extracts checkout/order/payment fields from
//! their JSON bodies, and batches the resulting rows into a warehouse
//! sink (Postgres via sqlx, or anything implementing [`sink::Sink`]).

pub mod classify;
pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod sink;
pub mod telemetry;
pub mod tracker;
pub mod writer;
