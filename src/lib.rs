#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]

pub mod client;
pub mod datatype;
pub mod errors;
pub mod provider;
pub mod resource;
pub mod time;
pub mod transport;
mod utils;

pub use crate::client::{BucketFilter, MinioTemplate, SaveOutcome};
pub use crate::datatype::{BucketData, ItemData, MetaData, StatusData};
pub use crate::resource::{ContentResource, ResolveStrategy, ResourceLoader};
