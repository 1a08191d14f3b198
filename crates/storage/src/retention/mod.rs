//! Version retention
//!
//! Deleted features leave tombstones, and every write leaves a version.
//! Both are pruned per feature according to the space's [`RetentionPolicy`].

mod policy;

pub use policy::RetentionPolicy;
