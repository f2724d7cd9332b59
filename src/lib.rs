//! vtfbatch - batch VTF texture converter
//!
//! Plans folder batches (optionally driven by TextMax rule files), runs each
//! job through ImageMagick and VTFCmd, and compiles skyboxes with vtex.

pub mod batch;
pub mod config;
pub mod executor;
pub mod hash;
pub mod job;
pub mod paths;
pub mod planner;
pub mod resolver;
pub mod skybox;
pub mod textmax;
pub mod textures;
pub mod tools;
pub mod vmt;
