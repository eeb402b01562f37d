//! Progressive Monte Carlo path tracer with interchangeable CPU and GPU
//! backends.

pub mod aabb;
pub mod bvh;
pub mod camera;
pub mod config;
pub mod cpu;
pub mod error;
pub mod gpu;
pub mod integrator;
pub mod light;
pub mod material;
pub mod onb;
pub mod primitive;
pub mod ray;
pub mod render_io;
pub mod renderer;
pub mod sampling;
pub mod scene;
pub mod scenes;
pub mod session;
pub mod vec3;

pub use camera::Camera;
pub use config::{Filter, RenderConfig, RenderMode, RenderOptions};
pub use error::{ConfigError, RenderError};
pub use renderer::{create_renderer, Backend, Renderer, Rgba};
pub use scene::{Hit, Scene, SceneSnapshot};
pub use session::RenderSession;
