use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::renderer::Backend;
use crate::sampling::truncated_gaussian_disk;

/// What a render pass writes into the accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Surface normals through the pixel center, overwritten each call.
    Normals,
    /// Acceleration-structure nodes and primitives visited by the pixel-center
    /// ray, overwritten each call. CPU only.
    Complexity,
    #[default]
    PathTrace,
}

impl RenderMode {
    /// Modes that write one pass with weight 1 instead of accumulating.
    pub fn overwrites(self) -> bool {
        matches!(self, Self::Normals | Self::Complexity)
    }
}

impl FromStr for RenderMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normals" | "normal" => Ok(Self::Normals),
            "complexity" | "heat" => Ok(Self::Complexity),
            "pathtrace" | "pt" => Ok(Self::PathTrace),
            _ => Err(()),
        }
    }
}

/// Pixel reconstruction filter, sampled to place each camera ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter {
    /// Uniform over the pixel square.
    Box,
    /// Weight `exp(-falloff * r^2)` for `r <= width`, in pixels from the
    /// pixel center.
    Gaussian { width: f32, falloff: f32 },
}

impl Default for Filter {
    fn default() -> Self {
        Self::Gaussian { width: 0.75, falloff: 1.0 }
    }
}

impl Filter {
    /// Offset from the pixel center for the uniform pair `(u1, u2)`.
    pub fn offset(self, u1: f32, u2: f32) -> (f32, f32) {
        match self {
            Self::Box => (u1 - 0.5, u2 - 0.5),
            Self::Gaussian { width, falloff } => truncated_gaussian_disk(width, falloff, u1, u2),
        }
    }
}

impl FromStr for Filter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "box" => Ok(Self::Box),
            "gaussian" | "gauss" => Ok(Self::default()),
            _ => Err(()),
        }
    }
}

/// Per-call kernel options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    pub mode: RenderMode,
    pub max_depth: u32,
    /// Passes per `render` call. Ignored by modes that overwrite.
    pub samples_per_pixel: u32,
    pub seed: u32,
    /// Component-wise upper bound on a single path's radiance.
    pub clamp: f32,
    pub filter: Filter,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::PathTrace,
            max_depth: 4,
            samples_per_pixel: 1,
            seed: 0,
            clamp: f32::MAX,
            filter: Filter::default(),
        }
    }
}

/// Settings for the demo binary.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub samples_per_frame: u32,
    pub max_samples: u32,
    pub exposure: f32,
    pub backend: Backend,
    pub bvh: bool,
    pub scene: String,
    pub output: PathBuf,
    pub options: RenderOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 256,
            samples_per_frame: 16,
            max_samples: 64,
            exposure: 1.0,
            backend: Backend::Cpu,
            bvh: true,
            scene: "spheres".to_string(),
            output: PathBuf::from("output.png"),
            options: RenderOptions::default(),
        }
    }
}

/// Set any field to `Some(value)` to override the defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub samples_per_pixel: Option<u32>,
    pub max_depth: Option<u32>,
    pub exposure: Option<f32>,
    pub seed: Option<u32>,
    pub clamp: Option<f32>,
    pub backend: Option<Backend>,
    pub mode: Option<RenderMode>,
    pub filter: Option<Filter>,
    pub bvh: Option<bool>,
    pub scene: Option<String>,
    pub output: Option<PathBuf>,
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl RenderOverrides {
    /// Parses `-key=value` flags and an optional positional scene name.
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut o = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            let Some(flag) = arg.strip_prefix('-') else {
                o.scene = Some(arg.to_string());
                continue;
            };
            let Some((key, value)) = flag.split_once('=') else {
                return Err(ConfigError::UnknownOption(arg.to_string()));
            };
            match key {
                "spp" => o.samples_per_pixel = Some(parse_value(key, value)?),
                "width" => o.width = Some(parse_value(key, value)?),
                "height" => o.height = Some(parse_value(key, value)?),
                "maxdepth" => o.max_depth = Some(parse_value(key, value)?),
                "exposure" => o.exposure = Some(parse_value(key, value)?),
                "seed" => o.seed = Some(parse_value(key, value)?),
                "clamp" => o.clamp = Some(parse_value(key, value)?),
                "backend" => o.backend = Some(parse_value(key, value)?),
                "mode" => o.mode = Some(parse_value(key, value)?),
                "filter" => o.filter = Some(parse_value(key, value)?),
                "accel" => {
                    o.bvh = Some(match value {
                        "bvh" => true,
                        "linear" | "none" => false,
                        _ => return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        }),
                    })
                }
                "out" => o.output = Some(PathBuf::from(value)),
                _ => return Err(ConfigError::UnknownOption(arg.to_string())),
            }
        }
        Ok(o)
    }

    pub fn apply(&self, config: &mut RenderConfig) {
        if let Some(value) = self.width {
            config.width = value;
        }
        if let Some(value) = self.height {
            config.height = value;
        }
        if let Some(value) = self.samples_per_pixel {
            config.max_samples = value;
        }
        if let Some(value) = self.max_depth {
            config.options.max_depth = value;
        }
        if let Some(value) = self.exposure {
            config.exposure = value;
        }
        if let Some(value) = self.seed {
            config.options.seed = value;
        }
        if let Some(value) = self.clamp {
            config.options.clamp = value;
        }
        if let Some(value) = self.backend {
            config.backend = value;
        }
        if let Some(value) = self.mode {
            config.options.mode = value;
        }
        if let Some(value) = self.filter {
            config.options.filter = value;
        }
        if let Some(value) = self.bvh {
            config.bvh = value;
        }
        if let Some(value) = &self.scene {
            config.scene = value.clone();
        }
        if let Some(value) = &self.output {
            config.output = value.clone();
        }
    }
}

impl RenderConfig {
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        RenderOverrides::parse(args)?.apply(&mut config);
        Ok(config)
    }
}
