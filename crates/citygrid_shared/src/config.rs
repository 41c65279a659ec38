use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::anchor::Footprint;
use crate::candidate::{BiomeFilter, GridSelector, SelectorEntry, StructureCatalog};
use crate::city::CityParams;
use crate::coords::RegionSize;
use crate::embed::EmbedLimits;
use crate::heightmap::VerticalBounds;
use crate::planner::PlannerSettings;
use crate::random::name_salt;
use crate::surface::SurfaceParams;

pub const DEFAULT_WORLD_SEED: i64 = 0x00C1_7760_51D5;

const MAX_RELAXATION_PASSES: u32 = 64;
const MAX_APRON_INSET: usize = 8;
const MAX_COLUMN_MOVE: u32 = 128;
const MAX_RADIUS: u32 = 64;

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    InvalidRegionSize { owner: String, value: i64 },
    InvalidFootprint { structure: String, width: i32, depth: i32 },
    DuplicateStructure { name: String },
    DuplicateSelector { name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::InvalidRegionSize { owner, value } => {
                write!(f, "region size of {owner} must be positive, got {value}")
            }
            Self::InvalidFootprint {
                structure,
                width,
                depth,
            } => write!(
                f,
                "structure '{structure}' has a non-positive footprint {width}x{depth}"
            ),
            Self::DuplicateStructure { name } => write!(f, "structure '{name}' is defined twice"),
            Self::DuplicateSelector { name } => write!(f, "selector '{name}' is defined twice"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedValue {
    Number(i64),
    Text(String),
}

impl SeedValue {
    pub fn resolve(&self) -> i64 {
        match self {
            Self::Number(seed) => *seed,
            Self::Text(text) => {
                let trimmed = text.trim();
                trimmed.parse::<i64>().unwrap_or_else(|_| name_salt(trimmed))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityGenConfig {
    #[serde(default = "default_world_seed")]
    pub world_seed: SeedValue,
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub embed: EmbedConfig,
    #[serde(default)]
    pub city: CityConfig,
    #[serde(default)]
    pub structures: Vec<StructureConfig>,
    #[serde(default)]
    pub selectors: Vec<SelectorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    #[serde(default = "default_min_height")]
    pub min_height: i32,
    #[serde(default = "default_max_height")]
    pub max_height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_max_step")]
    pub max_step: i32,
    #[serde(default = "default_relaxation_passes")]
    pub relaxation_passes: u32,
    #[serde(default = "default_terrain_blend")]
    pub terrain_blend: f64,
    #[serde(default = "default_street_plateau_blend")]
    pub street_plateau_blend: f64,
    #[serde(default = "default_apron_inset")]
    pub apron_inset: usize,
    #[serde(default = "default_apron_max_drop")]
    pub apron_max_drop: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    #[serde(default = "default_max_raise")]
    pub max_raise: u32,
    #[serde(default = "default_max_lower")]
    pub max_lower: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    #[serde(default = "default_region_size")]
    pub region_size: i64,
    #[serde(default = "default_city_chance")]
    pub city_chance: f64,
    #[serde(default = "default_min_radius")]
    pub min_radius: u32,
    #[serde(default = "default_max_radius")]
    pub max_radius: u32,
    #[serde(default = "default_ground_base")]
    pub ground_base: i32,
    #[serde(default = "default_level_step")]
    pub level_step: i32,
    #[serde(default = "default_max_levels")]
    pub max_levels: i32,
    #[serde(default = "default_building_chance")]
    pub building_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    pub name: String,
    #[serde(default = "default_footprint_side")]
    pub width: i32,
    #[serde(default = "default_footprint_side")]
    pub depth: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub name: String,
    #[serde(default = "default_region_size")]
    pub region_size: i64,
    #[serde(default = "default_chance")]
    pub region_chance: f64,
    #[serde(default)]
    pub weight_none: u32,
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConfig {
    pub structure: String,
    #[serde(default = "default_weight")]
    pub weight: i32,
    #[serde(default = "default_chance")]
    pub chance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height_diff: Option<i32>,
    #[serde(default)]
    pub biomes: BiomeFilter,
}

impl Default for CityGenConfig {
    fn default() -> Self {
        Self {
            world_seed: default_world_seed(),
            terrain: TerrainConfig::default(),
            surface: SurfaceConfig::default(),
            embed: EmbedConfig::default(),
            city: CityConfig::default(),
            structures: Vec::new(),
            selectors: Vec::new(),
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            min_height: default_min_height(),
            max_height: default_max_height(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_step: default_max_step(),
            relaxation_passes: default_relaxation_passes(),
            terrain_blend: default_terrain_blend(),
            street_plateau_blend: default_street_plateau_blend(),
            apron_inset: default_apron_inset(),
            apron_max_drop: default_apron_max_drop(),
        }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            max_raise: default_max_raise(),
            max_lower: default_max_lower(),
        }
    }
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            region_size: default_region_size(),
            city_chance: default_city_chance(),
            min_radius: default_min_radius(),
            max_radius: default_max_radius(),
            ground_base: default_ground_base(),
            level_step: default_level_step(),
            max_levels: default_max_levels(),
            building_chance: default_building_chance(),
        }
    }
}

impl CityGenConfig {
    pub fn sanitize(mut self) -> Self {
        if self.terrain.max_height <= self.terrain.min_height {
            self.terrain.max_height = self.terrain.min_height + 1;
        }

        let surface = &mut self.surface;
        surface.max_step = surface.max_step.max(1);
        surface.relaxation_passes = surface.relaxation_passes.min(MAX_RELAXATION_PASSES);
        surface.terrain_blend = clamp_unit(surface.terrain_blend);
        surface.street_plateau_blend = clamp_unit(surface.street_plateau_blend);
        surface.apron_inset = surface.apron_inset.min(MAX_APRON_INSET);
        surface.apron_max_drop = surface.apron_max_drop.max(0);

        self.embed.max_raise = self.embed.max_raise.min(MAX_COLUMN_MOVE);
        self.embed.max_lower = self.embed.max_lower.min(MAX_COLUMN_MOVE);

        let city = &mut self.city;
        city.city_chance = clamp_unit(city.city_chance);
        city.building_chance = clamp_unit(city.building_chance);
        city.max_radius = city.max_radius.min(MAX_RADIUS);
        city.min_radius = city.min_radius.min(city.max_radius);
        city.level_step = city.level_step.max(1);
        city.max_levels = city.max_levels.max(0);

        for selector in &mut self.selectors {
            selector.region_chance = clamp_unit(selector.region_chance);
            for entry in &mut selector.entries {
                entry.chance = clamp_unit(entry.chance);
            }
        }
        self
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let parsed = toml::from_str::<Self>(contents).map_err(ConfigError::Parse)?;
        Ok(parsed.sanitize())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let config = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&config).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize config: {e}"),
            )
        })?;
        fs::write(path, serialized)
    }

    pub fn vertical_bounds(&self) -> VerticalBounds {
        VerticalBounds::new(self.terrain.min_height, self.terrain.max_height)
    }

    pub fn into_settings(self) -> Result<PlannerSettings, ConfigError> {
        let config = self.sanitize();

        let mut catalog = StructureCatalog::default();
        for structure in &config.structures {
            if catalog.contains(&structure.name) {
                return Err(ConfigError::DuplicateStructure {
                    name: structure.name.clone(),
                });
            }
            let footprint = Footprint::new(structure.width, structure.depth).ok_or_else(|| {
                ConfigError::InvalidFootprint {
                    structure: structure.name.clone(),
                    width: structure.width,
                    depth: structure.depth,
                }
            })?;
            catalog.insert(structure.name.clone(), footprint);
        }

        let mut seen = HashSet::new();
        let mut selectors = Vec::with_capacity(config.selectors.len());
        for selector in &config.selectors {
            if !seen.insert(selector.name.as_str()) {
                return Err(ConfigError::DuplicateSelector {
                    name: selector.name.clone(),
                });
            }
            let region_size = region_size(format!("selector '{}'", selector.name), selector.region_size)?;

            let mut grid = GridSelector::new(selector.name.clone(), region_size);
            grid.region_chance = selector.region_chance;
            grid.weight_none = selector.weight_none;
            for entry in &selector.entries {
                if !catalog.contains(&entry.structure) {
                    warn!(
                        "selector '{}' refers to unknown structure '{}'; it will never be placed",
                        selector.name, entry.structure
                    );
                }
                grid.entries.push(SelectorEntry {
                    structure: entry.structure.clone(),
                    weight: entry.weight,
                    chance: entry.chance,
                    max_height_diff: entry.max_height_diff,
                    biomes: entry.biomes.clone(),
                });
            }
            selectors.push(grid);
        }

        let city_config = &config.city;
        let mut city = CityParams::with_region_size(region_size("[city]".to_string(), city_config.region_size)?);
        city.city_chance = city_config.city_chance;
        city.min_radius = city_config.min_radius;
        city.max_radius = city_config.max_radius;
        city.ground_base = city_config.ground_base;
        city.level_step = city_config.level_step;
        city.max_levels = city_config.max_levels;
        city.building_chance = city_config.building_chance;

        let surface = &config.surface;
        Ok(PlannerSettings {
            world_seed: config.world_seed.resolve(),
            surface: SurfaceParams {
                max_step: surface.max_step,
                relaxation_passes: surface.relaxation_passes,
                terrain_blend: surface.terrain_blend,
                street_plateau_blend: surface.street_plateau_blend,
                apron_inset: surface.apron_inset,
                apron_max_drop: surface.apron_max_drop,
            },
            embed: EmbedLimits {
                max_raise: config.embed.max_raise,
                max_lower: config.embed.max_lower,
            },
            city,
            selectors,
            catalog,
        })
    }
}

fn region_size(owner: String, value: i64) -> Result<RegionSize, ConfigError> {
    u32::try_from(value)
        .ok()
        .and_then(RegionSize::new)
        .ok_or(ConfigError::InvalidRegionSize { owner, value })
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn default_world_seed() -> SeedValue {
    SeedValue::Number(DEFAULT_WORLD_SEED)
}

fn default_min_height() -> i32 {
    -64
}

fn default_max_height() -> i32 {
    320
}

fn default_max_step() -> i32 {
    1
}

fn default_relaxation_passes() -> u32 {
    8
}

fn default_terrain_blend() -> f64 {
    0.65
}

fn default_street_plateau_blend() -> f64 {
    0.7
}

fn default_apron_inset() -> usize {
    4
}

fn default_apron_max_drop() -> i32 {
    6
}

fn default_max_raise() -> u32 {
    8
}

fn default_max_lower() -> u32 {
    8
}

fn default_region_size() -> i64 {
    16
}

fn default_city_chance() -> f64 {
    0.5
}

fn default_min_radius() -> u32 {
    4
}

fn default_max_radius() -> u32 {
    8
}

fn default_ground_base() -> i32 {
    64
}

fn default_level_step() -> i32 {
    6
}

fn default_max_levels() -> i32 {
    4
}

fn default_building_chance() -> f64 {
    0.6
}

fn default_footprint_side() -> i32 {
    1
}

fn default_chance() -> f64 {
    1.0
}

fn default_weight() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::{CityGenConfig, ConfigError, SeedValue, DEFAULT_WORLD_SEED};
    use crate::anchor::Footprint;
    use crate::heightmap::BiomeId;
    use crate::surface::SurfaceParams;

    const SAMPLE: &str = r#"
world_seed = "harbor town"

[terrain]
min_height = 0
max_height = 256

[embed]
max_raise = 4
max_lower = 6

[city]
region_size = 20
city_chance = 0.75

[[structures]]
name = "kiosk"

[[structures]]
name = "hall"
width = 2
depth = 3

[[selectors]]
name = "downtown"
region_size = 8
weight_none = 2

[[selectors.entries]]
structure = "kiosk"
weight = 3

[[selectors.entries]]
structure = "hall"
chance = 0.5
max_height_diff = 6
biomes = { excluding = ["ocean", "swamp"] }
"#;

    #[test]
    fn empty_file_uses_defaults() {
        let config = CityGenConfig::parse("").expect("empty config parses");
        assert_eq!(config.world_seed, SeedValue::Number(DEFAULT_WORLD_SEED));
        let settings = config.into_settings().expect("defaults are valid");
        assert_eq!(settings.surface, SurfaceParams::default());
        assert_eq!(settings.city.region_size.get(), 16);
        assert!(settings.selectors.is_empty());
        assert!(settings.catalog.is_empty());
    }

    #[test]
    fn sample_config_builds_settings() {
        let config = CityGenConfig::parse(SAMPLE).expect("sample parses");
        assert_eq!(config.vertical_bounds().top(), 255);

        let settings = config.into_settings().expect("sample is valid");
        assert_eq!(settings.embed.max_raise, 4);
        assert_eq!(settings.city.region_size.get(), 20);
        assert_eq!(settings.city.city_chance, 0.75);
        assert_eq!(settings.catalog.footprint("kiosk"), Some(Footprint::Single));
        assert_eq!(
            settings.catalog.footprint("hall"),
            Some(Footprint::Multi { width: 2, depth: 3 })
        );

        let selector = &settings.selectors[0];
        assert_eq!(selector.region_size.get(), 8);
        assert_eq!(selector.weight_none, 2);
        assert_eq!(selector.entries.len(), 2);
        assert_eq!(selector.entries[1].max_height_diff, Some(6));
        assert_eq!(
            selector.entries[1].biomes.excluding,
            vec![BiomeId::new("ocean"), BiomeId::new("swamp")]
        );
    }

    #[test]
    fn seeds_accept_numbers_and_text() {
        assert_eq!(SeedValue::Number(-5).resolve(), -5);
        assert_eq!(SeedValue::Text(" 1234 ".to_string()).resolve(), 1234);
        let text = SeedValue::Text("harbor town".to_string());
        assert_eq!(text.resolve(), text.resolve());
        assert_ne!(text.resolve(), SeedValue::Text("harbor city".to_string()).resolve());
    }

    #[test]
    fn zero_region_size_is_fatal() {
        let config = CityGenConfig::parse("[[selectors]]\nname = \"a\"\nregion_size = 0\n")
            .expect("syntax is fine");
        assert!(matches!(
            config.into_settings(),
            Err(ConfigError::InvalidRegionSize { value: 0, .. })
        ));

        let config = CityGenConfig::parse("[city]\nregion_size = -4\n").expect("syntax is fine");
        assert!(matches!(
            config.into_settings(),
            Err(ConfigError::InvalidRegionSize { value: -4, .. })
        ));
    }

    #[test]
    fn non_positive_footprint_is_fatal() {
        let config = CityGenConfig::parse("[[structures]]\nname = \"pit\"\nwidth = 0\ndepth = 2\n")
            .expect("syntax is fine");
        assert!(matches!(
            config.into_settings(),
            Err(ConfigError::InvalidFootprint { width: 0, depth: 2, .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let config = CityGenConfig::parse(
            "[[structures]]\nname = \"kiosk\"\n\n[[structures]]\nname = \"kiosk\"\n",
        )
        .expect("syntax is fine");
        assert!(matches!(
            config.into_settings(),
            Err(ConfigError::DuplicateStructure { .. })
        ));
    }

    #[test]
    fn unknown_structure_reference_is_not_fatal() {
        let config = CityGenConfig::parse(
            "[[selectors]]\nname = \"a\"\n\n[[selectors.entries]]\nstructure = \"ghost\"\n",
        )
        .expect("syntax is fine");
        let settings = config.into_settings().expect("unknown names only warn");
        assert_eq!(settings.selectors[0].entries[0].structure, "ghost");
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut config = CityGenConfig::default();
        config.terrain.min_height = 10;
        config.terrain.max_height = 5;
        config.surface.max_step = 0;
        config.surface.terrain_blend = 3.0;
        config.city.min_radius = 20;
        config.city.max_radius = 6;
        config.city.level_step = -2;

        let config = config.sanitize();
        assert_eq!(config.terrain.max_height, 11);
        assert_eq!(config.surface.max_step, 1);
        assert_eq!(config.surface.terrain_blend, 1.0);
        assert_eq!(config.city.min_radius, 6);
        assert_eq!(config.city.level_step, 1);
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        assert!(matches!(
            CityGenConfig::parse("world_seed = [1, 2"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("citygrid_config_{}.toml", std::process::id()));
        let config = CityGenConfig::parse(SAMPLE).expect("sample parses");
        config.save(&path).expect("config saves");
        let loaded = CityGenConfig::load(&path).expect("config loads");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.world_seed, config.world_seed);
        assert_eq!(loaded.selectors.len(), 1);
        assert_eq!(loaded.selectors[0].entries[1].max_height_diff, Some(6));
    }
}
