use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Popped vertices allowed per directional search.
    #[serde(default = "default_complexity_limit")]
    pub complexity_limit: usize,
    #[serde(default = "default_max_wire_width")]
    pub max_wire_width: f64,
    #[serde(default = "default_grain_size")]
    pub grain_size: f64,
    /// Search area margin, as a percentage of the smaller design dimension.
    #[serde(default = "default_search_bound_percent")]
    pub search_bound_percent: f64,
    #[serde(default)]
    pub parallel_directions: bool,
    #[serde(default)]
    pub prevented_layers: Vec<String>,
    #[serde(default)]
    pub favored_layers: Vec<String>,
    #[serde(default)]
    pub costs: CostWeights,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            complexity_limit: default_complexity_limit(),
            max_wire_width: default_max_wire_width(),
            grain_size: default_grain_size(),
            search_bound_percent: default_search_bound_percent(),
            parallel_directions: false,
            prevented_layers: Vec::new(),
            favored_layers: Vec::new(),
            costs: CostWeights::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CostWeights {
    #[serde(default = "default_alternating_metal")]
    pub alternating_metal: i64,
    #[serde(default = "default_layer_change")]
    pub layer_change: i64,
    #[serde(default = "default_wrong_direction")]
    pub wrong_direction: i64,
    #[serde(default = "default_unused_track")]
    pub unused_track: i64,
    #[serde(default = "default_turning")]
    pub turning: i64,
    #[serde(default = "default_off_grid")]
    pub off_grid: i64,
    #[serde(default = "default_unfavored")]
    pub unfavored: i64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            alternating_metal: default_alternating_metal(),
            layer_change: default_layer_change(),
            wrong_direction: default_wrong_direction(),
            unused_track: default_unused_track(),
            turning: default_turning(),
            off_grid: default_off_grid(),
            unfavored: default_unfavored(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_design_file")]
    pub design_file: String,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default)]
    pub image_file: Option<String>,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            design_file: default_design_file(),
            output_file: default_output_file(),
            image_file: None,
            image_size: default_image_size(),
        }
    }
}

fn default_strategy() -> String {
    "sea-of-gates".to_string()
}

fn default_complexity_limit() -> usize {
    200_000
}

fn default_max_wire_width() -> f64 {
    10.0
}

fn default_grain_size() -> f64 {
    1.0
}

fn default_search_bound_percent() -> f64 {
    7.0
}

fn default_alternating_metal() -> i64 {
    100
}

fn default_layer_change() -> i64 {
    8
}

fn default_wrong_direction() -> i64 {
    15
}

fn default_unused_track() -> i64 {
    10
}

fn default_turning() -> i64 {
    1
}

fn default_off_grid() -> i64 {
    15
}

fn default_unfavored() -> i64 {
    10
}

fn default_design_file() -> String {
    "inputs/design.toml".to_string()
}

fn default_output_file() -> String {
    "output/routed.toml".to_string()
}

fn default_image_size() -> u32 {
    2000
}
