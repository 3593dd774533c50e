use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use plate_layout::LayoutConfig;
use tracing::{info, warn};

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub layout: LayoutConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            layout: layout_config_from_env(),
            session: SessionConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
    cors_enabled: bool,
}

impl ApiConfig {
    const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    const DEFAULT_HOST_NAME: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const CORS_VAR: &'static str = "PLATE_LAYOUT_API_CORS";

    fn from_env() -> Self {
        let host_value = env_string("PLATE_LAYOUT_API_HOST")
            .unwrap_or_else(|| Self::DEFAULT_HOST_NAME.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse PLATE_LAYOUT_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST_NAME
                );
                (Self::DEFAULT_HOST, Self::DEFAULT_HOST_NAME.to_string())
            }
        };

        let port = match env_string("PLATE_LAYOUT_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "PLATE_LAYOUT_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse PLATE_LAYOUT_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        let cors_enabled = env_string(Self::CORS_VAR)
            .and_then(|raw| parse_bool(&raw, Self::CORS_VAR))
            .unwrap_or(true);

        Self {
            bind_ip,
            display_host,
            port,
            cors_enabled,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether cross-origin requests from any origin are allowed.
    pub fn cors_enabled(&self) -> bool {
        self.cors_enabled
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Initial container of the in-memory session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub container_width: f64,
    pub container_height: f64,
}

impl SessionConfig {
    const DEFAULT_CONTAINER_WIDTH: f64 = 300.0;
    const DEFAULT_CONTAINER_HEIGHT: f64 = 200.0;

    fn from_env() -> Self {
        let container_width = load_f64_with_warning(
            "PLATE_LAYOUT_CONTAINER_WIDTH",
            Self::DEFAULT_CONTAINER_WIDTH,
            |value| value > 0.0,
            "must be greater than 0",
            None,
        );
        let container_height = load_f64_with_warning(
            "PLATE_LAYOUT_CONTAINER_HEIGHT",
            Self::DEFAULT_CONTAINER_HEIGHT,
            |value| value > 0.0,
            "must be greater than 0",
            None,
        );

        Self {
            container_width,
            container_height,
        }
    }
}

fn layout_config_from_env() -> LayoutConfig {
    let cell_size = load_f64_with_warning(
        "PLATE_LAYOUT_CELL_SIZE",
        LayoutConfig::DEFAULT_CELL_SIZE,
        |value| value > 0.0,
        "must be greater than 0",
        Some("Adjusted cell size changes booking-grid precision"),
    );
    let max_grid_cells = match env_string("PLATE_LAYOUT_MAX_GRID_CELLS") {
        Some(raw) => parse_cell_limit(&raw, "PLATE_LAYOUT_MAX_GRID_CELLS"),
        None => LayoutConfig::DEFAULT_MAX_GRID_CELLS,
    };
    let scan_step = load_f64_with_warning(
        "PLATE_LAYOUT_SCAN_STEP",
        LayoutConfig::DEFAULT_SCAN_STEP,
        |value| value > 0.0,
        "must be greater than 0",
        Some("Adjusted scan step may skip free positions"),
    );
    let max_item_width = load_f64_with_warning(
        "PLATE_LAYOUT_MAX_ITEM_WIDTH",
        LayoutConfig::DEFAULT_MAX_ITEM_WIDTH,
        |value| value > 0.0,
        "must be greater than 0",
        None,
    );
    let max_item_height = load_f64_with_warning(
        "PLATE_LAYOUT_MAX_ITEM_HEIGHT",
        LayoutConfig::DEFAULT_MAX_ITEM_HEIGHT,
        |value| value > 0.0,
        "must be greater than 0",
        None,
    );
    let canvas_width = load_f64_with_warning(
        "PLATE_LAYOUT_CANVAS_WIDTH",
        LayoutConfig::DEFAULT_CANVAS_WIDTH,
        |value| value > 0.0,
        "must be greater than 0",
        None,
    );
    let canvas_height = load_f64_with_warning(
        "PLATE_LAYOUT_CANVAS_HEIGHT",
        LayoutConfig::DEFAULT_CANVAS_HEIGHT,
        |value| value > 0.0,
        "must be greater than 0",
        None,
    );
    let min_zoom = load_f64_with_warning(
        "PLATE_LAYOUT_MIN_ZOOM",
        LayoutConfig::DEFAULT_MIN_ZOOM,
        |value| value > 0.0,
        "must be greater than 0",
        None,
    );
    let max_zoom = load_f64_with_warning(
        "PLATE_LAYOUT_MAX_ZOOM",
        LayoutConfig::DEFAULT_MAX_ZOOM,
        |value| value >= min_zoom,
        "must not be below the minimum zoom",
        None,
    );
    let border_tolerance = load_f64_with_warning(
        "PLATE_LAYOUT_BORDER_TOLERANCE",
        LayoutConfig::DEFAULT_BORDER_TOLERANCE,
        |value| value >= 0.0,
        "must not be negative",
        None,
    );
    let epsilon = load_f64_with_warning(
        "PLATE_LAYOUT_EPSILON",
        LayoutConfig::DEFAULT_EPSILON,
        |value| value > 0.0,
        "must be greater than 0",
        Some("Adjusted tolerances may cause numerical instabilities"),
    );

    LayoutConfig::builder()
        .cell_size(cell_size)
        .max_grid_cells(max_grid_cells)
        .scan_step(scan_step)
        .max_item_size(max_item_width, max_item_height)
        .canvas_size(canvas_width, canvas_height)
        .zoom_range(min_zoom, max_zoom)
        .border_tolerance(border_tolerance)
        .epsilon(epsilon)
        .build()
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn parse_cell_limit(raw: &str, var_name: &str) -> usize {
    let default = LayoutConfig::DEFAULT_MAX_GRID_CELLS;
    match raw.parse::<usize>() {
        Ok(value) if value != 0 => value,
        Ok(_) => {
            warn!("{} must not be 0. Using {}.", var_name, default);
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}'): {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn parse_f64(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && validator(value) => value,
        Ok(_) => {
            warn!(
                "{} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    notice: Option<&str>,
) -> f64 {
    let Some(raw) = env_string(var_name) else {
        return default;
    };
    let value = parse_f64(var_name, &raw, default, validator, invalid_hint);
    let tolerance = default.abs().max(1.0) * 1e-9;
    if let Some(notice) = notice {
        if (value - default).abs() > tolerance {
            info!("{} ({} = {}).", notice, var_name, value);
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("ON", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool(" true ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("No", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("  off  ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("maybe", "TEST_VAR"), None);
        assert_eq!(parse_bool("  ", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_f64_falls_back_on_invalid_input() {
        let positive = |value: f64| value > 0.0;
        assert_eq!(parse_f64("TEST_VAR", "2.5", 1.0, positive, "must be > 0"), 2.5);
        assert_eq!(parse_f64("TEST_VAR", "-3", 1.0, positive, "must be > 0"), 1.0);
        assert_eq!(parse_f64("TEST_VAR", "abc", 1.0, positive, "must be > 0"), 1.0);
        assert_eq!(parse_f64("TEST_VAR", "inf", 1.0, positive, "must be > 0"), 1.0);
    }

    #[test]
    fn test_parse_cell_limit() {
        assert_eq!(parse_cell_limit("250000", "TEST_VAR"), 250_000);
        assert_eq!(
            parse_cell_limit("0", "TEST_VAR"),
            LayoutConfig::DEFAULT_MAX_GRID_CELLS
        );
        assert_eq!(
            parse_cell_limit("-5", "TEST_VAR"),
            LayoutConfig::DEFAULT_MAX_GRID_CELLS
        );
    }
}
