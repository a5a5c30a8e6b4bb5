//! Environment-based server configuration.

use std::env;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    #[allow(dead_code)]
    pub cors_origins: Vec<String>,
    pub room: RoomConfig,
    pub log_level: String,
}

/// Room lifecycle configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Length of generated room codes.
    pub code_length: usize,
    /// Attempts at generating a collision-free code before giving up.
    pub max_code_attempts: u32,
    /// Maximum active members per room.
    pub max_size: usize,
    /// Rooms empty and inactive for longer than this are swept.
    pub inactivity_window_secs: u64,
    /// Interval between cleanup scheduler ticks.
    pub cleanup_interval_secs: u64,
    /// Room codes exempt from both cleanup sweeps (e.g. the global room).
    pub protected_codes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            room: RoomConfig {
                code_length: env::var("ROOM_CODE_LENGTH")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .unwrap_or(8),
                max_code_attempts: env::var("ROOM_CODE_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                max_size: env::var("MAX_ROOM_SIZE")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .unwrap_or(8),
                inactivity_window_secs: env::var("ROOM_INACTIVITY_WINDOW")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
                cleanup_interval_secs: env::var("CLEANUP_INTERVAL")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
                protected_codes: env::var("PROTECTED_ROOM_CODES")
                    .unwrap_or_else(|_| "GLOBAL".to_string())
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.trim().to_uppercase())
                    .collect(),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for tests, independent of the environment.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            cors_origins: vec![],
            room: RoomConfig {
                code_length: 8,
                max_code_attempts: 10,
                max_size: 4,
                inactivity_window_secs: 1800,
                cleanup_interval_secs: 300,
                protected_codes: vec!["GLOBAL".to_string()],
            },
            log_level: "debug".to_string(),
        }
    }
}
