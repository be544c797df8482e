//! Configuration module
//!
//! Server configuration loaded from the environment (and an optional `.env`
//! file): HTTP server, metadata registry, storage backend and upload limits.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use uuid::Uuid;

use crate::constants::{MAX_PARTS_PER_REQUEST, MAX_PART_SIZE_BYTES, MULTIPART_OVERHEAD_BYTES};
use crate::models::StorySummary;
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 300;
const DEFAULT_S3_BUCKET: &str = "iris-files";

/// Where file metadata rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryBackend {
    Postgres,
    /// Process-local registry; rows are lost on restart.
    Memory,
}

impl FromStr for RegistryBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(RegistryBackend::Postgres),
            "memory" => Ok(RegistryBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid registry backend: {}", s)),
        }
    }
}

impl Display for RegistryBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RegistryBackend::Postgres => write!(f, "postgres"),
            RegistryBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    // Registry
    pub registry_backend: RegistryBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Stories registered at startup when the memory registry is used.
    pub memory_stories: Vec<StorySummary>,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO, R2, ...)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Upload limits
    pub max_part_size_bytes: usize,
    pub max_parts_per_request: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let registry_backend = match env::var("REGISTRY_BACKEND") {
            Ok(value) => value.parse::<RegistryBackend>()?,
            Err(_) => RegistryBackend::Postgres,
        };

        let memory_stories = match env::var("MEMORY_REGISTRY_STORIES") {
            Ok(value) => parse_story_list(&value)?,
            Err(_) => Vec::new(),
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::S3,
        };

        let max_part_size_bytes = env::var("MAX_PART_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|mb| mb * 1024 * 1024)
            .unwrap_or(MAX_PART_SIZE_BYTES);

        let max_parts_per_request = env::var("MAX_PARTS_PER_REQUEST")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MAX_PARTS_PER_REQUEST);

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            environment,
            cors_origins,
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            registry_backend,
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            memory_stories,
            storage_backend,
            s3_bucket: Some(
                env::var("S3_BUCKET").unwrap_or_else(|_| DEFAULT_S3_BUCKET.to_string()),
            ),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            max_part_size_bytes,
            max_parts_per_request,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.registry_backend == RegistryBackend::Postgres {
            match self.database_url.as_deref() {
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when using the postgres registry"
                    ))
                }
                Some(url)
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") =>
                {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                Some(_) => {}
            }
        }

        if self.max_part_size_bytes == 0 || self.max_parts_per_request == 0 {
            return Err(anyhow::anyhow!(
                "MAX_PART_SIZE_MB and MAX_PARTS_PER_REQUEST must be greater than zero"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    pub fn registry_backend(&self) -> RegistryBackend {
        self.registry_backend
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn memory_stories(&self) -> &[StorySummary] {
        &self.memory_stories
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }

    pub fn max_part_size_bytes(&self) -> usize {
        self.max_part_size_bytes
    }

    pub fn max_parts_per_request(&self) -> usize {
        self.max_parts_per_request
    }

    /// Ceiling for a whole upload body, enforced before the multipart parser runs.
    pub fn max_request_body_bytes(&self) -> usize {
        self.max_parts_per_request
            .saturating_mul(self.max_part_size_bytes)
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

/// Parse `<uuid>:<title>` entries separated by commas. A missing title
/// defaults to "Untitled".
fn parse_story_list(value: &str) -> Result<Vec<StorySummary>, anyhow::Error> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, title) = entry.split_once(':').unwrap_or((entry, ""));
            let id = Uuid::parse_str(id.trim()).map_err(|e| {
                anyhow::anyhow!("MEMORY_REGISTRY_STORIES has an invalid story id '{}': {}", id, e)
            })?;
            let title = match title.trim() {
                "" => "Untitled".to_string(),
                title => title.to_string(),
            };
            Ok(StorySummary { id, title })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> Config {
        Config {
            server_port: 3000,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            registry_backend: RegistryBackend::Memory,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            memory_stories: Vec::new(),
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/iris".to_string()),
            local_storage_base_url: Some("http://localhost:3000/media".to_string()),
            max_part_size_bytes: MAX_PART_SIZE_BYTES,
            max_parts_per_request: MAX_PARTS_PER_REQUEST,
        }
    }

    #[test]
    fn test_memory_registry_needs_no_database_url() {
        assert!(local_config().validate().is_ok());
    }

    #[test]
    fn test_postgres_registry_requires_database_url() {
        let mut config = local_config();
        config.registry_backend = RegistryBackend::Postgres;
        assert!(config.validate().is_err());

        config.database_url = Some("mysql://localhost/iris".to_string());
        assert!(config.validate().is_err());

        config.database_url = Some("postgres://localhost/iris".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_backend_requires_region() {
        let mut config = local_config();
        config.storage_backend = StorageBackend::S3;
        config.s3_bucket = Some(DEFAULT_S3_BUCKET.to_string());
        assert!(config.validate().is_err());

        config.s3_region = Some("eu-west-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_request_body_ceiling_covers_all_parts() {
        let config = local_config();
        assert_eq!(
            config.max_request_body_bytes(),
            10 * 50 * 1024 * 1024 + 1024 * 1024
        );
    }

    #[test]
    fn test_registry_backend_parse() {
        assert_eq!(
            "Memory".parse::<RegistryBackend>().unwrap(),
            RegistryBackend::Memory
        );
        assert_eq!(
            "postgresql".parse::<RegistryBackend>().unwrap(),
            RegistryBackend::Postgres
        );
        assert!("redis".parse::<RegistryBackend>().is_err());
    }

    #[test]
    fn test_parse_story_list() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let stories = parse_story_list(&format!("{}:Grandma's garden, {}", id, other)).unwrap();

        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].id, id);
        assert_eq!(stories[0].title, "Grandma's garden");
        assert_eq!(stories[1].id, other);
        assert_eq!(stories[1].title, "Untitled");

        assert!(parse_story_list("").unwrap().is_empty());
        assert!(parse_story_list("not-a-uuid:Title").is_err());
    }
}
