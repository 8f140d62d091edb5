//! Configuration management for vpage.
//!
//! Parses `vpage.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `render.command`
//!
//! ## Example
//!
//! ```toml
//! [server]
//! port = 3000
//!
//! [pages]
//! dir = "src/pages"
//!
//! [build]
//! out_dir = "build"
//!
//! [render]
//! command = "node render-worker.mjs"
//! ```

mod expand;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override pages directory.
    pub pages_dir: Option<PathBuf>,
    /// Override build output directory.
    pub out_dir: Option<PathBuf>,
    /// Override render worker command.
    pub render_command: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "vpage.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Pages configuration (paths are relative strings from TOML).
    pages: PagesConfigRaw,
    /// Build configuration (paths are relative strings from TOML).
    build: BuildConfigRaw,
    /// Dev server configuration (paths are relative strings from TOML).
    dev: DevConfigRaw,
    /// UI framework module names used in generated sources.
    pub framework: FrameworkConfig,
    /// External render worker configuration.
    pub render: RenderConfig,

    /// Resolved pages configuration (set after loading).
    #[serde(skip)]
    pub pages_resolved: PagesConfig,
    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Resolved dev server configuration (set after loading).
    #[serde(skip)]
    pub dev_resolved: DevConfig,
    /// Project root: the directory holding the config file, or the cwd.
    #[serde(skip)]
    pub root_dir: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

/// Raw pages configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PagesConfigRaw {
    dir: Option<String>,
    document: Option<String>,
    exclude_prefix: Option<String>,
    extensions: Option<Vec<String>>,
}

/// Resolved pages configuration with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesConfig {
    /// Directory holding page sources.
    pub dir: PathBuf,
    /// File stem of the document template (never routable).
    pub document: String,
    /// Files whose name starts with this marker are not pages.
    pub exclude_prefix: String,
    /// Page source extensions, without the leading dot.
    pub extensions: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("src/pages"),
            document: "_document".to_owned(),
            exclude_prefix: "_".to_owned(),
            extensions: vec!["tsx".to_owned()],
        }
    }
}

impl PagesConfig {
    /// Path of the document template.
    ///
    /// Returns the first existing `<document>.<ext>` in extension order, or
    /// the candidate for the first extension if none exists yet.
    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        let candidates: Vec<PathBuf> = self
            .extensions
            .iter()
            .map(|ext| self.dir.join(format!("{}.{ext}", self.document)))
            .collect();
        candidates
            .iter()
            .find(|p| p.exists())
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(|| self.dir.join(&self.document))
    }
}

/// Explicit bundler inputs set by the host build configuration.
///
/// Mirrors the shapes a bundler accepts: one entry, a list, or named entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BuildInput {
    /// A single entry file.
    Single(String),
    /// A list of entry files.
    Many(Vec<String>),
    /// Named entries (`name = "file"`).
    Named(BTreeMap<String, String>),
}

/// Raw build configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    out_dir: Option<String>,
    assets_dir: Option<String>,
    input: Option<BuildInput>,
}

/// Resolved build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Output directory for generated HTML artifacts.
    pub out_dir: PathBuf,
    /// Assets subdirectory of `out_dir`, also the assets URL prefix.
    pub assets_dir: String,
    /// Explicit entrypoints set by the host. Must stay unset.
    pub input: Option<BuildInput>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("build"),
            assets_dir: "assets".to_owned(),
            input: None,
        }
    }
}

impl BuildConfig {
    /// Absolute assets directory (`<out_dir>/<assets_dir>`).
    #[must_use]
    pub fn assets_path(&self) -> PathBuf {
        self.out_dir.join(&self.assets_dir)
    }
}

/// Raw dev server configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DevConfigRaw {
    public_dir: Option<String>,
}

/// Resolved dev server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevConfig {
    /// Directory served as-is behind the page middleware.
    pub public_dir: PathBuf,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
        }
    }
}

/// UI framework modules referenced by generated entry sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Module exporting `createElement` and `hydrate`.
    pub module: String,
    /// Module exporting `renderToString`.
    pub render_module: String,
    /// Id of the element the page hydrates into.
    pub root_element_id: String,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            module: "preact/compat".to_owned(),
            render_module: "preact-render-to-string".to_owned(),
            root_element_id: "app".to_owned(),
        }
    }
}

/// External render worker configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Shell command starting the render worker (e.g. `node render-worker.mjs`).
    pub command: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`render.command`").
        field: String,
        /// Error message (e.g., "${`WORKER`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `vpage.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings)?;
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) -> Result<(), ConfigError> {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(pages_dir) = &settings.pages_dir {
            self.pages_resolved.dir = self.root_dir.join(pages_dir);
        }
        if let Some(out_dir) = &settings.out_dir {
            self.build_resolved.out_dir = self.root_dir.join(out_dir);
        }
        if let Some(command) = &settings.render_command {
            let mut command = command.clone();
            expand::expand_in_place([("render.command", &mut command)])?;
            self.render.command = Some(command);
        }
        Ok(())
    }

    /// Get the render worker command.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if no command is configured.
    pub fn require_render_command(&self) -> Result<&str, ConfigError> {
        self.render.command.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "render.command is required to render pages (set it in [render])".to_owned(),
            )
        })
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let pages = PagesConfig::default();
        let build = BuildConfig::default();
        let dev = DevConfig::default();
        Self {
            server: ServerConfig::default(),
            pages: PagesConfigRaw::default(),
            build: BuildConfigRaw::default(),
            dev: DevConfigRaw::default(),
            framework: FrameworkConfig::default(),
            render: RenderConfig::default(),
            pages_resolved: PagesConfig {
                dir: base.join(&pages.dir),
                ..pages
            },
            build_resolved: BuildConfig {
                out_dir: base.join(&build.out_dir),
                ..build
            },
            dev_resolved: DevConfig {
                public_dir: base.join(&dev.public_dir),
            },
            root_dir: base.to_path_buf(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_pages()?;
        self.validate_build()?;
        self.validate_framework()?;
        if let Some(command) = &self.render.command {
            require_non_empty(command.trim(), "render.command")?;
        }
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but it's
        // unlikely to be intentional in a config file
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate pages configuration.
    fn validate_pages(&self) -> Result<(), ConfigError> {
        let pages = &self.pages_resolved;
        require_non_empty(&pages.document, "pages.document")?;
        require_non_empty(&pages.exclude_prefix, "pages.exclude_prefix")?;

        if pages.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "pages.extensions must list at least one extension".to_owned(),
            ));
        }
        for ext in &pages.extensions {
            require_non_empty(ext, "pages.extensions")?;
            if ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "pages.extensions entries are written without a dot, got {ext:?}"
                )));
            }
        }

        Ok(())
    }

    /// Validate build configuration.
    fn validate_build(&self) -> Result<(), ConfigError> {
        let assets_dir = &self.build_resolved.assets_dir;
        require_non_empty(assets_dir, "build.assets_dir")?;

        let is_plain_relative = Path::new(assets_dir)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain_relative {
            return Err(ConfigError::Validation(format!(
                "build.assets_dir must be a relative path inside out_dir, got {assets_dir:?}"
            )));
        }

        Ok(())
    }

    /// Validate framework configuration.
    fn validate_framework(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.framework.module, "framework.module")?;
        require_non_empty(&self.framework.render_module, "framework.render_module")?;
        require_non_empty(&self.framework.root_element_id, "framework.root_element_id")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let mut fields = vec![("server.host", &mut self.server.host)];
        if let Some(command) = self.render.command.as_mut() {
            fields.push(("render.command", command));
        }
        expand::expand_in_place(fields)
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let pages_default = PagesConfig::default();
        let build_default = BuildConfig::default();
        let dev_default = DevConfig::default();

        self.pages_resolved = PagesConfig {
            dir: self
                .pages
                .dir
                .as_deref()
                .map_or_else(|| config_dir.join(&pages_default.dir), |d| config_dir.join(d)),
            document: self.pages.document.clone().unwrap_or(pages_default.document),
            exclude_prefix: self
                .pages
                .exclude_prefix
                .clone()
                .unwrap_or(pages_default.exclude_prefix),
            extensions: self
                .pages
                .extensions
                .clone()
                .unwrap_or(pages_default.extensions),
        };

        self.build_resolved = BuildConfig {
            out_dir: self
                .build
                .out_dir
                .as_deref()
                .map_or_else(|| config_dir.join(&build_default.out_dir), |d| config_dir.join(d)),
            assets_dir: self
                .build
                .assets_dir
                .clone()
                .unwrap_or(build_default.assets_dir),
            input: self.build.input.clone(),
        };

        self.dev_resolved = DevConfig {
            public_dir: self
                .dev
                .public_dir
                .as_deref()
                .map_or_else(|| config_dir.join(&dev_default.public_dir), |d| config_dir.join(d)),
        };

        self.root_dir = config_dir.to_path_buf();
    }
}
