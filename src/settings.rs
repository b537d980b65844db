use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

static DEFAULT_BACKEND_URL: Lazy<Url> =
    Lazy::new(|| Url::parse(&default_backend_url()).expect("default backend url"));
static DEFAULT_SHOP_URL: Lazy<Url> =
    Lazy::new(|| Url::parse(&default_shop_url()).expect("default shop url"));

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Base URL of the marketplace backend, used for both the `call_kw`
    /// queries and the cart route. Defaults to a local Odoo instance.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Storefront URL the demo page pretends to be loaded from.
    #[serde(default = "default_shop_url")]
    pub shop_url: String,
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_backend_url() -> String {
    "http://localhost:8069".into()
}

fn default_shop_url() -> String {
    "https://market.example/shop".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            shop_url: default_shop_url(),
            debug_logging: false,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Parsed backend URL, falling back to the default when the configured
    /// string is invalid.
    pub fn backend_url(&self) -> Url {
        match Url::parse(&self.backend_url) {
            Ok(url) => url,
            Err(_) => {
                tracing::warn!(
                    "provided backend_url '{}' is invalid; using default",
                    self.backend_url
                );
                DEFAULT_BACKEND_URL.clone()
            }
        }
    }

    /// Parsed storefront URL, falling back to the default when the
    /// configured string is invalid.
    pub fn shop_url(&self) -> Url {
        match Url::parse(&self.shop_url) {
            Ok(url) => url,
            Err(_) => {
                tracing::warn!(
                    "provided shop_url '{}' is invalid; using default",
                    self.shop_url
                );
                DEFAULT_SHOP_URL.clone()
            }
        }
    }
}
