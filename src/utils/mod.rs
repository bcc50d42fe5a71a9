// src/utils/mod.rs
use log::debug;

/// Load variables from a .env file when one exists. Missing files are the
/// normal case outside local development.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!("No .env file found; using process environment"),
    }
}
