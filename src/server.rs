use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::Error;

/// Process-level settings for the bundled server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Tokio worker threads.
    pub worker_threads: usize,
    pub environment: String,
}

impl ServerConfig {
    /// Read `PORT` (required), `MAX_THREADS`, `APP_ENV` and `BIND_ADDR`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `PORT` is missing or any value is malformed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) with an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let port = var("PORT")
            .ok_or_else(|| Error::Config("Please set PORT".into()))?
            .trim()
            .parse::<u16>()
            .map_err(|e| Error::Config(format!("PORT: {e}")))?;

        let worker_threads = match var("MAX_THREADS") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::Config("MAX_THREADS must be a positive integer".into()))?,
            None => 1,
        };

        let bind_addr = match var("BIND_ADDR") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("BIND_ADDR: {e}")))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        Ok(Self {
            bind_addr,
            port,
            worker_threads,
            environment: var("APP_ENV").unwrap_or_else(|| "development".into()),
        })
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
