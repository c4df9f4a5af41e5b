use std::net::SocketAddr;

/// HTTP server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_addr: SocketAddr,
    /// Log views return at most this many entries.
    pub log_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_limit: 20,
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.log_limit, 20);
    }

    #[test]
    fn override_bind_addr() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = ServerConfig::default().with_bind_addr(addr);
        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.log_limit, 20);
    }
}
