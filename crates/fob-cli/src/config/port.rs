use crate::error::{ConfigError, Result};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

/// Find an available port starting from the requested one.
///
/// Tries the requested port, then the next ten. Warns when the requested
/// port is in the privileged range.
pub fn find_available_port(host: &str, requested_port: u16) -> Result<SocketAddr> {
    if requested_port != 0 && requested_port < 1024 {
        crate::ui::warning(&format!(
            "Port {} is in privileged range, may require root access",
            requested_port
        ));
    }

    let resolve = |port: u16| -> Result<SocketAddr> {
        (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "host".to_string(),
                    value: host.to_string(),
                    hint: "Use an IP address or a resolvable host name".to_string(),
                }
                .into()
            })
    };

    let addr = resolve(requested_port)?;
    if TcpListener::bind(addr).is_ok() {
        return Ok(addr);
    }

    for offset in 1..=10 {
        let Some(port) = requested_port.checked_add(offset) else {
            break;
        };
        let addr = resolve(port)?;
        if TcpListener::bind(addr).is_ok() {
            crate::ui::warning(&format!(
                "Port {} is busy, using port {} instead",
                requested_port, port
            ));
            return Ok(addr);
        }
    }

    Err(ConfigError::InvalidValue {
        field: "port".to_string(),
        value: requested_port.to_string(),
        hint: format!(
            "Ports {}-{} are all in use. Try a different port range.",
            requested_port,
            requested_port.saturating_add(10)
        ),
    }
    .into())
}
