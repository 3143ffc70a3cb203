use serde::{Deserialize, Serialize};

/// Ports of the sticky outbound proxies a user can be pinned to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyPool {
    pub host: String,
    pub ports: Vec<u16>,
}

impl ProxyPool {
    pub fn new(host: impl Into<String>, ports: Vec<u16>) -> Self {
        Self {
            host: host.into(),
            ports,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Port to move to after `current` got blocked: the next one in the pool,
    /// wrapping around. `None` when the pool cannot offer a different port.
    pub fn rotate(&self, current: Option<u16>) -> Option<u16> {
        let position = current.and_then(|port| self.ports.iter().position(|p| *p == port));
        let next = match position {
            Some(index) => self.ports.get((index + 1) % self.ports.len()).copied(),
            None => self.ports.first().copied(),
        };
        next.filter(|port| Some(*port) != current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps_and_skips_current() {
        let pool = ProxyPool::new("127.0.0.1", vec![9001, 9002, 9003]);
        assert_eq!(pool.rotate(Some(9001)), Some(9002));
        assert_eq!(pool.rotate(Some(9003)), Some(9001));
        assert_eq!(pool.rotate(None), Some(9001));
        assert_eq!(pool.rotate(Some(7777)), Some(9001));
    }

    #[test]
    fn single_port_pool_has_nowhere_to_go() {
        let pool = ProxyPool::new("127.0.0.1", vec![9001]);
        assert_eq!(pool.rotate(Some(9001)), None);
        assert_eq!(ProxyPool::default().rotate(None), None);
    }
}
