//! Dev server - static preview of the destination root

use crate::error::{BuildError, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

/// Serves the destination root over HTTP for local preview. No templating,
/// no dynamic routes.
pub struct DevServer {
    root: PathBuf,
    port: u16,
}

impl DevServer {
    pub fn new(root: PathBuf, port: u16) -> Self {
        Self { root, port }
    }

    /// Bind the configured port, mapping an already-bound port to
    /// [`BuildError::PortInUse`].
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                BuildError::PortInUse(self.port)
            } else {
                BuildError::Io(e)
            }
        })
    }

    /// Bind and serve until the task is dropped or the process exits
    pub async fn serve(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        info!(
            "Dev server: http://{} -> {}",
            listener.local_addr()?,
            self.root.display()
        );

        let app = Router::new().fallback_service(ServeDir::new(&self.root));
        axum::serve(listener, app).await.map_err(BuildError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_port_in_use() {
        let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();

        let server = DevServer::new(PathBuf::from("dist"), port);
        let err = server.bind().await.unwrap_err();
        assert!(matches!(err, BuildError::PortInUse(p) if p == port));
    }

    #[tokio::test]
    async fn test_bind_free_port() {
        let server = DevServer::new(PathBuf::from("dist"), 0);
        assert!(server.bind().await.is_ok());
    }
}
