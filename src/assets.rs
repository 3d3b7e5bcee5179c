//! The landing page, its stylesheet and the 404 page.
//!
//! Only these fixed files are ever read from the public directory; request
//! paths are never joined onto it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::status::Status;

#[derive(Clone, Debug)]
pub struct Assets {
    root: Arc<PathBuf>,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: Arc::new(root.into()) }
    }

    /// `GET /`
    pub async fn index(&self, _req: Request) -> Response {
        self.serve("index.html", ContentType::Html, Status::Ok).await
    }

    /// `GET /style.css`
    pub async fn stylesheet(&self, _req: Request) -> Response {
        self.serve("style.css", ContentType::Css, Status::Ok).await
    }

    /// Fallback for unmatched routes.
    pub async fn not_found(&self, _req: Request) -> Response {
        self.serve("404.html", ContentType::Html, Status::NotFound).await
    }

    async fn serve(&self, file: &str, content_type: ContentType, status: Status) -> Response {
        match read(&self.root, file).await {
            Some(body) => Response::builder().status(status).bytes(content_type, body),
            None => Response::status(Status::NotFound),
        }
    }
}

async fn read(root: &Path, file: &str) -> Option<Vec<u8>> {
    let path = root.join(file);
    match tokio::fs::read(&path).await {
        Ok(body) => Some(body),
        Err(e) => {
            warn!(path = %path.display(), "asset unavailable: {e}");
            None
        }
    }
}
