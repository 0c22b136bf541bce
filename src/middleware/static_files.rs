use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{Context, Flow};
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler, private};

const MIME_TYPES: &[(&str, &str)] = &[
    ("css", "text/css"),
    ("eot", "application/vnd.ms-fontobject"),
    ("html", "text/html"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("otf", "font/otf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
];

#[derive(Debug)]
struct StaticFile {
    path: PathBuf,
    mime: String,
}

/// Serves the files of a folder.
///
/// The folder is scanned once, when the middleware is built; files added
/// later are not served. Only files whose extension has a known MIME type
/// are picked up. A request whose path equals `/<path relative to folder>`
/// is answered with the file and ends the chain; any other request passes
/// through.
///
/// ```rust,no_run
/// use spry::App;
/// use spry::middleware::ServeStatic;
///
/// # fn build() -> Result<App, spry::Error> {
/// let app = App::new().middleware(
///     ServeStatic::builder("./public")
///         .mime_type("mp4", "video/mp4")
///         .build()?,
/// );
/// # Ok(app)
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ServeStatic {
    files: Arc<HashMap<String, StaticFile>>,
}

/// Builder for [`ServeStatic`]. Obtain via [`ServeStatic::builder`].
#[derive(Debug)]
pub struct ServeStaticBuilder {
    root: PathBuf,
    mime_types: HashMap<String, String>,
}

impl ServeStatic {
    /// Scans `root` with the default MIME table.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        Self::builder(root).build()
    }

    pub fn builder(root: impl AsRef<Path>) -> ServeStaticBuilder {
        ServeStaticBuilder {
            root: root.as_ref().to_owned(),
            mime_types: MIME_TYPES
                .iter()
                .map(|(ext, mime)| ((*ext).to_owned(), (*mime).to_owned()))
                .collect(),
        }
    }

    /// Number of files this middleware answers for.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    async fn serve(files: Arc<HashMap<String, StaticFile>>, cx: Context) -> Flow {
        match files.get(cx.req.path()) {
            Some(file) => {
                debug!(path = %file.path.display(), "serving static file");
                cx.send_file(&file.path, &file.mime).await
            }
            None => cx.next(),
        }
    }
}

impl ServeStaticBuilder {
    /// Adds or overrides the MIME type for files ending in `.ext`.
    #[must_use]
    pub fn mime_type(mut self, ext: &str, mime: &str) -> Self {
        self.mime_types.insert(ext.to_ascii_lowercase(), mime.to_owned());
        self
    }

    /// Walks the folder and builds the URL → file map.
    pub fn build(self) -> Result<ServeStatic, Error> {
        let mut files = HashMap::new();
        self.walk(&self.root, &mut files)?;
        info!(root = %self.root.display(), files = files.len(), "static files indexed");
        Ok(ServeStatic { files: Arc::new(files) })
    }

    fn walk(&self, dir: &Path, files: &mut HashMap<String, StaticFile>) -> Result<(), Error> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.walk(&path, files)?;
                continue;
            }
            // Symlinked directories are not followed; a link back up the tree would never end.
            if file_type.is_symlink() && path.is_dir() {
                debug!(path = %path.display(), "skipping symlinked directory");
                continue;
            }
            let Some(mime) = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| self.mime_types.get(&ext.to_ascii_lowercase()))
            else {
                continue;
            };
            let Some(url) = url_path(&self.root, &path) else {
                continue;
            };
            files.insert(url, StaticFile { path, mime: mime.clone() });
        }
        Ok(())
    }
}

/// `/`-joined path of `file` relative to `root`, with a leading `/`.
fn url_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut url = String::new();
    for part in relative.components() {
        url.push('/');
        url.push_str(part.as_os_str().to_str()?);
    }
    Some(url)
}

impl private::Sealed for ServeStatic {}

impl Handler for ServeStatic {
    fn into_boxed_handler(self) -> BoxedHandler {
        let files = self.files;
        (move |cx: Context| Self::serve(Arc::clone(&files), cx)).into_boxed_handler()
    }
}
