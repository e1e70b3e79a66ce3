#![forbid(unsafe_code)]

use crate::error::Error;
use config::{Layout, Server};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info};

/// Placeholder in the listing template replaced by the file entries.
pub const FILES_PLACEHOLDER: &str = "{{files}}";

/// Shared state of one server run: the served folder, the listing template,
/// and the addresses already recorded in the connected-IP log.
#[derive(Debug)]
pub struct Share {
    root: PathBuf,
    template: String,
    stylesheet: PathBuf,
    blocked_ips: PathBuf,
    connected_ips: PathBuf,
    seen: Mutex<HashSet<String>>,
}

impl Share {
    /// Resolve the served folder and load the template.
    ///
    /// `folder_override` is the value of the folder environment variable;
    /// relative values resolve against the base directory. Without it the
    /// default folder is served and created when missing.
    pub fn open(
        server: &Server,
        layout: &Layout,
        folder_override: Option<&OsStr>,
    ) -> Result<Self, Error> {
        let root = match folder_override.filter(|value| !value.is_empty()) {
            Some(folder) => layout.base_dir.join(folder),
            None => {
                let folder = &layout.default_folder;
                if !folder.exists() {
                    std::fs::create_dir_all(folder).map_err(|source| Error::CreateFolder {
                        path: folder.clone(),
                        source,
                    })?;
                    info!(path = %folder.display(), "created default folder");
                }
                folder.clone()
            }
        };
        let root = std::fs::canonicalize(&root)
            .ok()
            .filter(|root| root.is_dir())
            .ok_or(Error::NotADirectory(root))?;

        let template_path = layout.base_dir.join(&server.template);
        if !template_path.is_file() {
            return Err(Error::MissingTemplate(template_path));
        }
        let template =
            std::fs::read_to_string(&template_path).map_err(|source| Error::ReadTemplate {
                path: template_path.clone(),
                source,
            })?;
        debug!(path = %template_path.display(), "loaded listing template");

        Ok(Self {
            root,
            template,
            stylesheet: layout.base_dir.join(&server.stylesheet),
            blocked_ips: layout.blocked_ips.clone(),
            connected_ips: layout.connected_ips.clone(),
            seen: Mutex::new(HashSet::new()),
        })
    }

    /// Canonical served folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stylesheet(&self) -> &Path {
        &self.stylesheet
    }

    /// Start a fresh connection log for this run.
    pub fn begin_session(&self) {
        self.seen_ips().clear();
        store::clear_connected_ips(&self.connected_ips);
    }

    /// Append `ip` to the connected-IP log the first time it shows up in
    /// this run. Returns whether it was new.
    pub fn record_visit(&self, ip: &str) -> bool {
        let mut seen = self.seen_ips();
        if seen.contains(ip) {
            return false;
        }
        seen.insert(ip.to_owned());
        store::record_connected_ip(&self.connected_ips, ip);
        true
    }

    /// The blocklist is read on every call so edits apply immediately.
    pub fn is_blocked(&self, ip: &str) -> bool {
        store::load_blocked_ips(&self.blocked_ips).contains(ip)
    }

    /// Map a request path to a regular file inside the served folder.
    ///
    /// Symlinks and `..` segments are followed first, so anything resolving
    /// outside the root is refused.
    pub async fn resolve(&self, requested: &str) -> Option<PathBuf> {
        let candidate = fs::canonicalize(self.root.join(requested)).await.ok()?;
        if !candidate.starts_with(&self.root) {
            return None;
        }
        let metadata = fs::metadata(&candidate).await.ok()?;
        metadata.is_file().then_some(candidate)
    }

    /// Render the listing page for the regular files directly under the root.
    pub async fn render_index(&self) -> Result<String, Error> {
        let names = self.file_names().await?;
        let mut entries = String::new();
        if names.is_empty() {
            entries.push_str("<li class=\"empty\">No files shared yet.</li>\n");
        }
        for name in &names {
            let href = urlencoding::encode(name);
            let label = escape_html(name);
            let _ = writeln!(
                entries,
                "<li class=\"file\"><span class=\"name\">{label}</span> \
                 <a href=\"/open/{href}\" target=\"_blank\">Open</a> \
                 <a href=\"/download/{href}\">Download</a></li>"
            );
        }
        Ok(self.template.replace(FILES_PLACEHOLDER, &entries))
    }

    async fn file_names(&self) -> Result<Vec<String>, Error> {
        let mut dir = fs::read_dir(&self.root).await.map_err(Error::ListFolder)?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(Error::ListFolder)? {
            let is_file = fs::metadata(entry.path())
                .await
                .is_ok_and(|metadata| metadata.is_file());
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(?name, "skipping file with a non UTF-8 name"),
            }
        }
        names.sort();
        Ok(names)
    }

    fn seen_ips(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
