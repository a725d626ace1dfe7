//! Renders a `cqlshrc` for interactive `cqlsh` use from relation details.

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use nix::unistd::{chown, Gid, Uid, User};

use crate::details::DetailsList;
use crate::error::{EndpointError, Result};
use crate::ini::IniDocument;

/// Location of the file relative to the owner's home directory.
pub const CQLSHRC_RELATIVE_PATH: &str = ".cassandra/cqlshrc";

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: Uid,
    pub gid: Gid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Written {
        hostname: Option<String>,
        port: Option<u16>,
    },
    Removed,
    AlreadyAbsent,
}

#[derive(Debug, Clone)]
pub struct CqlshrcWriter {
    path: PathBuf,
    owner: Option<Owner>,
}

impl CqlshrcWriter {
    /// Targets `~account/.cassandra/cqlshrc`, owned by `account`.
    pub fn for_account(account: &str) -> Result<Self> {
        let user = User::from_name(account)
            .map_err(|source| EndpointError::UserLookup {
                user: account.to_string(),
                source,
            })?
            .ok_or_else(|| EndpointError::UnknownUser {
                user: account.to_string(),
            })?;
        Ok(Self {
            path: user.dir.join(CQLSHRC_RELATIVE_PATH),
            owner: Some(Owner {
                uid: user.uid,
                gid: user.gid,
            }),
        })
    }

    /// Targets an explicit path, leaving ownership alone.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merges the first entry of `details` into the file on disk, or
    /// removes the file when `details` is empty.
    ///
    /// Only the first relation is ever rendered; any others are ignored.
    pub fn write(&self, details: &DetailsList) -> Result<RenderOutcome> {
        let Some(first) = details.first() else {
            return self.remove();
        };
        if details.len() > 1 {
            debug!(
                "{} relations have details, rendering only {}",
                details.len(),
                first.relation_id
            );
        }

        let mut doc = self.load()?;

        doc.section_mut("authentication");
        if let Some((username, password)) = first.credentials() {
            doc.set("authentication", "username", username);
            doc.set("authentication", "password", password);
        }

        doc.section_mut("connection");
        // Lowest address, so that unchanged data renders identically.
        let hostname = first.hosts.iter().next().cloned();
        match &hostname {
            Some(host) => doc.set("connection", "hostname", host.as_str()),
            None => warn!("Relation {} has no hosts yet", first.relation_id),
        }
        match first.native_transport_port {
            Some(port) => doc.set("connection", "port", port.to_string()),
            None => warn!(
                "Relation {} has no native_transport_port yet",
                first.relation_id
            ),
        }

        self.ensure_parent()?;
        self.write_file(doc.render().as_bytes())?;
        info!(
            "Wrote {} from relation {}",
            self.path.display(),
            first.relation_id
        );

        Ok(RenderOutcome::Written {
            hostname,
            port: first.native_transport_port,
        })
    }

    fn remove(&self) -> Result<RenderOutcome> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed {}", self.path.display());
                Ok(RenderOutcome::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RenderOutcome::AlreadyAbsent),
            Err(e) => Err(EndpointError::io("remove cqlshrc", &self.path, e)),
        }
    }

    fn load(&self) -> Result<IniDocument> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IniDocument::new()),
            Err(e) => return Err(EndpointError::io("read cqlshrc", &self.path, e)),
        };
        IniDocument::parse(&text).map_err(|e| EndpointError::Parse {
            path: self.path.clone(),
            line: e.line,
            reason: e.reason,
        })
    }

    fn ensure_parent(&self) -> Result<()> {
        let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        DirBuilder::new()
            .recursive(true)
            .mode(DIR_MODE)
            .create(dir)
            .map_err(|e| EndpointError::io("create cqlshrc directory", dir, e))?;
        // The directory may predate us with other permissions.
        fs::set_permissions(dir, Permissions::from_mode(DIR_MODE))
            .map_err(|e| EndpointError::io("chmod cqlshrc directory", dir, e))?;
        self.apply_owner(dir)
    }

    fn write_file(&self, contents: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FILE_MODE)
            .open(&self.path)
            .map_err(|e| EndpointError::io("open cqlshrc", &self.path, e))?;
        file.write_all(contents)
            .map_err(|e| EndpointError::io("write cqlshrc", &self.path, e))?;
        fs::set_permissions(&self.path, Permissions::from_mode(FILE_MODE))
            .map_err(|e| EndpointError::io("chmod cqlshrc", &self.path, e))?;
        self.apply_owner(&self.path)
    }

    fn apply_owner(&self, path: &Path) -> Result<()> {
        let Some(owner) = self.owner else {
            return Ok(());
        };
        chown(path, Some(owner.uid), Some(owner.gid)).map_err(|source| EndpointError::Ownership {
            path: path.to_path_buf(),
            source,
        })
    }
}
