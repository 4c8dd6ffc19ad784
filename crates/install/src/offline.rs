//! Offline installers: a repository embedded in the installer binary

use ifw_config::constants::UPDATES_FILE;
use ifw_container::{BinaryContent, ContainerWriter, Marker};
use ifw_errors::{Error, InstallError};
use ifw_metadata::UpdatesInfo;
use ifw_net::ResourceProvider;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Serves `resource:` names out of an installer's container
///
/// `resource:Updates.xml` is a metadata blob; `resource:<component>/<file>`
/// is an archive of that component.
#[derive(Debug)]
pub struct EmbeddedRepository {
    content: Mutex<BinaryContent>,
}

impl EmbeddedRepository {
    /// # Errors
    ///
    /// Container errors of the installer file.
    pub fn open(installer: &Path) -> Result<Self, Error> {
        let content = BinaryContent::open(installer)?;
        tracing::debug!(
            path = %installer.display(),
            components = content.layout().components.len(),
            "opened embedded repository"
        );
        Ok(Self {
            content: Mutex::new(content),
        })
    }
}

impl ResourceProvider for EmbeddedRepository {
    fn resource(&self, name: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut content = self
            .content
            .lock()
            .map_err(|_| Error::internal("embedded repository lock poisoned"))?;
        match name.trim_start_matches('/').split_once('/') {
            Some((component, file)) => content.archive(component, file),
            None => content.metadata(name),
        }
    }
}

/// What [`create_installer`] embedded
#[derive(Debug, Clone)]
pub struct OfflineInstaller {
    pub path: PathBuf,
    pub components: Vec<String>,
    pub archives: usize,
    pub bytes: u64,
}

/// Embed a repository directory into a copy of `stub`
///
/// The repository is laid out as published: `Updates.xml` at the top and
/// `<Component>/<Version><Archive>` for every archive it lists. Only the
/// components named in `components` are embedded, or all of them when it
/// is empty.
///
/// # Errors
///
/// `ComponentNotFound` for an unknown name, `MissingArchive` for an archive
/// listed in the metadata but absent from the directory, and metadata or
/// container write errors.
pub async fn create_installer(
    repository: &Path,
    stub: &Path,
    output: &Path,
    components: &[String],
) -> Result<OfflineInstaller, Error> {
    let updates_path = repository.join(UPDATES_FILE);
    let xml = tokio::fs::read_to_string(&updates_path)
        .await
        .map_err(|e| Error::io_with_path(&e, &updates_path))?;
    let mut updates = UpdatesInfo::parse(&xml, &updates_path.display().to_string())?;

    for name in components {
        if updates.package(name).is_none() {
            return Err(InstallError::ComponentNotFound(name.clone()).into());
        }
    }
    if !components.is_empty() {
        updates.packages.retain(|p| components.contains(&p.name));
    }

    let mut writer = match BinaryContent::open(stub) {
        // Building from another installer: drop its trailer
        Ok(existing) => ContainerWriter::new(stub, Marker::Installer).stub_len(existing.stub_len()),
        Err(_) => ContainerWriter::new(stub, Marker::Installer),
    };
    writer.add_metadata(UPDATES_FILE, updates.to_xml().into_bytes());

    let mut archives = 0;
    for package in &updates.packages {
        for archive in &package.archives {
            let file = format!("{}{}", package.version, archive.name);
            let path = repository.join(&package.name).join(&file);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(InstallError::MissingArchive {
                    component: package.name.clone(),
                    archive: archive.name.clone(),
                }
                .into());
            }
            writer.add_archive_file(package.name.clone(), file, path);
            archives += 1;
        }
    }

    let out = output.to_path_buf();
    let bytes = tokio::task::spawn_blocking(move || {
        let bytes = writer.write(&out)?;
        make_executable(&out)?;
        Ok::<_, Error>(bytes)
    })
    .await
    .map_err(|e| Error::internal(format!("installer write task failed: {e}")))??;
    tracing::info!(path = %output.display(), archives, bytes, "offline installer written");

    Ok(OfflineInstaller {
        path: output.to_path_buf(),
        components: updates.packages.iter().map(|p| p.name.clone()).collect(),
        archives,
        bytes,
    })
}

/// Give a freshly written container the mode of an executable
#[cfg(unix)]
pub(crate) fn make_executable(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::io_with_path(&e, path))
}

#[cfg(not(unix))]
pub(crate) fn make_executable(_path: &Path) -> Result<(), Error> {
    Ok(())
}
