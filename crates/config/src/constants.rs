//! Fixed file names used inside an installation directory
//!
//! These are not configurable so that a maintenance tool can always locate
//! the state written by the installer that created it.

/// Installed-state record (`Packages` XML)
pub const COMPONENTS_FILE: &str = "components.xml";

/// Transaction journal written while operations are applied
pub const JOURNAL_FILE: &str = "installer.journal.json";

/// Repository metadata file fetched from every update source
pub const UPDATES_FILE: &str = "Updates.xml";

/// Directory holding operation backups for the running transaction
pub const BACKUP_DIR: &str = ".ifw-backup";

/// Default maintenance tool file name
pub const DEFAULT_MAINTENANCE_TOOL: &str = "maintenancetool";

/// Suffix of the lock file guarding a download destination
pub const LOCK_SUFFIX: &str = ".lock";

/// Scheme prefix of the in-binary resource transport
pub const RESOURCE_SCHEME: &str = "resource:";
