use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use handlebars::Handlebars;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

const CONFLIST_NAME: &str = "10-containerd-net.conflist";
const ZERO_CIDR_V4: &str = "0.0.0.0/0";
const ZERO_CIDR_V6: &str = "::/0";

/// Status/loadability of the network plugin that owns the conf directory.
pub trait NetworkPlugin {
    /// Ok when the plugin reports ready, meaning something else manages its
    /// config and we must not clobber it.
    fn status(&self) -> Result<()>;

    /// Ok when an already-present config loads cleanly.
    fn load(&self) -> Result<()>;
}

/// What to do with the conf directory for the current reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfDisposition {
    /// An externally managed plugin is ready, leave its config alone.
    Managed,
    /// A valid config is already on disk, nothing to generate.
    AlreadyLoaded,
    /// No usable config, generate one from the template.
    NeedsRender,
}

/// An error from either probe counts as "not ready" and falls through to the
/// next check, it never fails the reconcile.
pub fn disposition(plugin: &dyn NetworkPlugin) -> ConfDisposition {
    if plugin.status().is_ok() {
        return ConfDisposition::Managed;
    }
    if plugin.load().is_ok() {
        return ConfDisposition::AlreadyLoaded;
    }
    ConfDisposition::NeedsRender
}

/// Values substituted into the CNI config template.
#[derive(Serialize)]
pub struct ConfTemplateContext {
    /// Primary pod CIDR for the node
    #[serde(rename = "podCIDR")]
    pub pod_cidr: String,
    /// All pod CIDRs assigned to the node
    #[serde(rename = "podCIDRRanges")]
    pub pod_cidr_ranges: Vec<String>,
    /// Default routes, v4 before v6
    pub routes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflist {
    pub cni_version: String,
    pub name: String,
    #[serde(default)]
    pub plugins: Vec<serde_json::Value>,
}

/// Regenerates the node's CNI config from `conf_template` when the assigned
/// pod CIDRs change. No-op when `pod_cidrs` is empty, no template is
/// configured, or the plugin already has a usable config.
pub fn reconcile(
    pod_cidrs: &str,
    conf_template: Option<&Path>,
    conf_dir: &Path,
    plugin: &dyn NetworkPlugin,
) -> Result<()> {
    if pod_cidrs.is_empty() {
        return Ok(());
    }
    let cidrs: Vec<&str> = pod_cidrs.split(',').map(str::trim).collect();
    let routes = routes(&cidrs)?;

    let Some(template_path) = conf_template else {
        info!("no cni config template specified, waiting for another component to drop the config");
        return Ok(());
    };

    match disposition(plugin) {
        ConfDisposition::Managed => {
            info!(
                "network plugin is ready, skip generating cni config from template {}",
                template_path.display()
            );
            Ok(())
        }
        ConfDisposition::AlreadyLoaded => {
            info!(
                "cni config loaded successfully, skip generating cni config from template {}",
                template_path.display()
            );
            Ok(())
        }
        ConfDisposition::NeedsRender => render_conf(template_path, conf_dir, &cidrs, &routes),
    }
}

/// Resolves the default routes required to cover `cidrs`: `0.0.0.0/0` when
/// any range is IPv4 and `::/0` when any range is IPv6, v4 first. The first
/// unparseable entry fails the whole call.
pub fn routes(cidrs: &[&str]) -> Result<Vec<String>> {
    let mut has_v4 = false;
    let mut has_v6 = false;
    for cidr in cidrs {
        let net = IpNetwork::from_str(cidr).map_err(|e| Error::InvalidCidr {
            cidr: (*cidr).to_owned(),
            source: e,
        })?;
        match net {
            IpNetwork::V4(_) => has_v4 = true,
            IpNetwork::V6(_) => has_v6 = true,
        }
    }

    let mut routes = Vec::new();
    if has_v4 {
        routes.push(ZERO_CIDR_V4.to_owned());
    }
    if has_v6 {
        routes.push(ZERO_CIDR_V6.to_owned());
    }
    Ok(routes)
}

fn render_conf(
    template_path: &Path,
    conf_dir: &Path,
    cidrs: &[&str],
    routes: &[String],
) -> Result<()> {
    info!(
        "generating cni config from template {}",
        template_path.display()
    );
    let text = fs::read_to_string(template_path).map_err(|e| Error::Template {
        path: template_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut registry = Handlebars::new();
    // the artifact is JSON, not HTML
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .register_template_string("conflist", &text)
        .map_err(|e| Error::Template {
            path: template_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let values = ConfTemplateContext {
        pod_cidr: cidrs[0].to_owned(),
        pod_cidr_ranges: cidrs.iter().map(|c| (*c).to_owned()).collect(),
        routes: routes.to_vec(),
    };
    let rendered = registry
        .render("conflist", &values)
        .map_err(|e| Error::Template {
            path: template_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    fs::create_dir_all(conf_dir).map_err(|e| Error::Filesystem {
        path: conf_dir.to_path_buf(),
        source: e,
    })?;
    let conf_file = conf_dir.join(CONFLIST_NAME);
    // truncate so a shorter render cannot leave stale trailing bytes
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&conf_file)
        .map_err(|e| Error::Filesystem {
            path: conf_file.clone(),
            source: e,
        })?;
    file.write_all(rendered.as_bytes())
        .map_err(|e| Error::Filesystem {
            path: conf_file,
            source: e,
        })?;
    Ok(())
}

/// Plugin probe backed by the contents of the CNI conf directory.
pub struct ConfDirPlugin {
    conf_dir: PathBuf,
}

impl ConfDirPlugin {
    pub fn new(conf_dir: impl AsRef<Path>) -> Self {
        Self {
            conf_dir: conf_dir.as_ref().to_path_buf(),
        }
    }
}

impl NetworkPlugin for ConfDirPlugin {
    fn status(&self) -> Result<()> {
        find_foreign_conf(&self.conf_dir).map(|_| ())
    }

    fn load(&self) -> Result<()> {
        let conf = fs::read(self.conf_dir.join(CONFLIST_NAME))?;
        let _: Conflist = serde_json::from_slice(&conf)?;
        Ok(())
    }
}

// Returns the first foreign conflist if found, then checks for conf
fn find_foreign_conf(conf_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(conf_dir)?
        .filter_map(|f| {
            let Ok(f) = f else { return None };
            if f.file_name() != CONFLIST_NAME {
                Some(f.path())
            } else {
                None
            }
        })
        .collect();

    files.sort();

    for ext in ["conflist", "conf"] {
        if let Some(found) = files
            .iter()
            .find(|p| p.extension() == Some(OsStr::new(ext)))
        {
            return Ok(found.to_owned());
        }
    }
    Err(Error::PluginNotReady(
        "no externally managed conflist/conf present".into(),
    ))
}
