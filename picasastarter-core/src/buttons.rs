use crate::{Button, CoreError};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const BUTTON_FILE_PREFIX: &str = "PSButton";
pub const REGISTRY_FILE: &str = "PSButtons.lst";

#[derive(Serialize)]
#[serde(rename = "buttons")]
struct PbfDocument<'a> {
    #[serde(rename = "@format")]
    format: &'static str,
    #[serde(rename = "@version")]
    version: &'static str,
    button: PbfButton<'a>,
}

#[derive(Serialize)]
struct PbfButton<'a> {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: &'static str,
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tooltip: Option<&'a str>,
    action: PbfAction<'a>,
}

#[derive(Serialize)]
struct PbfAction<'a> {
    #[serde(rename = "@verb")]
    verb: &'static str,
    param: Vec<PbfParam<'a>>,
}

#[derive(Serialize)]
struct PbfParam<'a> {
    #[serde(rename = "@name")]
    name: &'static str,
    #[serde(rename = "@value")]
    value: &'a str,
}

pub fn button_file_name(button: &Button) -> String {
    format!("{BUTTON_FILE_PREFIX}{}.pbf", button.id)
}

fn creation_error(button: &Button, reason: impl ToString) -> CoreError {
    CoreError::ButtonCreation {
        button: button.label.clone(),
        reason: reason.to_string(),
    }
}

fn render(button: &Button) -> Result<String, CoreError> {
    let exe = button.executable.to_string_lossy();
    let mut params = vec![PbfParam {
        name: "exe_path",
        value: &exe,
    }];
    if let Some(args) = button.arguments.as_deref() {
        params.push(PbfParam { name: "args", value: args });
    }
    let doc = PbfDocument {
        format: "1",
        version: "1",
        button: PbfButton {
            id: format!("{BUTTON_FILE_PREFIX}/{}", button.id),
            kind: "dynamic",
            label: &button.label,
            tooltip: button.tooltip.as_deref(),
            action: PbfAction {
                verb: "trayexec",
                param: params,
            },
        },
    };
    let body = quick_xml::se::to_string(&doc).map_err(|e| creation_error(button, e))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}\n"))
}

/// Removes every file a previous run left behind in `dest_dir`.
pub fn clear_button_files(dest_dir: &Path) -> io::Result<usize> {
    let entries = match fs::read_dir(dest_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(BUTTON_FILE_PREFIX) && entry.path().is_file() {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %entry.path().display(), error = %e, "could not remove old button"),
            }
        }
    }
    Ok(removed)
}

fn write_button(dest_dir: &Path, button: &Button) -> Result<PathBuf, CoreError> {
    if button.id.is_empty() || button.id.contains(['/', '\\', ':']) || button.id.contains("..") {
        return Err(creation_error(button, "button id is not a valid file name"));
    }
    let path = dest_dir.join(button_file_name(button));
    let xml = render(button)?;
    fs::write(&path, xml).map_err(|e| creation_error(button, e))?;
    debug!(file = %path.display(), "button written");
    Ok(path)
}

/// Writes one `.pbf` file per enabled button into `dest_dir`.
///
/// A button that cannot be written does not stop the others; the caller gets
/// one result per enabled button, in order.
pub fn prepare_buttons(dest_dir: &Path, buttons: &[Button]) -> Vec<Result<PathBuf, CoreError>> {
    if let Err(e) = clear_button_files(dest_dir) {
        warn!(dir = %dest_dir.display(), error = %e, "could not clear old buttons");
    }
    if let Err(e) = fs::create_dir_all(dest_dir) {
        return buttons
            .iter()
            .filter(|b| b.enabled)
            .map(|b| Err(creation_error(b, &e)))
            .collect();
    }
    buttons
        .iter()
        .filter(|b| b.enabled)
        .map(|b| write_button(dest_dir, b))
        .collect()
}

/// Lists the enabled buttons so Picasa shows them on its toolbar.
pub fn register_buttons(dest_dir: &Path, buttons: &[Button]) -> io::Result<PathBuf> {
    let mut listing = String::new();
    for b in buttons.iter().filter(|b| b.enabled) {
        listing.push_str(&format!("{BUTTON_FILE_PREFIX}/{}\n", b.id));
    }
    fs::create_dir_all(dest_dir)?;
    let path = dest_dir.join(REGISTRY_FILE);
    fs::write(&path, listing)?;
    Ok(path)
}
