//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use ifw_ops::{
    ComponentListing, ComponentStatus, InspectReport, OfflineReport, OperationResult,
    RecoveryInfo,
};
use ifw_types::{ColorChoice, ComponentChange, RunReport, RunStatus, Version};
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            Self::render_json(result)
        } else {
            self.render_table(result)
        }
    }

    /// Render as JSON
    fn render_json(result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render as formatted text
    fn render_table(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::Run(report) => self.render_run_report(report),
            OperationResult::ComponentList(components) => self.render_component_list(components),
            OperationResult::Inspect(report) => self.render_inspect_report(report),
            OperationResult::OfflineInstaller(report) => self.render_offline_report(report),
            OperationResult::Recovery(info) => self.render_recovery(info),
            OperationResult::Success(message) => {
                println!("{}", self.style(message, &Style::new().green()));
                Ok(())
            }
        }
    }

    fn render_run_report(&self, report: &RunReport) -> io::Result<()> {
        match report.status {
            RunStatus::Finished => {
                let total_changes =
                    report.installed.len() + report.updated.len() + report.removed.len();
                if total_changes == 0 {
                    println!("No changes made.");
                    return Ok(());
                }

                println!(
                    "{}",
                    self.style(&format!("{} summary", capitalize(&report.mode.to_string())), &Style::new().bold())
                );
                println!();
                Self::render_changes("Installed", &report.installed, |c| {
                    version_or_unknown(c.to_version.as_ref())
                });
                Self::render_changes("Updated", &report.updated, |c| {
                    format!(
                        "{} -> {}",
                        version_or_unknown(c.from_version.as_ref()),
                        version_or_unknown(c.to_version.as_ref())
                    )
                });
                Self::render_changes("Removed", &report.removed, |c| {
                    version_or_unknown(c.from_version.as_ref())
                });
                println!(
                    "{} operations in {}ms",
                    report.operations, report.duration_ms
                );
            }
            RunStatus::Canceled => {
                println!(
                    "{}",
                    self.style("Canceled. The target directory was restored.", &Style::new().yellow())
                );
            }
            RunStatus::Failed => {
                let message = report
                    .failure
                    .as_ref()
                    .map_or_else(|| "Run failed".to_string(), ToString::to_string);
                eprintln!("{}", self.style(&message, &Style::new().red().bold()));
                if let Some(code) = report.failure.as_ref().and_then(|f| f.code.as_deref()) {
                    eprintln!("  Code: {code}");
                }
                eprintln!("  All changes of this run were undone.");
            }
        }
        Ok(())
    }

    fn render_changes(title: &str, changes: &[ComponentChange], detail: impl Fn(&ComponentChange) -> String) {
        if changes.is_empty() {
            return;
        }
        println!("{title} ({}):", changes.len());
        for change in changes {
            println!("  - {} {}", change.name, detail(change));
        }
        println!();
    }

    /// Render component list
    fn render_component_list(&self, components: &[ComponentListing]) -> io::Result<()> {
        if components.is_empty() {
            println!("No components found.");
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Component").add_attribute(Attribute::Bold),
            Cell::new("Installed").add_attribute(Attribute::Bold),
            Cell::new("Available").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);

        for component in components {
            let description = if component.description.is_empty() {
                component.display_name.as_str()
            } else {
                component.description.as_str()
            };
            table.add_row(vec![
                Cell::new(&component.name),
                Cell::new(version_or_dash(component.installed_version.as_ref())),
                Cell::new(version_or_dash(component.available_version.as_ref())),
                self.format_status(component.status),
                Cell::new(if description.is_empty() { "-" } else { description }),
            ]);
        }

        println!("{table}");
        Ok(())
    }

    /// Render container trailer description
    fn render_inspect_report(&self, report: &InspectReport) -> io::Result<()> {
        println!(
            "{}",
            self.style(&report.path.display().to_string(), &Style::new().bold())
        );
        println!();
        println!("Marker:      {}", report.marker);
        println!("Stub size:   {} bytes", report.stub_len);
        if !report.metadata.is_empty() {
            println!("Metadata:    {}", report.metadata.join(", "));
        }
        if report.has_resource_archive {
            println!("Resources:   embedded repository");
        }

        if !report.components.is_empty() {
            println!();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Component").add_attribute(Attribute::Bold),
                Cell::new("Archive").add_attribute(Attribute::Bold),
                Cell::new("Size").add_attribute(Attribute::Bold),
            ]);
            for component in &report.components {
                for archive in &component.archives {
                    table.add_row(vec![
                        Cell::new(&component.name),
                        Cell::new(&archive.name),
                        Cell::new(archive.size),
                    ]);
                }
            }
            println!("{table}");
        }

        if !report.operations.is_empty() {
            println!();
            println!("Recorded operations ({}):", report.operations.len());
            for operation in &report.operations {
                println!("  {operation}");
            }
        }
        Ok(())
    }

    fn render_offline_report(&self, report: &OfflineReport) -> io::Result<()> {
        println!(
            "{}",
            self.style(
                &format!("Wrote {}", report.path.display()),
                &Style::new().green()
            )
        );
        println!(
            "{} components, {} archives, {} bytes",
            report.components.len(),
            report.archives,
            report.bytes
        );
        Ok(())
    }

    fn render_recovery(&self, info: &RecoveryInfo) -> io::Result<()> {
        if info.recovered {
            println!(
                "{}",
                self.style(
                    &format!(
                        "Recovered interrupted run: undid {} of {} operations",
                        info.undone, info.operations
                    ),
                    &Style::new().yellow()
                )
            );
        } else {
            println!("Nothing to recover.");
        }
        Ok(())
    }

    fn format_status(&self, status: ComponentStatus) -> Cell {
        let (text, color) = match status {
            ComponentStatus::Installed => ("Installed", Color::Green),
            ComponentStatus::Outdated => ("Update available", Color::Yellow),
            ComponentStatus::Available => ("Available", Color::Blue),
        };
        if self.supports_color() {
            Cell::new(text).fg(color)
        } else {
            Cell::new(text)
        }
    }

    fn style(&self, text: &str, style: &Style) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn version_or_dash(version: Option<&Version>) -> String {
    version.map_or_else(|| "-".to_string(), ToString::to_string)
}

fn version_or_unknown(version: Option<&Version>) -> String {
    version.map_or_else(|| "unknown".to_string(), ToString::to_string)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("install"), "Install");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_version_placeholders() {
        let version = Version::parse("1.2").unwrap();
        assert_eq!(version_or_dash(Some(&version)), "1.2");
        assert_eq!(version_or_dash(None), "-");
        assert_eq!(version_or_unknown(None), "unknown");
    }

    #[test]
    fn test_status_cell_without_color() {
        let renderer = OutputRenderer::new(false, ColorChoice::Never);
        assert!(!renderer.supports_color());
        let cell = renderer.format_status(ComponentStatus::Outdated);
        assert_eq!(cell.content(), "Update available");
    }
}
