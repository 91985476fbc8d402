//! Terminal output helpers.
//!
//! Colors come from owo-colors, tables from comfy-table and progress bars from
//! indicatif. Command handlers print only through this module.

mod headers;
mod output;
mod progress;
mod status;
mod tables;

pub use headers::{print_section_header, SectionStyle};
pub use output::{format_elapsed, print_key_value, print_separator_with_spacing, print_summary_box};
pub use progress::create_progress_bar;
pub use status::{eprint_success, print_error, print_success, print_warning, Status};
pub use tables::{print_outcome_table, print_package_table, PackageRow};
