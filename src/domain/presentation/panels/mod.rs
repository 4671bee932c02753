pub mod debug_panel;
pub mod diagnostics_panel;
pub mod help_panel;
